//! Grammar tree for binary formats: typed nodes, constraints, repetitions and per-mode variants.
//!
//! A [`Schema`] is built once (see [`builder`](crate::builder)) and then shared read-only by
//! every absorption; nothing in this module is mutated at absorption time.

use crate::codec::Endianness;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// Interpretation mode token. Nodes may register an alternate body per mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mode(Cow<'static, str>);

impl Mode {
    /// Generative mode: computed length/count fields are derived from their siblings.
    pub const MAIN: Mode = Mode(Cow::Borrowed("MAIN"));
    /// Strict-parse mode.
    pub const ABSORB: Mode = Mode(Cow::Borrowed("ABS"));

    pub fn new(token: impl Into<String>) -> Self {
        Mode(Cow::Owned(token.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::MAIN
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntType {
    /// Encoded width in bytes.
    pub fn width(self) -> usize {
        match self {
            IntType::U8 | IntType::I8 => 1,
            IntType::U16 | IntType::I16 => 2,
            IntType::U32 | IntType::I32 => 4,
            IntType::U64 | IntType::I64 => 8,
        }
    }

    pub fn min_value(self) -> i128 {
        match self {
            IntType::U8 | IntType::U16 | IntType::U32 | IntType::U64 => 0,
            IntType::I8 => i8::MIN as i128,
            IntType::I16 => i16::MIN as i128,
            IntType::I32 => i32::MIN as i128,
            IntType::I64 => i64::MIN as i128,
        }
    }

    pub fn max_value(self) -> i128 {
        match self {
            IntType::U8 => u8::MAX as i128,
            IntType::U16 => u16::MAX as i128,
            IntType::U32 => u32::MAX as i128,
            IntType::U64 => u64::MAX as i128,
            IntType::I8 => i8::MAX as i128,
            IntType::I16 => i16::MAX as i128,
            IntType::I32 => i32::MAX as i128,
            IntType::I64 => i64::MAX as i128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int(IntType),
    Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    Unconstrained,
    SizeExact(u64),
    SizeBounded { min: u64, max: Option<u64> },
    ValueEnumerated(Vec<i64>),
    ValueRanged { min: i64, max: i64 },
}

/// What a dependency measures on the sibling it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencySource {
    /// Bytes consumed by the sibling.
    EncodedLength,
    /// Number of items absorbed by a sibling repetition.
    ItemCount,
    /// The sibling's integer value.
    Value,
}

/// Edge to a sibling whose absorption supplies a constraint's bound: `measure(sibling) + base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub sibling: String,
    pub source: DependencySource,
    pub base: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub depends_on: Option<Dependency>,
}

impl Constraint {
    pub fn unconstrained() -> Self {
        Constraint { kind: ConstraintKind::Unconstrained, depends_on: None }
    }

    pub fn is_value_constraint(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::ValueEnumerated(_) | ConstraintKind::ValueRanged { .. }
        )
    }
}

impl Default for Constraint {
    fn default() -> Self {
        Constraint::unconstrained()
    }
}

/// Fields whose value the generator derives from a sibling (`length_of` / `count_of`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Computed {
    LengthOf { node: String, base: i64 },
    CountOf { node: String },
}

/// Type, byte order and constraint of a scalar leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSpec {
    pub ty: ValueType,
    pub endianness: Endianness,
    pub constraint: Constraint,
    pub computed: Option<Computed>,
}

impl ValueSpec {
    /// Width in bytes when known without context (integers, exact-size byte strings).
    pub fn fixed_width(&self) -> Option<usize> {
        match self.ty {
            ValueType::Int(t) => Some(t.width()),
            ValueType::Bytes => match (&self.constraint.kind, &self.constraint.depends_on) {
                (ConstraintKind::SizeExact(n), None) => Some(*n as usize),
                _ => None,
            },
        }
    }

    /// The dependency-bearing size constraint of this leaf: the explicit one, or the one implied
    /// by a computed length/count.
    pub fn dependent_constraint(&self) -> Option<Constraint> {
        if self.constraint.depends_on.is_some() {
            return Some(self.constraint.clone());
        }
        let dep = match self.computed.as_ref()? {
            Computed::LengthOf { node, base } => Dependency {
                sibling: node.clone(),
                source: DependencySource::EncodedLength,
                base: *base,
            },
            Computed::CountOf { node } => Dependency {
                sibling: node.clone(),
                source: DependencySource::ItemCount,
                base: 0,
            },
        };
        Some(Constraint { kind: ConstraintKind::SizeExact(0), depends_on: Some(dep) })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubField {
    pub width: u32,
    pub min: u64,
    pub max: u64,
    pub label: String,
}

/// Fixed-width container split into subfields, most significant first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFieldSpec {
    pub total_bits: u32,
    pub endianness: Endianness,
    pub subfields: Vec<SubField>,
}

impl BitFieldSpec {
    pub fn width(&self) -> usize {
        (self.total_bits / 8) as usize
    }
}

/// How a repetition decides how many items to absorb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepeatBound {
    /// Exactly the value of the named sibling.
    Quantity(String),
    /// Until `value(field) - base` bytes are consumed.
    Length { field: String, base: u64 },
    /// While the template absorbs, up to `max`.
    Greedy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repetition {
    pub min: usize,
    pub max: usize,
    pub bound: RepeatBound,
    pub template: Box<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    BitPacked,
    Group,
    Repetition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    Scalar(ValueSpec),
    BitPacked(BitFieldSpec),
    Group(Vec<Node>),
    Repetition(Repetition),
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Scalar(_) => NodeKind::Scalar,
            NodeBody::BitPacked(_) => NodeKind::BitPacked,
            NodeBody::Group(_) => NodeKind::Group,
            NodeBody::Repetition(_) => NodeKind::Repetition,
        }
    }
}

/// Which checks absorption enforces. Anchors always check their markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsorbConstraints {
    /// Length dependencies and byte-string size bounds.
    pub size: bool,
    /// Value enumerations, ranges and bit-subfield bounds.
    pub contents: bool,
    /// Repetition count bounds.
    pub structure: bool,
}

impl AbsorbConstraints {
    pub fn full() -> Self {
        AbsorbConstraints { size: true, contents: true, structure: true }
    }

    pub fn none() -> Self {
        AbsorbConstraints { size: false, contents: false, structure: false }
    }
}

impl Default for AbsorbConstraints {
    fn default() -> Self {
        AbsorbConstraints::full()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attrs {
    pub mutable: bool,
    /// Byte-string region sized by the position of the next sibling.
    pub postponable: bool,
    /// Discriminating marker.
    pub anchor: bool,
    /// Override of the inherited absorption constraints, applied to the whole subtree.
    pub absorb: Option<AbsorbConstraints>,
}

impl Default for Attrs {
    fn default() -> Self {
        Attrs { mutable: true, postponable: false, anchor: false, absorb: None }
    }
}

/// One unit of the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub body: NodeBody,
    pub variants: Vec<(Mode, NodeBody)>,
    pub attrs: Attrs,
}

impl Node {
    /// The registered variant for `mode`, else the default body.
    pub fn body_for(&self, mode: &Mode) -> &NodeBody {
        self.variants
            .iter()
            .find(|(m, _)| m == mode)
            .map(|(_, b)| b)
            .unwrap_or(&self.body)
    }

    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid node name {name:?} under {parent}")]
    InvalidName { parent: String, name: String },
    #[error("duplicate node name {name} under {parent}")]
    DuplicateName { parent: String, name: String },
    #[error("repetition {node}: min {min} > max {max}")]
    RepetitionBounds { node: String, min: usize, max: usize },
    #[error("bitfield {node}: container of {bits} bits (must be a multiple of 8, at most 64)")]
    BitContainer { node: String, bits: u32 },
    #[error("bitfield {node}: subfield widths sum to {sum}, container is {declared} bits")]
    BitWidthMismatch { node: String, declared: u32, sum: u32 },
    #[error("bitfield {node}: subfield {label} bounds do not fit its width")]
    SubfieldRange { node: String, label: String },
    #[error("{node}: anchor must be an integer with enumerated marker values")]
    AnchorNotMarker { node: String },
    #[error("{node}: postponable node must be a byte string")]
    PostponableNotBytes { node: String },
    #[error("{node}: computed length/count must be an integer")]
    ComputedNotInt { node: String },
}

/// Validated, immutable grammar tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    root: Node,
}

impl Schema {
    pub fn new(root: Node) -> Result<Self, SchemaError> {
        validate_node(&root, "<root>")?;
        Ok(Schema { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.root.name
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && name != "*" && name != "**"
}

fn validate_node(node: &Node, parent: &str) -> Result<(), SchemaError> {
    if !valid_name(&node.name) {
        return Err(SchemaError::InvalidName {
            parent: parent.to_string(),
            name: node.name.clone(),
        });
    }
    validate_body(node, &node.body)?;
    for (_, body) in &node.variants {
        validate_body(node, body)?;
    }
    Ok(())
}

fn validate_body(node: &Node, body: &NodeBody) -> Result<(), SchemaError> {
    if node.attrs.anchor {
        let is_marker = matches!(
            body,
            NodeBody::Scalar(ValueSpec {
                ty: ValueType::Int(_),
                constraint: Constraint { kind: ConstraintKind::ValueEnumerated(_), .. },
                ..
            })
        );
        if !is_marker {
            return Err(SchemaError::AnchorNotMarker { node: node.name.clone() });
        }
    }
    if node.attrs.postponable
        && !matches!(body, NodeBody::Scalar(ValueSpec { ty: ValueType::Bytes, .. }))
    {
        return Err(SchemaError::PostponableNotBytes { node: node.name.clone() });
    }
    match body {
        NodeBody::Scalar(spec) => {
            if spec.computed.is_some() && spec.ty == ValueType::Bytes {
                return Err(SchemaError::ComputedNotInt { node: node.name.clone() });
            }
        }
        NodeBody::BitPacked(bits) => validate_bits(&node.name, bits)?,
        NodeBody::Group(children) => {
            let mut seen = HashSet::new();
            for child in children {
                if !seen.insert(child.name.as_str()) {
                    return Err(SchemaError::DuplicateName {
                        parent: node.name.clone(),
                        name: child.name.clone(),
                    });
                }
                validate_node(child, &node.name)?;
            }
        }
        NodeBody::Repetition(rep) => {
            if rep.min > rep.max {
                return Err(SchemaError::RepetitionBounds {
                    node: node.name.clone(),
                    min: rep.min,
                    max: rep.max,
                });
            }
            validate_node(&rep.template, &node.name)?;
        }
    }
    Ok(())
}

fn validate_bits(name: &str, bits: &BitFieldSpec) -> Result<(), SchemaError> {
    if bits.total_bits == 0 || bits.total_bits % 8 != 0 || bits.total_bits > 64 {
        return Err(SchemaError::BitContainer { node: name.to_string(), bits: bits.total_bits });
    }
    let sum: u32 = bits.subfields.iter().map(|s| s.width).sum();
    if sum != bits.total_bits || bits.subfields.iter().any(|s| s.width == 0) {
        return Err(SchemaError::BitWidthMismatch {
            node: name.to_string(),
            declared: bits.total_bits,
            sum,
        });
    }
    for s in &bits.subfields {
        let limit = if s.width >= 64 { u64::MAX } else { (1u64 << s.width) - 1 };
        if s.min > s.max || s.max > limit {
            return Err(SchemaError::SubfieldRange {
                node: name.to_string(),
                label: s.label.clone(),
            });
        }
    }
    Ok(())
}
