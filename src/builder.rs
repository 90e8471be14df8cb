//! Fluent construction of grammar nodes.
//!
//! ```
//! use absorbdsl::ast::{Mode, Node, RepeatBound, Schema, ValueSpec};
//!
//! let schema = Schema::new(Node::group(
//!     "record",
//!     vec![
//!         Node::scalar("tag", ValueSpec::uint8().enumerated([0x42])).anchor(),
//!         Node::scalar("n", ValueSpec::uint8().count_of("items"))
//!             .scalar_variant(Mode::ABSORB, ValueSpec::uint8().ranged(1, 8)),
//!         Node::repetition("items", 1, 8, RepeatBound::Quantity("n".into()),
//!             Node::scalar("item", ValueSpec::uint16_be())),
//!     ],
//! ))
//! .unwrap();
//! assert_eq!(schema.name(), "record");
//! ```

use crate::ast::*;
use crate::codec::Endianness;

impl ValueSpec {
    pub fn int(ty: IntType, endianness: Endianness) -> Self {
        ValueSpec {
            ty: ValueType::Int(ty),
            endianness,
            constraint: Constraint::unconstrained(),
            computed: None,
        }
    }

    pub fn uint8() -> Self {
        ValueSpec::int(IntType::U8, Endianness::Big)
    }

    pub fn uint16_be() -> Self {
        ValueSpec::int(IntType::U16, Endianness::Big)
    }

    pub fn uint16_le() -> Self {
        ValueSpec::int(IntType::U16, Endianness::Little)
    }

    pub fn uint32_be() -> Self {
        ValueSpec::int(IntType::U32, Endianness::Big)
    }

    pub fn uint32_le() -> Self {
        ValueSpec::int(IntType::U32, Endianness::Little)
    }

    /// Unconstrained byte string.
    pub fn bytes() -> Self {
        ValueSpec {
            ty: ValueType::Bytes,
            endianness: Endianness::Big,
            constraint: Constraint::unconstrained(),
            computed: None,
        }
    }

    pub fn enumerated(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.constraint.kind = ConstraintKind::ValueEnumerated(values.into_iter().collect());
        self
    }

    pub fn ranged(mut self, min: i64, max: i64) -> Self {
        self.constraint.kind = ConstraintKind::ValueRanged { min, max };
        self
    }

    pub fn size_exact(mut self, n: u64) -> Self {
        self.constraint.kind = ConstraintKind::SizeExact(n);
        self
    }

    pub fn size_bounded(mut self, min: u64, max: Option<u64>) -> Self {
        self.constraint.kind = ConstraintKind::SizeBounded { min, max };
        self
    }

    /// Bind the size constraint to `measure(sibling) + base`.
    ///
    /// The constraint becomes a size constraint: a value enumeration or range set earlier is
    /// replaced by an exact size of `measure(sibling) + base`, and no longer checked. Static
    /// size bounds are kept.
    pub fn depends_on(mut self, sibling: impl Into<String>, source: DependencySource, base: i64) -> Self {
        if matches!(
            self.constraint.kind,
            ConstraintKind::Unconstrained
                | ConstraintKind::ValueEnumerated(_)
                | ConstraintKind::ValueRanged { .. }
        ) {
            self.constraint.kind = ConstraintKind::SizeExact(0);
        }
        self.constraint.depends_on = Some(Dependency { sibling: sibling.into(), source, base });
        self
    }

    /// Generated as `base` plus the encoded length of sibling `node`.
    pub fn length_of(mut self, node: impl Into<String>, base: i64) -> Self {
        self.computed = Some(Computed::LengthOf { node: node.into(), base });
        self
    }

    /// Generated as the item count of sibling repetition `node`.
    pub fn count_of(mut self, node: impl Into<String>) -> Self {
        self.computed = Some(Computed::CountOf { node: node.into() });
        self
    }
}

impl BitFieldSpec {
    pub fn new(total_bits: u32, endianness: Endianness) -> Self {
        BitFieldSpec { total_bits, endianness, subfields: Vec::new() }
    }

    pub fn subfield(mut self, width: u32, min: u64, max: u64, label: impl Into<String>) -> Self {
        self.subfields.push(SubField { width, min, max, label: label.into() });
        self
    }
}

impl Node {
    fn with_body(name: impl Into<String>, body: NodeBody) -> Self {
        Node { name: name.into(), body, variants: Vec::new(), attrs: Attrs::default() }
    }

    pub fn scalar(name: impl Into<String>, spec: ValueSpec) -> Self {
        Node::with_body(name, NodeBody::Scalar(spec))
    }

    pub fn bits(name: impl Into<String>, spec: BitFieldSpec) -> Self {
        Node::with_body(name, NodeBody::BitPacked(spec))
    }

    pub fn group(name: impl Into<String>, children: Vec<Node>) -> Self {
        Node::with_body(name, NodeBody::Group(children))
    }

    pub fn repetition(
        name: impl Into<String>,
        min: usize,
        max: usize,
        bound: RepeatBound,
        template: Node,
    ) -> Self {
        Node::with_body(
            name,
            NodeBody::Repetition(Repetition { min, max, bound, template: Box::new(template) }),
        )
    }

    /// Register an alternate body used when absorbing or generating in `mode`.
    pub fn variant(mut self, mode: Mode, body: NodeBody) -> Self {
        self.variants.retain(|(m, _)| *m != mode);
        self.variants.push((mode, body));
        self
    }

    pub fn scalar_variant(self, mode: Mode, spec: ValueSpec) -> Self {
        self.variant(mode, NodeBody::Scalar(spec))
    }

    pub fn immutable(mut self) -> Self {
        self.attrs.mutable = false;
        self
    }

    pub fn postpone(mut self) -> Self {
        self.attrs.postponable = true;
        self
    }

    pub fn anchor(mut self) -> Self {
        self.attrs.anchor = true;
        self
    }

    pub fn absorb_constraints(mut self, csts: AbsorbConstraints) -> Self {
        self.attrs.absorb = Some(csts);
        self
    }
}
