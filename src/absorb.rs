//! Absorption: parse and validate a raw buffer against a [`Schema`].
//!
//! The engine walks the grammar depth-first in declaration order and builds a fresh
//! [`InstanceTree`] for every call. It never panics and never returns `Err`: the outcome is an
//! [`AbsorptionResult`] telling how far absorption got and why it stopped.
//!
//! ## Design
//!
//! - **Mode selection:** each node is visited with the body registered for the configured
//!   [`Mode`], falling back to its default body.
//! - **Postponed constraints:** a leaf whose size constraint depends on a later sibling (a
//!   length field declared before the group it measures) is decoded, marked
//!   [`NodeStatus::Postponed`], and checked once, right after that sibling absorbs. A
//!   constraint still pending when its group ends fails the group.
//! - **Regions:** a postponable byte string extends up to the first offset where its next
//!   sibling (the anchor) absorbs, and never beyond it.
//! - **Repetitions:** governed by a quantity sibling, by a length sibling's byte budget, or
//!   greedily; see [`RepeatBound`].
//!
//! ## Outcome
//!
//! | Status | `offset` | `consumed_size` | tree |
//! |--------|----------|-----------------|------|
//! | `FullyAbsorbed` | end of the absorbed structure | bytes absorbed | complete |
//! | `PartiallyAbsorbed` | start of the failing node | bytes absorbed when the failure was detected | partial |
//! | `Rejected` | start of the leading marker | bytes examined through the marker | none |
//!
//! `Rejected` is reserved for a marker mismatch on the first anchor of the buffer; every other
//! failure is `PartiallyAbsorbed` with the cause in [`AbsorptionResult::error`].

use crate::ast::*;
use crate::codec::{self, CodecError};
use crate::constraint::{self, Facts, Resolution, ResolvedBound, Siblings};
use crate::instance::{InstanceNode, InstanceTree, NodeStatus};
use crate::metadata::{DerivedMetadata, PostAbsorbHook};
use crate::value::Value;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorbStatus {
    FullyAbsorbed,
    PartiallyAbsorbed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbsorbError {
    #[error("{node}: truncated input at offset {offset} (need {needed} byte(s), {available} available)")]
    TruncatedInput { node: String, offset: usize, needed: usize, available: usize },
    #[error("{node}: value rejected at offset {offset}: {reason}")]
    ValueRejected { node: String, offset: usize, reason: String },
    #[error("{node}: {count} item(s) outside [{min}, {max}]")]
    RepetitionBoundViolated { node: String, count: usize, min: usize, max: usize },
    #[error("{node}: constraint depending on {depends_on} never resolved")]
    UnresolvedConstraint { node: String, depends_on: String },
    #[error("{node}: declared length {declared}, content requires {expected}")]
    InvalidLength { node: String, declared: i128, expected: ResolvedBound },
    #[error("{node}: marker {value:#x} at offset {offset} matches no expected value")]
    Rejected { node: String, offset: usize, value: i128 },
}

impl AbsorbError {
    pub fn node(&self) -> &str {
        match self {
            AbsorbError::TruncatedInput { node, .. }
            | AbsorbError::ValueRejected { node, .. }
            | AbsorbError::RepetitionBoundViolated { node, .. }
            | AbsorbError::UnresolvedConstraint { node, .. }
            | AbsorbError::InvalidLength { node, .. }
            | AbsorbError::Rejected { node, .. } => node,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsorptionResult<'s> {
    pub status: AbsorbStatus,
    pub offset: usize,
    pub consumed_size: usize,
    /// Complete or partial tree; `None` when the buffer was rejected.
    pub instance_tree: Option<InstanceTree<'s>>,
    pub error: Option<AbsorbError>,
}

impl AbsorptionResult<'_> {
    pub fn is_fully_absorbed(&self) -> bool {
        self.status == AbsorbStatus::FullyAbsorbed
    }
}

/// Absorption settings. The default absorbs in [`Mode::ABSORB`] with every check enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsorbConfig {
    pub mode: Mode,
    pub constraints: AbsorbConstraints,
    /// Buffers longer than this are absorbed only up to the cap.
    pub max_input_len: Option<usize>,
}

impl AbsorbConfig {
    pub fn new(mode: Mode) -> Self {
        AbsorbConfig { mode, constraints: AbsorbConstraints::full(), max_input_len: None }
    }

    pub fn with_constraints(mut self, constraints: AbsorbConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_max_input_len(mut self, cap: usize) -> Self {
        self.max_input_len = Some(cap);
        self
    }
}

impl Default for AbsorbConfig {
    fn default() -> Self {
        AbsorbConfig::new(Mode::ABSORB)
    }
}

/// Absorb `buffer` in `mode` with every check enabled and no metadata hook.
pub fn absorb<'s>(schema: &'s Schema, buffer: &[u8], mode: &Mode) -> AbsorptionResult<'s> {
    Engine::new(schema, AbsorbConfig::new(mode.clone())).absorb(buffer)
}

/// A schema bound to a configuration and an optional post-absorption hook.
///
/// Engines only read the schema; one engine can absorb on many threads at once.
pub struct Engine<'s> {
    schema: &'s Schema,
    config: AbsorbConfig,
    hook: Option<&'s (dyn PostAbsorbHook + Send + Sync)>,
}

impl<'s> Engine<'s> {
    pub fn new(schema: &'s Schema, config: AbsorbConfig) -> Self {
        Engine { schema, config, hook: None }
    }

    pub fn with_hook(mut self, hook: &'s (dyn PostAbsorbHook + Send + Sync)) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(&self) -> &AbsorbConfig {
        &self.config
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn absorb(&self, buffer: &[u8]) -> AbsorptionResult<'s> {
        let buf = match self.config.max_input_len {
            Some(cap) if buffer.len() > cap => {
                warn!("input of {} bytes capped to {}", buffer.len(), cap);
                &buffer[..cap]
            }
            _ => buffer,
        };
        let mode = &self.config.mode;
        let mut walker = Walker { buf, mode, anchors: 0 };
        let root = self.schema.root();
        let w = Window { at: 0, limit: buf.len(), csts: self.config.constraints };
        match walker.node(root, root.name.clone(), w, &Siblings::default()) {
            Ok(inst) => {
                let size = inst.size;
                let mut tree = InstanceTree::new(inst, mode.clone());
                if let Some(hook) = self.hook {
                    let metadata = hook.derive(&tree).unwrap_or_else(|| {
                        debug!("metadata path unresolved, recording empty metadata");
                        DerivedMetadata::new()
                    });
                    tree.attach_metadata(metadata);
                }
                debug!("{}: fully absorbed {} of {} bytes", root.name, size, buf.len());
                AbsorptionResult {
                    status: AbsorbStatus::FullyAbsorbed,
                    offset: size,
                    consumed_size: size,
                    instance_tree: Some(tree),
                    error: None,
                }
            }
            Err(f) => {
                let f = *f;
                debug!("{}: absorption stopped at offset {}: {}", root.name, f.offset, f.error);
                if matches!(f.error, AbsorbError::Rejected { .. }) && walker.anchors == 0 {
                    AbsorptionResult {
                        status: AbsorbStatus::Rejected,
                        offset: f.offset,
                        consumed_size: f.offset + f.examined,
                        instance_tree: None,
                        error: Some(f.error),
                    }
                } else {
                    AbsorptionResult {
                        status: AbsorbStatus::PartiallyAbsorbed,
                        offset: f.offset,
                        consumed_size: f.progress,
                        instance_tree: Some(InstanceTree::new(f.node, mode.clone())),
                        error: Some(f.error),
                    }
                }
            }
        }
    }
}

/// Position, end of the readable window, and inherited checks for one visit.
#[derive(Debug, Clone, Copy)]
struct Window {
    at: usize,
    limit: usize,
    csts: AbsorbConstraints,
}

impl Window {
    fn at(self, at: usize) -> Self {
        Window { at, ..self }
    }
}

struct Failed<'s> {
    /// The failing node, carrying whatever was absorbed below it.
    node: InstanceNode<'s>,
    error: AbsorbError,
    /// Start of the node that failed.
    offset: usize,
    /// Absolute end of what was absorbed when the failure was detected.
    progress: usize,
    /// Bytes read by the failing leaf.
    examined: usize,
}

type Step<'s> = Result<InstanceNode<'s>, Box<Failed<'s>>>;

fn leaf_failed(mut inst: InstanceNode<'_>, error: AbsorbError, examined: usize) -> Box<Failed<'_>> {
    inst.status = NodeStatus::Failed;
    let offset = inst.offset;
    let progress = inst.end();
    Box::new(Failed { node: inst, error, offset, progress, examined })
}

/// Wrap a child's failure into its parent.
fn parent_failed<'s>(mut parent: InstanceNode<'s>, f: Box<Failed<'s>>) -> Box<Failed<'s>> {
    let f = *f;
    parent.children.push(f.node);
    parent.status = NodeStatus::Failed;
    parent.size = f.progress - parent.offset;
    Box::new(Failed { node: parent, ..f })
}

/// Map a codec failure of the leaf at `at`; also returns the bytes it examined.
fn codec_error(node: &str, at: usize, e: CodecError) -> (AbsorbError, usize) {
    match e {
        CodecError::TruncatedInput { offset, needed, available } => (
            AbsorbError::TruncatedInput { node: node.to_string(), offset, needed, available },
            available,
        ),
        CodecError::ValueRejected(reason) => {
            (AbsorbError::ValueRejected { node: node.to_string(), offset: at, reason }, 0)
        }
        CodecError::ShapeMismatch { .. } => (
            AbsorbError::ValueRejected { node: node.to_string(), offset: at, reason: e.to_string() },
            0,
        ),
    }
}

fn facts_of(n: &InstanceNode<'_>) -> Facts {
    Facts {
        offset: n.offset,
        consumed: n.size,
        value: n.value.as_ref().and_then(Value::as_i128),
        count: (n.kind == NodeKind::Repetition).then_some(n.children.len()),
    }
}

fn enforced(c: &Constraint, csts: AbsorbConstraints) -> bool {
    match c.depends_on.as_ref().map(|d| d.source) {
        Some(DependencySource::ItemCount) => csts.structure,
        _ => csts.size,
    }
}

struct Walker<'a> {
    buf: &'a [u8],
    mode: &'a Mode,
    /// Anchors absorbed so far; a marker mismatch before the first one rejects the buffer.
    anchors: usize,
}

impl Walker<'_> {
    fn node<'s>(&mut self, node: &'s Node, name: String, w: Window, siblings: &Siblings) -> Step<'s> {
        let outer = w;
        let w = Window { csts: node.attrs.absorb.unwrap_or(w.csts), ..w };
        let body = node.body_for(self.mode);
        let inst = InstanceNode::new(name, node, body.kind(), w.at);
        match body {
            NodeBody::Scalar(spec) => self.scalar(inst, spec, w, siblings, None),
            NodeBody::BitPacked(bits) => self.bits(inst, bits, w),
            NodeBody::Group(children) => self.group(inst, children, w),
            NodeBody::Repetition(rep) => self.repetition(inst, rep, w, siblings),
        }
    }

    fn scalar<'s>(
        &mut self,
        mut inst: InstanceNode<'s>,
        spec: &'s ValueSpec,
        w: Window,
        siblings: &Siblings,
        region: Option<usize>,
    ) -> Step<'s> {
        let dependent = spec.dependent_constraint();
        let len = match spec.ty {
            ValueType::Int(_) => None,
            ValueType::Bytes => match region {
                Some(n) => Some(n),
                None => match self.bytes_len(&inst, spec, dependent.as_ref(), w, siblings) {
                    Ok(n) => Some(n),
                    Err(e) => return Err(leaf_failed(inst, e, 0)),
                },
            },
        };
        let (value, consumed) = match codec::read_value(&self.buf[..w.limit], w.at, spec, len) {
            Ok(x) => x,
            Err(e) => {
                let (err, examined) = codec_error(&inst.name, w.at, e);
                return Err(leaf_failed(inst, err, examined));
            }
        };
        let anchor = inst.grammar.attrs.anchor;
        if (anchor || w.csts.contents) && spec.constraint.is_value_constraint() {
            if let Err(e) = codec::check_value(&value, &spec.constraint) {
                let err = if anchor {
                    AbsorbError::Rejected {
                        node: inst.name.clone(),
                        offset: w.at,
                        value: value.as_i128().unwrap_or_default(),
                    }
                } else {
                    AbsorbError::ValueRejected {
                        node: inst.name.clone(),
                        offset: w.at,
                        reason: e.to_string(),
                    }
                };
                inst.value = Some(value);
                return Err(leaf_failed(inst, err, consumed));
            }
        }
        if spec.ty == ValueType::Bytes && w.csts.size && spec.constraint.depends_on.is_none() {
            if let Err(e) = codec::check_value(&value, &spec.constraint) {
                let err = AbsorbError::ValueRejected {
                    node: inst.name.clone(),
                    offset: w.at,
                    reason: e.to_string(),
                };
                return Err(leaf_failed(inst, err, consumed));
            }
        }
        inst.value = Some(value);
        inst.size = consumed;
        if let (ValueType::Int(_), Some(c)) = (spec.ty, dependent) {
            if enforced(&c, w.csts) {
                match check_dependent(&inst, &c, siblings) {
                    Ok(true) => {}
                    Ok(false) => inst.status = NodeStatus::Postponed,
                    Err(e) => return Err(leaf_failed(inst, e, consumed)),
                }
            }
        }
        trace!("{} @{} +{} = {:?}", inst.name, inst.offset, inst.size, inst.value);
        Ok(inst)
    }

    /// Width of a byte string that is not a region: from its dependency, else its static bound.
    fn bytes_len<'s>(
        &self,
        inst: &InstanceNode<'s>,
        spec: &ValueSpec,
        dependent: Option<&Constraint>,
        w: Window,
        siblings: &Siblings,
    ) -> Result<usize, AbsorbError> {
        let c = dependent.unwrap_or(&spec.constraint);
        let bound = match constraint::resolve(c, siblings) {
            Resolution::Bound(b) => b,
            Resolution::Postponed => {
                return Err(AbsorbError::UnresolvedConstraint {
                    node: inst.name.clone(),
                    depends_on: c.depends_on.as_ref().map(|d| d.sibling.clone()).unwrap_or_default(),
                })
            }
            Resolution::Rejected(reason) => {
                return Err(AbsorbError::ValueRejected { node: inst.name.clone(), offset: w.at, reason })
            }
        };
        let available = (w.limit - w.at) as u64;
        let len = match bound.max {
            Some(max) if max == bound.min => max,
            Some(max) => max.min(available),
            None => available,
        };
        if len < bound.min || len > available {
            return Err(AbsorbError::TruncatedInput {
                node: inst.name.clone(),
                offset: w.at,
                needed: len.max(bound.min) as usize,
                available: available as usize,
            });
        }
        Ok(len as usize)
    }

    fn bits<'s>(&mut self, mut inst: InstanceNode<'s>, spec: &'s BitFieldSpec, w: Window) -> Step<'s> {
        let (value, consumed) = match codec::decode_bits(&self.buf[..w.limit], w.at, spec) {
            Ok(x) => x,
            Err(e) => {
                let (err, examined) = codec_error(&inst.name, w.at, e);
                return Err(leaf_failed(inst, err, examined));
            }
        };
        if w.csts.contents {
            if let Err(e) = codec::check_bits(&value, spec) {
                let err = AbsorbError::ValueRejected {
                    node: inst.name.clone(),
                    offset: w.at,
                    reason: e.to_string(),
                };
                inst.value = Some(value);
                return Err(leaf_failed(inst, err, consumed));
            }
        }
        inst.value = Some(value);
        inst.size = consumed;
        trace!("{} @{} +{} = {:?}", inst.name, inst.offset, inst.size, inst.value);
        Ok(inst)
    }

    fn group<'s>(&mut self, mut inst: InstanceNode<'s>, children: &'s [Node], w: Window) -> Step<'s> {
        let mut siblings = Siblings::default();
        let mut pending: Vec<usize> = Vec::new();
        let mut pos = w.at;
        for (i, child) in children.iter().enumerate() {
            let step = if child.attrs.postponable {
                self.region(child, children.get(i + 1), w.at(pos), &siblings)
            } else {
                self.node(child, child.name.clone(), w.at(pos), &siblings)
            };
            let absorbed = match step {
                Ok(n) => n,
                Err(f) => return Err(parent_failed(inst, f)),
            };
            if child.attrs.anchor {
                self.anchors += 1;
            }
            pos = absorbed.end();
            siblings.record(&child.name, facts_of(&absorbed));
            if absorbed.status == NodeStatus::Postponed {
                pending.push(inst.children.len());
            }
            inst.children.push(absorbed);

            let mut k = 0;
            while k < pending.len() {
                let p = pending[k];
                let c = match dependent_of(&inst.children[p], self.mode) {
                    Some(c) => c,
                    None => {
                        k += 1;
                        continue;
                    }
                };
                if c.depends_on.as_ref().map(|d| d.sibling.as_str()) != Some(child.name.as_str()) {
                    k += 1;
                    continue;
                }
                match check_dependent(&inst.children[p], &c, &siblings) {
                    Ok(true) => {
                        debug!("{}: postponed constraint resolved after {}", inst.children[p].name, child.name);
                        inst.children[p].status = NodeStatus::Absorbed;
                        pending.remove(k);
                    }
                    Ok(false) => k += 1,
                    Err(e) => {
                        inst.children[p].status = NodeStatus::Failed;
                        let offset = inst.children[p].offset;
                        return Err(group_failed(inst, e, offset, pos));
                    }
                }
            }
        }
        if let Some(&p) = pending.first() {
            let node = &inst.children[p];
            let depends_on = dependent_of(node, self.mode)
                .and_then(|c| c.depends_on)
                .map(|d| d.sibling)
                .unwrap_or_default();
            let e = AbsorbError::UnresolvedConstraint { node: node.name.clone(), depends_on };
            let offset = node.offset;
            return Err(group_failed(inst, e, offset, pos));
        }
        inst.size = pos - w.at;
        Ok(inst)
    }

    /// A postponable byte string: it ends where `anchor` first absorbs. If the anchor absorbs
    /// nowhere the region is empty and the anchor's own failure is reported next.
    fn region<'s>(&mut self, node: &'s Node, anchor: Option<&'s Node>, w: Window, siblings: &Siblings) -> Step<'s> {
        let outer = w;
        let w = Window { csts: node.attrs.absorb.unwrap_or(w.csts), ..w };
        let body = node.body_for(self.mode);
        let spec = match body {
            NodeBody::Scalar(spec) => spec,
            _ => return self.node(node, node.name.clone(), w, siblings),
        };
        let end = match anchor {
            None => w.limit,
            Some(a) => (w.at..=w.limit)
                .find(|&at| self.probe(a, outer.at(at), siblings))
                .unwrap_or(w.at),
        };
        debug!("{}: region [{}, {}) up to {}", node.name, w.at, end, anchor.map_or("end", |a| a.name.as_str()));
        let inst = InstanceNode::new(node.name.clone(), node, body.kind(), w.at);
        self.scalar(inst, spec, w, siblings, Some(end - w.at))
    }

    fn probe<'s>(&mut self, anchor: &'s Node, w: Window, siblings: &Siblings) -> bool {
        let anchors = self.anchors;
        let ok = self.node(anchor, anchor.name.clone(), w, siblings).is_ok();
        self.anchors = anchors;
        ok
    }

    fn repetition<'s>(
        &mut self,
        mut inst: InstanceNode<'s>,
        rep: &'s Repetition,
        w: Window,
        siblings: &Siblings,
    ) -> Step<'s> {
        let mut pos = w.at;
        match &rep.bound {
            RepeatBound::Quantity(q) => {
                let n = match siblings.value(q) {
                    Some(n) => n,
                    None => {
                        let e = AbsorbError::UnresolvedConstraint { node: inst.name.clone(), depends_on: q.clone() };
                        return Err(leaf_failed(inst, e, 0));
                    }
                };
                let count = usize::try_from(n).unwrap_or(0);
                if n < 0 || (w.csts.structure && (count < rep.min || count > rep.max)) {
                    let e = AbsorbError::RepetitionBoundViolated {
                        node: inst.name.clone(),
                        count,
                        min: rep.min,
                        max: rep.max,
                    };
                    return Err(leaf_failed(inst, e, 0));
                }
                for k in 0..count {
                    let item = match self.node(&rep.template, k.to_string(), w.at(pos), &Siblings::default()) {
                        Ok(item) => item,
                        Err(f) => return Err(parent_failed(inst, f)),
                    };
                    pos = item.end();
                    inst.children.push(item);
                }
            }
            RepeatBound::Length { field, base } => {
                let declared = match siblings.value(field) {
                    Some(n) => n,
                    None => {
                        let e = AbsorbError::UnresolvedConstraint { node: inst.name.clone(), depends_on: field.clone() };
                        return Err(leaf_failed(inst, e, 0));
                    }
                };
                // length errors point at the length field
                let field_at = siblings.get(field).map_or(w.at, |f| f.offset);
                let budget = match u64::try_from(declared - *base as i128) {
                    Ok(b) => b as usize,
                    Err(_) => {
                        let e = AbsorbError::InvalidLength {
                            node: field.clone(),
                            declared,
                            expected: ResolvedBound { min: *base, max: None },
                        };
                        return Err(group_failed(inst, e, field_at, w.at));
                    }
                };
                let available = w.limit - w.at;
                if budget > available {
                    let e = AbsorbError::TruncatedInput {
                        node: inst.name.clone(),
                        offset: w.at,
                        needed: budget,
                        available,
                    };
                    return Err(leaf_failed(inst, e, available));
                }
                let end = w.at + budget;
                let inner = Window { limit: end, ..w };
                while pos < end {
                    let k = inst.children.len();
                    let item = match self.node(&rep.template, k.to_string(), inner.at(pos), &Siblings::default()) {
                        Ok(item) => item,
                        Err(f) => {
                            let mut f = parent_failed(inst, f);
                            // cut short by the declared length, not by the buffer
                            if let AbsorbError::TruncatedInput { offset, needed, .. } = f.error {
                                if offset + needed <= w.limit {
                                    f.error = AbsorbError::InvalidLength {
                                        node: field.clone(),
                                        declared,
                                        expected: ResolvedBound { min: (offset + needed - w.at) as u64 + base, max: None },
                                    };
                                    f.offset = field_at;
                                }
                            }
                            return Err(f);
                        }
                    };
                    let empty = item.size == 0;
                    pos = item.end();
                    inst.children.push(item);
                    if empty {
                        break;
                    }
                }
                if pos != end {
                    let e = AbsorbError::InvalidLength {
                        node: field.clone(),
                        declared,
                        expected: ResolvedBound::exact((pos - w.at) as u64 + base),
                    };
                    return Err(group_failed(inst, e, field_at, pos));
                }
                self.check_count(&inst, rep, w, pos)?;
            }
            RepeatBound::Greedy => {
                while inst.children.len() < rep.max && pos < w.limit {
                    let k = inst.children.len();
                    match self.node(&rep.template, k.to_string(), w.at(pos), &Siblings::default()) {
                        Ok(item) if item.size > 0 => {
                            pos = item.end();
                            inst.children.push(item);
                        }
                        _ => break,
                    }
                }
                self.check_count(&inst, rep, w, pos)?;
            }
        }
        inst.size = pos - w.at;
        Ok(inst)
    }

    fn check_count<'s>(&self, inst: &InstanceNode<'s>, rep: &Repetition, w: Window, pos: usize) -> Result<(), Box<Failed<'s>>> {
        let count = inst.children.len();
        if w.csts.structure && (count < rep.min || count > rep.max) {
            let e = AbsorbError::RepetitionBoundViolated {
                node: inst.name.clone(),
                count,
                min: rep.min,
                max: rep.max,
            };
            return Err(group_failed(inst.clone(), e, inst.offset, pos));
        }
        Ok(())
    }
}

fn group_failed<'s>(mut inst: InstanceNode<'s>, error: AbsorbError, offset: usize, progress: usize) -> Box<Failed<'s>> {
    inst.status = NodeStatus::Failed;
    inst.size = progress - inst.offset;
    Box::new(Failed { node: inst, error, offset, progress, examined: 0 })
}

fn dependent_of(inst: &InstanceNode<'_>, mode: &Mode) -> Option<Constraint> {
    match inst.grammar.body_for(mode) {
        NodeBody::Scalar(spec) => spec.dependent_constraint(),
        _ => None,
    }
}

/// `Ok(false)` while the dependency is unresolved; `Ok(true)` once the declared value agrees.
fn check_dependent(inst: &InstanceNode<'_>, c: &Constraint, siblings: &Siblings) -> Result<bool, AbsorbError> {
    let bound = match constraint::resolve(c, siblings) {
        Resolution::Postponed => return Ok(false),
        Resolution::Rejected(reason) => {
            return Err(AbsorbError::ValueRejected { node: inst.name.clone(), offset: inst.offset, reason })
        }
        Resolution::Bound(b) => b,
    };
    let declared = inst.value.as_ref().and_then(Value::as_i128).unwrap_or(-1);
    if u64::try_from(declared).is_ok_and(|d| bound.admits(d)) {
        return Ok(true);
    }
    Err(match c.depends_on.as_ref().map(|d| d.source) {
        Some(DependencySource::ItemCount) => AbsorbError::RepetitionBoundViolated {
            node: inst.name.clone(),
            count: siblings
                .get(c.depends_on.as_ref().map_or("", |d| d.sibling.as_str()))
                .and_then(|f| f.count)
                .unwrap_or(0),
            min: bound.min as usize,
            max: bound.max.unwrap_or(bound.min) as usize,
        },
        _ => AbsorbError::InvalidLength { node: inst.name.clone(), declared, expected: bound },
    })
}
