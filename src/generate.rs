//! Serialize an instance tree back to bytes.
//!
//! Every node is encoded with its body for the requested mode. Computed fields (`length_of`,
//! `count_of`) are recomputed from their siblings, so editing a tree and generating it repairs
//! the lengths and counts that describe the edited part.

use crate::ast::{Computed, Mode, NodeBody, ValueSpec, ValueType};
use crate::codec::{self, CodecError};
use crate::instance::{InstanceNode, InstanceTree};
use tracing::trace;

/// Encode `tree` in `mode`.
pub fn generate(tree: &InstanceTree<'_>, mode: &Mode) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    encode_node(tree.root(), mode, &mut out)?;
    Ok(out)
}

fn mismatch(n: &InstanceNode<'_>, mode: &Mode) -> CodecError {
    CodecError::ShapeMismatch { node: n.name.clone(), mode: mode.to_string() }
}

fn encode_node(n: &InstanceNode<'_>, mode: &Mode, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let body = n.grammar.body_for(mode);
    if body.kind() != n.kind {
        return Err(mismatch(n, mode));
    }
    match body {
        NodeBody::Scalar(spec) => {
            let v = n.value.as_ref().ok_or_else(|| mismatch(n, mode))?;
            out.extend(codec::encode_value(v, spec)?);
        }
        NodeBody::BitPacked(bits) => {
            let v = n.value.as_ref().ok_or_else(|| mismatch(n, mode))?;
            out.extend(codec::encode_bits(v, bits)?);
        }
        NodeBody::Group(children) => {
            if children.len() != n.children.len() {
                return Err(mismatch(n, mode));
            }
            encode_group(n, mode, out)?;
        }
        NodeBody::Repetition(_) => {
            for item in &n.children {
                encode_node(item, mode, out)?;
            }
        }
    }
    Ok(())
}

/// Encode children, then patch computed fields once every sibling's size and count is known.
fn encode_group(n: &InstanceNode<'_>, mode: &Mode, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let mut parts: Vec<Vec<u8>> = Vec::with_capacity(n.children.len());
    let mut computed: Vec<(usize, &ValueSpec, &Computed)> = Vec::new();
    for (i, child) in n.children.iter().enumerate() {
        match child.grammar.body_for(mode) {
            NodeBody::Scalar(spec @ ValueSpec { computed: Some(c), .. }) => {
                if child.kind != crate::ast::NodeKind::Scalar {
                    return Err(mismatch(child, mode));
                }
                computed.push((i, spec, c));
                parts.push(Vec::new());
            }
            _ => {
                let mut buf = Vec::new();
                encode_node(child, mode, &mut buf)?;
                parts.push(buf);
            }
        }
    }
    for (i, spec, c) in computed {
        let sibling = |name: &str| {
            n.children
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| CodecError::ValueRejected(format!("{}: no sibling {}", n.children[i].name, name)))
        };
        let value = match c {
            Computed::LengthOf { node, base } => parts[sibling(node)?].len() as i128 + *base as i128,
            Computed::CountOf { node } => n.children[sibling(node)?].children.len() as i128,
        };
        let ty = match spec.ty {
            ValueType::Int(ty) => ty,
            ValueType::Bytes => return Err(mismatch(&n.children[i], mode)),
        };
        trace!("{}: computed {}", n.children[i].name, value);
        parts[i] = codec::encode_int(value, ty, spec)?;
    }
    for p in parts {
        out.extend(p);
    }
    Ok(())
}
