//! Format instance trees and values for display (CLI dump, logs).

use crate::absorb::AbsorptionResult;
use crate::instance::{InstanceNode, InstanceTree, NodeStatus};
use crate::value::Value;

/// Byte strings longer than this are shown truncated.
const MAX_HEX_BYTES: usize = 16;

/// Raw scalar string: decimal integers, bit subfields as a list.
pub fn format_scalar_raw(v: &Value) -> String {
    match v {
        Value::U8(x) => format!("{}", x),
        Value::U16(x) => format!("{}", x),
        Value::U32(x) => format!("{}", x),
        Value::U64(x) => format!("{}", x),
        Value::I8(x) => format!("{}", x),
        Value::I16(x) => format!("{}", x),
        Value::I32(x) => format!("{}", x),
        Value::I64(x) => format!("{}", x),
        Value::Bits(fields) => format!("{:?}", fields),
        Value::Bytes(b) => format!("hex({})", hex_string(b)),
    }
}

fn hex_string(b: &[u8]) -> String {
    let shown = b.iter().take(MAX_HEX_BYTES).map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ");
    if b.len() > MAX_HEX_BYTES {
        format!("{} .. ({} bytes)", shown, b.len())
    } else {
        shown
    }
}

fn status_tag(s: NodeStatus) -> &'static str {
    match s {
        NodeStatus::Absorbed => "",
        NodeStatus::Postponed => " [postponed]",
        NodeStatus::Failed => " [failed]",
    }
}

fn node_to_dump(n: &InstanceNode<'_>, indent: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    let value = n.value.as_ref().map(|v| format!(" = {}", format_scalar_raw(v))).unwrap_or_default();
    lines.push(format!(
        "{}{} @{:#06x} +{}{}{}",
        pad,
        n.name,
        n.offset,
        n.size,
        value,
        status_tag(n.status)
    ));
    for child in &n.children {
        node_to_dump(child, indent + 1, lines);
    }
}

/// One line per node, indented by depth: `name @offset +size = value [status]`.
pub fn format_tree(tree: &InstanceTree<'_>) -> String {
    let mut lines = Vec::new();
    node_to_dump(tree.root(), 0, &mut lines);
    if let Some(meta) = tree.metadata() {
        for (k, v) in meta {
            lines.push(format!("# {} = {}", k, format_scalar_raw(v)));
        }
    }
    lines.join("\n")
}

/// Single-line summary of an absorption outcome.
pub fn result_summary_line(r: &AbsorptionResult<'_>) -> String {
    let mut line = format!("{:?} offset={} consumed={}", r.status, r.offset, r.consumed_size);
    if let Some(e) = &r.error {
        line.push_str(&format!(" error: {}", e));
    }
    line
}
