//! Instance trees: the materialized result of one absorption.
//!
//! Every [`InstanceNode`] mirrors one grammar [`Node`] and borrows it; the grammar is shared by
//! all trees built from a schema while each tree exclusively owns its instance nodes.
//!
//! ## Path expressions
//!
//! Paths are `/`-separated segments matched from the root, whose name is the first segment:
//!
//! | Segment | Matches |
//! |---------|---------|
//! | `name`  | a node with exactly that name (repetition items are named `0`, `1`, ...) |
//! | `*`     | any single node (one level) |
//! | `**`    | zero or more levels |
//!
//! [`InstanceTree::find`] returns every match in document order, without duplicates;
//! [`InstanceTree::get`] returns the first.

use crate::ast::{Mode, Node, NodeKind};
use crate::metadata::DerivedMetadata;
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Absorbed,
    /// A constraint of this node still waits for a sibling.
    Postponed,
    Failed,
}

#[derive(Clone, PartialEq)]
pub struct InstanceNode<'s> {
    pub name: String,
    pub grammar: &'s Node,
    pub kind: NodeKind,
    pub value: Option<Value>,
    /// Absolute byte offset in the absorbed buffer.
    pub offset: usize,
    pub size: usize,
    pub status: NodeStatus,
    pub children: Vec<InstanceNode<'s>>,
}

impl<'s> InstanceNode<'s> {
    pub(crate) fn new(name: impl Into<String>, grammar: &'s Node, kind: NodeKind, offset: usize) -> Self {
        InstanceNode {
            name: name.into(),
            grammar,
            kind,
            value: None,
            offset,
            size: 0,
            status: NodeStatus::Absorbed,
            children: Vec::new(),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    pub fn is_mutable(&self) -> bool {
        self.grammar.attrs.mutable
    }

    pub fn child(&self, name: &str) -> Option<&InstanceNode<'s>> {
        self.children.iter().find(|c| c.name == name)
    }

    fn at(&self, trail: &[usize]) -> Option<&InstanceNode<'s>> {
        trail.iter().try_fold(self, |n, &i| n.children.get(i))
    }

    fn at_mut(&mut self, trail: &[usize]) -> Option<&mut InstanceNode<'s>> {
        trail.iter().try_fold(self, |n, &i| n.children.get_mut(i))
    }
}

impl fmt::Debug for InstanceNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("status", &self.status)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Name(String),
    Any,
    AnyDepth,
}

/// Parsed path expression. Empty segments are ignored, so `a//b` is `a/b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr(Vec<Segment>);

impl PathExpr {
    pub fn parse(path: &str) -> Self {
        PathExpr(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s {
                    "*" => Segment::Any,
                    "**" => Segment::AnyDepth,
                    name => Segment::Name(name.to_string()),
                })
                .collect(),
        )
    }

    /// Index trails (child positions from the root) of every match, in document order.
    fn matches(&self, root: &InstanceNode<'_>) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut trail = Vec::new();
        if !self.0.is_empty() {
            walk(root, &self.0, &mut trail, &mut out);
        }
        out
    }
}

fn walk(node: &InstanceNode<'_>, segs: &[Segment], trail: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    let (seg, rest) = match segs.split_first() {
        Some(x) => x,
        None => return,
    };
    match seg {
        Segment::AnyDepth => {
            // zero levels, then one or more
            if rest.is_empty() {
                push_unique(out, trail);
            } else {
                walk(node, rest, trail, out);
            }
            for (i, child) in node.children.iter().enumerate() {
                trail.push(i);
                walk(child, segs, trail, out);
                trail.pop();
            }
        }
        Segment::Any | Segment::Name(_) => {
            if let Segment::Name(name) = seg {
                if node.name != *name {
                    return;
                }
            }
            if rest.is_empty() {
                push_unique(out, trail);
                return;
            }
            for (i, child) in node.children.iter().enumerate() {
                trail.push(i);
                walk(child, rest, trail, out);
                trail.pop();
            }
        }
    }
}

fn push_unique(out: &mut Vec<Vec<usize>>, trail: &[usize]) {
    if !out.iter().any(|t| t.as_slice() == trail) {
        out.push(trail.to_vec());
    }
}

/// A complete or partial absorption result, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceTree<'s> {
    root: InstanceNode<'s>,
    mode: Mode,
    metadata: Option<DerivedMetadata>,
}

impl<'s> InstanceTree<'s> {
    pub(crate) fn new(root: InstanceNode<'s>, mode: Mode) -> Self {
        InstanceTree { root, mode, metadata: None }
    }

    pub(crate) fn attach_metadata(&mut self, metadata: DerivedMetadata) {
        self.metadata = Some(metadata);
    }

    pub fn root(&self) -> &InstanceNode<'s> {
        &self.root
    }

    /// Mode the tree was absorbed in.
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Derived metadata; only present on fully absorbed trees built with a hook.
    pub fn metadata(&self) -> Option<&DerivedMetadata> {
        self.metadata.as_ref()
    }

    pub fn find(&self, path: &str) -> Vec<&InstanceNode<'s>> {
        PathExpr::parse(path)
            .matches(&self.root)
            .iter()
            .filter_map(|t| self.root.at(t))
            .collect()
    }

    pub fn get(&self, path: &str) -> Option<&InstanceNode<'s>> {
        PathExpr::parse(path)
            .matches(&self.root)
            .first()
            .and_then(|t| self.root.at(t))
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut InstanceNode<'s>> {
        let trail = PathExpr::parse(path).matches(&self.root).into_iter().next()?;
        self.root.at_mut(&trail)
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.get(path).and_then(|n| n.value.as_ref())
    }

    /// Replace the value of the first node matching `path`. Returns false if nothing matched.
    pub fn set_value(&mut self, path: &str, value: Value) -> bool {
        match self.get_mut(path) {
            Some(n) => {
                n.value = Some(value);
                true
            }
            None => false,
        }
    }

    /// All nodes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceNode<'s>> {
        let mut stack = vec![&self.root];
        std::iter::from_fn(move || {
            let n = stack.pop()?;
            stack.extend(n.children.iter().rev());
            Some(n)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueSpec;

    fn leaf<'s>(g: &'s Node, name: &str, v: u8) -> InstanceNode<'s> {
        let mut n = InstanceNode::new(name, g, NodeKind::Scalar, 0);
        n.value = Some(Value::U8(v));
        n
    }

    fn sample(g: &Node) -> InstanceTree<'_> {
        // root/{hdr/{x, items/{0/x, 1/x}}, x}
        let item = |name: &str, v| {
            let mut i = InstanceNode::new(name, g, NodeKind::Group, 0);
            i.children.push(leaf(g, "x", v));
            i
        };
        let mut items = InstanceNode::new("items", g, NodeKind::Repetition, 0);
        items.children = vec![item("0", 2), item("1", 3)];
        let mut hdr = InstanceNode::new("hdr", g, NodeKind::Group, 0);
        hdr.children = vec![leaf(g, "x", 1), items];
        let mut root = InstanceNode::new("root", g, NodeKind::Group, 0);
        root.children = vec![hdr, leaf(g, "x", 4)];
        InstanceTree::new(root, Mode::MAIN)
    }

    fn values(tree: &InstanceTree<'_>, path: &str) -> Vec<u64> {
        tree.find(path).iter().filter_map(|n| n.value.as_ref()?.as_u64()).collect()
    }

    #[test]
    fn exact_path_from_root() {
        let g = Node::scalar("g", ValueSpec::uint8());
        let tree = sample(&g);
        assert_eq!(values(&tree, "root/hdr/x"), vec![1]);
        assert_eq!(values(&tree, "/root/x"), vec![4]);
        assert!(tree.get("hdr/x").is_none());
    }

    #[test]
    fn single_level_wildcard() {
        let g = Node::scalar("g", ValueSpec::uint8());
        let tree = sample(&g);
        assert_eq!(values(&tree, "root/*/x"), vec![1]);
        assert_eq!(values(&tree, "root/hdr/items/*/x"), vec![2, 3]);
        assert!(tree.find("*/x").iter().all(|n| n.name == "x"));
    }

    #[test]
    fn recursive_wildcard_in_document_order() {
        let g = Node::scalar("g", ValueSpec::uint8());
        let tree = sample(&g);
        assert_eq!(values(&tree, "**/x"), vec![1, 2, 3, 4]);
        assert_eq!(values(&tree, "**/**/x"), vec![1, 2, 3, 4]);
        assert_eq!(values(&tree, "root/**/items/1/x"), vec![3]);
        assert_eq!(tree.find("**").len(), tree.iter().count());
    }

    #[test]
    fn set_value_edits_first_match() {
        let g = Node::scalar("g", ValueSpec::uint8());
        let mut tree = sample(&g);
        assert!(tree.set_value("**/x", Value::U8(9)));
        assert_eq!(values(&tree, "**/x"), vec![9, 2, 3, 4]);
        assert!(!tree.set_value("root/nope", Value::U8(0)));
    }
}
