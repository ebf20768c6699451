//! Arena tree store
//!
//! Nodes are appended once and addressed by [`NodeId`]. A node receives all of
//! its scalar arguments before its first child, and [`Tree::finish`] checks the
//! finished node against its kind's [`Arity`](super::Arity). A layout that
//! breaks the table is a front-end bug and aborts through
//! [`internal_error`].
//!
//! Constant folding may leave replaced operands behind as unreachable nodes;
//! they are never referenced from the root.

use super::{Category, Children, NodeKind, Span};
use crate::errors::internal_error;
use crate::tables::{Item, TypeRef};

/// Handle of a node in the [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Result of any construction that failed with a reported error
    pub const BROKEN: NodeId = NodeId(u32::MAX);

    pub fn is_valid(self) -> bool {
        self != NodeId::BROKEN
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    span: Span,
    args: Vec<Item>,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<NodeData>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends an empty node of `kind`.
    pub fn create_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            span,
            args: Vec::with_capacity(kind.arity().args),
            children: Vec::new(),
        });
        id
    }

    /// Appends one scalar argument. Arguments must all precede children.
    pub fn append_arg(&mut self, node: NodeId, value: Item) {
        let data = self.data_mut(node);
        if !data.children.is_empty() {
            internal_error(format_args!(
                "argument appended to {:?} after its children",
                data.kind
            ));
        }
        if data.args.len() == data.kind.arity().args {
            internal_error(format_args!("too many arguments for {:?}", data.kind));
        }
        data.args.push(value);
    }

    /// Makes `child` the next child of `parent`.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        if !child.is_valid() {
            internal_error("broken node attached as a child");
        }
        self.data(child);

        let data = self.data_mut(parent);
        if data.args.len() != data.kind.arity().args {
            internal_error(format_args!(
                "child attached to {:?} before its arguments",
                data.kind
            ));
        }
        data.children.push(child);
    }

    /// Checks `node` against its arity and hands it back.
    pub fn finish(&self, node: NodeId) -> NodeId {
        let data = self.data(node);
        let arity = data.kind.arity();
        if data.args.len() != arity.args {
            internal_error(format_args!(
                "{:?} has {} arguments, expected {}",
                data.kind,
                data.args.len(),
                arity.args
            ));
        }

        let count = data.children.len();
        let fits = match self.expected_children(node) {
            Some(expected) => count == expected,
            None => match arity.children {
                Children::AtLeast(min) => count >= min,
                _ => false,
            },
        };
        if !fits {
            internal_error(format_args!(
                "{:?} has {count} children, layout is {:?}",
                data.kind, arity.children
            ));
        }
        node
    }

    /// Child count implied by the node's kind and arguments, when fixed
    pub fn expected_children(&self, node: NodeId) -> Option<usize> {
        let data = self.data(node);
        match data.kind.arity().children {
            Children::Exactly(n) => Some(n),
            Children::FromArgs(base, indices) => Some(
                base + indices
                    .iter()
                    .map(|&i| data.args.get(i).map_or(0, |&v| v.max(0) as usize))
                    .sum::<usize>(),
            ),
            Children::AtLeast(_) => None,
        }
    }

    pub fn is_valid(&self, node: NodeId) -> bool {
        node.is_valid() && node.index() < self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.data(node).kind
    }

    pub fn span(&self, node: NodeId) -> Span {
        self.data(node).span
    }

    pub fn arg(&self, node: NodeId, index: usize) -> Item {
        let data = self.data(node);
        match data.args.get(index) {
            Some(&value) => value,
            None => internal_error(format_args!("{:?} has no argument {index}", data.kind)),
        }
    }

    pub fn args(&self, node: NodeId) -> &[Item] {
        &self.data(node).args
    }

    /// Rewrites an argument that was already appended
    pub fn set_arg(&mut self, node: NodeId, index: usize, value: Item) {
        let data = self.data_mut(node);
        match data.args.get_mut(index) {
            Some(slot) => *slot = value,
            None => internal_error(format_args!("{:?} has no argument {index}", data.kind)),
        }
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.data(node).children.len()
    }

    pub fn nth_child(&self, node: NodeId, index: usize) -> NodeId {
        let data = self.data(node);
        match data.children.get(index) {
            Some(&child) => child,
            None => internal_error(format_args!("{:?} has no child {index}", data.kind)),
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    /// Replaces a child, used when a conversion wraps an operand in place
    pub fn set_child(&mut self, node: NodeId, index: usize, child: NodeId) {
        if !child.is_valid() {
            internal_error("broken node set as a child");
        }
        let data = self.data_mut(node);
        match data.children.get_mut(index) {
            Some(slot) => *slot = child,
            None => internal_error(format_args!("{:?} has no child {index}", data.kind)),
        }
    }

    pub fn expression_type(&self, node: NodeId) -> TypeRef {
        self.expect_expression(node);
        TypeRef::from_item(self.arg(node, 0))
    }

    pub fn expression_category(&self, node: NodeId) -> Category {
        self.expect_expression(node);
        Category::from_item(self.arg(node, 1))
    }

    pub fn set_expression_type(&mut self, node: NodeId, ty: TypeRef) {
        self.expect_expression(node);
        self.set_arg(node, 0, ty.to_item());
    }

    /// Payload of an integer literal
    pub fn literal_integer(&self, node: NodeId) -> Item {
        self.expect_kind(node, NodeKind::IntegerLiteral);
        self.arg(node, 2)
    }

    /// Payload of a floating literal
    pub fn literal_floating(&self, node: NodeId) -> f64 {
        self.expect_kind(node, NodeKind::FloatingLiteral);
        f64::from_bits(self.arg(node, 2) as u64)
    }

    /// Nodes reachable from `root` in pre-order
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        order
    }

    fn expect_expression(&self, node: NodeId) {
        let kind = self.kind(node);
        if !kind.is_expression() {
            internal_error(format_args!("{kind:?} is not an expression"));
        }
    }

    fn expect_kind(&self, node: NodeId, expected: NodeKind) {
        let kind = self.kind(node);
        if kind != expected {
            internal_error(format_args!("expected {expected:?}, found {kind:?}"));
        }
    }

    fn data(&self, node: NodeId) -> &NodeData {
        match self.nodes.get(node.index()) {
            Some(data) => data,
            None => internal_error(format_args!("dangling node handle {}", node.0)),
        }
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        match self.nodes.get_mut(node.index()) {
            Some(data) => data,
            None => internal_error(format_args!("dangling node handle {}", node.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceLocation;

    fn span() -> Span {
        let loc = SourceLocation::new(1, 1);
        Span::new(loc, loc)
    }

    fn literal(tree: &mut Tree, value: Item) -> NodeId {
        let node = tree.create_node(NodeKind::IntegerLiteral, span());
        tree.append_arg(node, TypeRef::INTEGER.to_item());
        tree.append_arg(node, Category::Rvalue.to_item());
        tree.append_arg(node, value);
        tree.finish(node)
    }

    #[test]
    fn test_build_binary_node() {
        let mut tree = Tree::new();
        let left = literal(&mut tree, 1);
        let right = literal(&mut tree, 2);

        let node = tree.create_node(NodeKind::Binary, span());
        tree.append_arg(node, TypeRef::INTEGER.to_item());
        tree.append_arg(node, Category::Rvalue.to_item());
        tree.append_arg(node, crate::ast::BinaryOp::Add.to_item());
        tree.attach_child(node, left);
        tree.attach_child(node, right);
        tree.finish(node);

        assert_eq!(tree.child_count(node), 2);
        assert_eq!(tree.nth_child(node, 1), right);
        assert_eq!(tree.literal_integer(tree.nth_child(node, 0)), 1);
        assert_eq!(tree.expression_type(node), TypeRef::INTEGER);
        assert_eq!(tree.preorder(node), vec![node, left, right]);
    }

    #[test]
    fn test_optional_children_follow_flags() {
        let mut tree = Tree::new();
        let value = literal(&mut tree, 0);

        let ret = tree.create_node(NodeKind::Return, span());
        tree.append_arg(ret, 1);
        assert_eq!(tree.expected_children(ret), Some(1));
        tree.attach_child(ret, value);
        tree.finish(ret);

        let bare = tree.create_node(NodeKind::Return, span());
        tree.append_arg(bare, 0);
        assert_eq!(tree.expected_children(bare), Some(0));
        tree.finish(bare);
    }

    #[test]
    fn test_broken_handle() {
        let tree = Tree::new();
        assert!(!NodeId::BROKEN.is_valid());
        assert!(!tree.is_valid(NodeId::BROKEN));
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_argument_after_child_is_fatal() {
        let mut tree = Tree::new();
        let child = literal(&mut tree, 3);
        let node = tree.create_node(NodeKind::ExpressionStatement, span());
        tree.attach_child(node, child);
        tree.append_arg(node, 0);
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_wrong_child_count_is_fatal() {
        let mut tree = Tree::new();
        let node = tree.create_node(NodeKind::While, span());
        tree.finish(node);
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_child_before_arguments_is_fatal() {
        let mut tree = Tree::new();
        let child = literal(&mut tree, 3);
        let node = tree.create_node(NodeKind::Labeled, span());
        tree.attach_child(node, child);
    }
}
