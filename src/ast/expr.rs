//! Transient expression values
//!
//! Every builder call returns an [`Expr`] describing the node it appended. A
//! failed construction returns [`Expr::broken`]; builders short-circuit on a
//! broken operand without reporting again, so one root cause yields one
//! diagnostic.

use super::{Category, NodeId, Span};
use crate::tables::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expr {
    pub node: NodeId,
    pub ty: TypeRef,
    pub category: Category,
    pub span: Span,
}

impl Expr {
    pub fn new(node: NodeId, ty: TypeRef, category: Category, span: Span) -> Self {
        Self {
            node,
            ty,
            category,
            span,
        }
    }

    pub fn broken() -> Self {
        Self {
            node: NodeId::BROKEN,
            ty: TypeRef::UNDEFINED,
            category: Category::Rvalue,
            span: Span::default(),
        }
    }

    /// A broken value that still remembers where it came from
    pub fn broken_at(span: Span) -> Self {
        Self {
            span,
            ..Self::broken()
        }
    }

    pub fn is_broken(&self) -> bool {
        !self.node.is_valid()
    }

    pub fn is_valid(&self) -> bool {
        self.node.is_valid()
    }

    pub fn is_lvalue(&self) -> bool {
        self.category == Category::Lvalue
    }
}
