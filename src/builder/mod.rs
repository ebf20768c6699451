//! AST builder
//!
//! The parser hands already-built operands to the `build_*` methods of
//! [`Builder`], which validate them against the language's typing rules and
//! append one new node. Every method follows the same contract:
//!
//! - a broken operand yields a broken result with no further diagnostic
//! - a rule violation records exactly one diagnostic and yields a broken result
//! - only a malformed tree is fatal, through [`crate::errors::internal_error`]
//!
//! The methods are split across files with `impl Builder` blocks:
//! - `conversions`: implicit casts, assignment compatibility, constant folding
//! - `expressions`: identifiers, literals, operators, calls, members, initializers
//! - `statements`: statements, declarations and function definitions

mod conversions;
mod expressions;
mod statements;

use crate::ast::{Category, Expr, NodeId, NodeKind, Span};
use crate::config::FrontendOptions;
use crate::errors::{ErrorKind, WarningKind};
use crate::syntax::Syntax;
use crate::tables::{Item, TypeRef};

/// Validating constructor of tree nodes over a borrowed [`Syntax`]
pub struct Builder<'a> {
    pub(crate) sx: &'a mut Syntax,
    printf_max_args: usize,
}

impl<'a> Builder<'a> {
    pub fn new(sx: &'a mut Syntax, options: &FrontendOptions) -> Self {
        Self {
            sx,
            printf_max_args: options.printf_max_args,
        }
    }

    pub fn syntax(&self) -> &Syntax {
        self.sx
    }

    pub(crate) fn error(&mut self, kind: ErrorKind, span: Span) {
        self.sx.reporter.error(kind, span.start);
    }

    pub(crate) fn warning(&mut self, kind: WarningKind, span: Span) {
        self.sx.reporter.warning(kind, span.start);
    }

    pub(crate) fn type_name(&self, ty: TypeRef) -> String {
        self.sx.type_name(ty)
    }

    /// Reads the expression value of an existing node
    pub fn expression_of(&self, node: NodeId) -> Expr {
        let tree = &self.sx.tree;
        Expr::new(
            node,
            tree.expression_type(node),
            tree.expression_category(node),
            tree.span(node),
        )
    }

    /// Appends an expression node: `[type, category, payload..]` then children.
    fn expression_node(
        &mut self,
        kind: NodeKind,
        ty: TypeRef,
        category: Category,
        payload: &[Item],
        children: &[NodeId],
        span: Span,
    ) -> Expr {
        let tree = &mut self.sx.tree;
        let node = tree.create_node(kind, span);
        tree.append_arg(node, ty.to_item());
        tree.append_arg(node, category.to_item());
        for &value in payload {
            tree.append_arg(node, value);
        }
        for &child in children {
            tree.attach_child(node, child);
        }
        tree.finish(node);
        Expr::new(node, ty, category, span)
    }

    /// Appends a statement node with its arguments and children.
    fn statement_node(
        &mut self,
        kind: NodeKind,
        args: &[Item],
        children: &[NodeId],
        span: Span,
    ) -> NodeId {
        let tree = &mut self.sx.tree;
        let node = tree.create_node(kind, span);
        for &value in args {
            tree.append_arg(node, value);
        }
        for &child in children {
            tree.attach_child(node, child);
        }
        tree.finish(node)
    }
}
