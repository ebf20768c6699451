//! Statement and declaration builders
//!
//! A statement with a broken required part is itself broken and gets
//! dropped by the enclosing compound statement or translation unit.

use super::Builder;
use crate::ast::{Expr, NodeId, NodeKind, Span};
use crate::errors::ErrorKind;
use crate::tables::{IdentId, Item, TypeRef};

impl Builder<'_> {
    pub fn build_translation_unit(&mut self, items: Vec<NodeId>, span: Span) -> NodeId {
        let items: Vec<_> = items.into_iter().filter(|node| node.is_valid()).collect();
        self.statement_node(NodeKind::TranslationUnit, &[], &items, span)
    }

    pub fn build_compound_statement(&mut self, items: Vec<NodeId>, span: Span) -> NodeId {
        let items: Vec<_> = items.into_iter().filter(|node| node.is_valid()).collect();
        self.statement_node(NodeKind::Compound, &[], &items, span)
    }

    pub fn build_expression_statement(&mut self, expr: Expr) -> NodeId {
        if expr.is_broken() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::ExpressionStatement, &[], &[expr.node], expr.span)
    }

    pub fn build_null_statement(&mut self, span: Span) -> NodeId {
        self.statement_node(NodeKind::Null, &[], &[], span)
    }

    pub fn build_if_statement(
        &mut self,
        condition: Expr,
        then: NodeId,
        otherwise: Option<NodeId>,
        span: Span,
    ) -> NodeId {
        if !self.check_condition(condition) || !then.is_valid() {
            return NodeId::BROKEN;
        }
        match otherwise {
            Some(otherwise) if !otherwise.is_valid() => NodeId::BROKEN,
            Some(otherwise) => self.statement_node(
                NodeKind::If,
                &[1],
                &[condition.node, then, otherwise],
                span,
            ),
            None => self.statement_node(NodeKind::If, &[0], &[condition.node, then], span),
        }
    }

    pub fn build_while_statement(&mut self, condition: Expr, body: NodeId, span: Span) -> NodeId {
        if !self.check_condition(condition) || !body.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::While, &[], &[condition.node, body], span)
    }

    pub fn build_do_statement(&mut self, body: NodeId, condition: Expr, span: Span) -> NodeId {
        if !self.check_condition(condition) || !body.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::Do, &[], &[body, condition.node], span)
    }

    /// `for (init; condition; increment) body` where every clause is optional
    pub fn build_for_statement(
        &mut self,
        init: Option<NodeId>,
        condition: Option<Expr>,
        increment: Option<Expr>,
        body: NodeId,
        span: Span,
    ) -> NodeId {
        if let Some(condition) = condition {
            if !self.check_condition(condition) {
                return NodeId::BROKEN;
            }
        }
        let parts = [
            init,
            condition.map(|c| c.node),
            increment.map(|i| i.node),
        ];
        if parts.iter().flatten().any(|node| !node.is_valid()) || !body.is_valid() {
            return NodeId::BROKEN;
        }

        let args = parts.map(|part| Item::from(part.is_some()));
        let mut children: Vec<_> = parts.into_iter().flatten().collect();
        children.push(body);
        self.statement_node(NodeKind::For, &args, &children, span)
    }

    pub fn build_switch_statement(&mut self, condition: Expr, body: NodeId, span: Span) -> NodeId {
        if condition.is_broken() {
            return NodeId::BROKEN;
        }
        if !self.sx.types.is_integer(condition.ty) {
            let found = self.type_name(condition.ty);
            self.error(ErrorKind::SwitchExpressionNotInteger { found }, condition.span);
            return NodeId::BROKEN;
        }
        if !body.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::Switch, &[], &[condition.node, body], span)
    }

    /// `case value: statement`; the value must fold to an integer constant.
    pub fn build_case_statement(&mut self, value: Expr, statement: NodeId, span: Span) -> NodeId {
        let value = self.build_constant_expression(value);
        if value.is_broken() {
            return NodeId::BROKEN;
        }
        if !self.sx.types.is_integer(value.ty) {
            self.error(ErrorKind::CaseExpressionNotInteger, value.span);
            return NodeId::BROKEN;
        }
        if !statement.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::Case, &[], &[value.node, statement], span)
    }

    pub fn build_default_statement(&mut self, statement: NodeId, span: Span) -> NodeId {
        if !statement.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::Default, &[], &[statement], span)
    }

    pub fn build_labeled_statement(&mut self, label: IdentId, statement: NodeId, span: Span) -> NodeId {
        if !statement.is_valid() {
            return NodeId::BROKEN;
        }
        self.statement_node(NodeKind::Labeled, &[label.to_item()], &[statement], span)
    }

    pub fn build_goto_statement(&mut self, label: IdentId, span: Span) -> NodeId {
        self.statement_node(NodeKind::Goto, &[label.to_item()], &[], span)
    }

    pub fn build_continue_statement(&mut self, span: Span) -> NodeId {
        self.statement_node(NodeKind::Continue, &[], &[], span)
    }

    pub fn build_break_statement(&mut self, span: Span) -> NodeId {
        self.statement_node(NodeKind::Break, &[], &[], span)
    }

    /// `return value?;` inside a function returning `return_type`
    pub fn build_return_statement(
        &mut self,
        value: Option<Expr>,
        return_type: TypeRef,
        span: Span,
    ) -> NodeId {
        let is_void = self.sx.types.is_void(return_type);
        match value {
            None if is_void => self.statement_node(NodeKind::Return, &[0], &[], span),
            None => {
                self.error(ErrorKind::NonVoidFunctionVoidReturn, span);
                NodeId::BROKEN
            }
            Some(value) if value.is_broken() => NodeId::BROKEN,
            Some(_) if is_void => {
                self.error(ErrorKind::VoidFunctionValuedReturn, span);
                NodeId::BROKEN
            }
            Some(value) => {
                let value = self.check_assignment_operands(return_type, value);
                if value.is_broken() {
                    return NodeId::BROKEN;
                }
                self.statement_node(NodeKind::Return, &[1], &[value.node], span)
            }
        }
    }

    // ===== Declarations =====

    /// Declaration of `ident`, whose type is already complete.
    ///
    /// `bounds` are the written array bounds, outermost first; `outer_empty`
    /// tells that the outermost bound was left out and must come from the
    /// initializer.
    pub fn build_variable_declaration(
        &mut self,
        ident: IdentId,
        bounds: Vec<Expr>,
        outer_empty: bool,
        init: Option<Expr>,
        span: Span,
    ) -> NodeId {
        let mut failed = !self.check_array_bounds(&bounds);
        if outer_empty && init.is_none() {
            self.error(ErrorKind::EmptyBoundWithoutInit, span);
            failed = true;
        }

        let ty = self.sx.idents.get(ident).ty;
        let init = match init {
            Some(init) => {
                let checked = self.check_assignment_operands(ty, init);
                if checked.is_valid() && !outer_empty {
                    failed |= !self.check_initializer_length(checked, bounds.first());
                }
                failed |= checked.is_broken();
                Some(checked)
            }
            None => None,
        };
        if failed {
            return NodeId::BROKEN;
        }

        let args = [
            ident.to_item(),
            bounds.len() as Item,
            Item::from(init.is_some()),
        ];
        let mut children: Vec<_> = bounds.iter().map(|bound| bound.node).collect();
        children.extend(init.map(|init| init.node));
        self.statement_node(NodeKind::VariableDeclaration, &args, &children, span)
    }

    /// Checks that every written bound is an integer. Returns `false` when any
    /// bound is broken or was reported.
    pub fn check_array_bounds(&mut self, bounds: &[Expr]) -> bool {
        let mut valid = true;
        for bound in bounds {
            if bound.is_broken() {
                valid = false;
            } else if !self.sx.types.is_integer(bound.ty) {
                let found = self.type_name(bound.ty);
                self.error(ErrorKind::ArraySizeMustBeInteger { found }, bound.span);
                valid = false;
            }
        }
        valid
    }

    /// Compares a braced array initializer against a constant outer bound.
    fn check_initializer_length(&mut self, init: Expr, bound: Option<&Expr>) -> bool {
        let tree = &self.sx.tree;
        let Some(bound) = bound else {
            return true;
        };
        if tree.kind(init.node) != NodeKind::Initializer
            || tree.kind(bound.node) != NodeKind::IntegerLiteral
            || !self.sx.types.is_array(init.ty)
        {
            return true;
        }

        let expected = tree.literal_integer(bound.node);
        let found = tree.child_count(init.node);
        if expected == found as Item {
            return true;
        }
        let kind = ErrorKind::WrongInitializerCount {
            expected: expected.max(0) as usize,
            found,
        };
        self.error(kind, init.span);
        false
    }

    /// Struct or enum definition, or `typedef`
    pub fn build_type_declaration(&mut self, ty: TypeRef, span: Span) -> NodeId {
        self.statement_node(NodeKind::TypeDeclaration, &[ty.to_item()], &[], span)
    }

    /// Function body for `ident`, recorded in the function table.
    pub fn build_function_definition(
        &mut self,
        ident: IdentId,
        frame_size: usize,
        body: NodeId,
        span: Span,
    ) -> NodeId {
        if !body.is_valid() {
            return NodeId::BROKEN;
        }
        let node = self.statement_node(
            NodeKind::FunctionDefinition,
            &[ident.to_item(), frame_size as Item],
            &[body],
            span,
        );

        let number = self.sx.idents.get(ident).displacement;
        if let Some(entry) = usize::try_from(number)
            .ok()
            .and_then(|number| self.sx.functions.get_mut(number))
        {
            entry.ident = ident;
            entry.definition = Some(node);
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{span, syntax, variable};
    use super::*;
    use crate::ast::SourceLocation;
    use crate::config::FrontendOptions;
    use crate::tables::IdentKind;

    #[test]
    fn test_if_with_and_without_else() {
        let mut sx = syntax();
        let c = variable(&mut sx, "c", TypeRef::INTEGER);
        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let then = b.build_null_statement(span());
        let otherwise = b.build_null_statement(span());

        let full = b.build_if_statement(c, then, Some(otherwise), span());
        assert_eq!(b.sx.tree.child_count(full), 3);
        assert_eq!(b.sx.tree.arg(full, 0), 1);

        let bare = b.build_if_statement(c, then, None, span());
        assert_eq!(b.sx.tree.child_count(bare), 2);
    }

    #[test]
    fn test_for_flags_follow_clauses() {
        let mut sx = syntax();
        let i = variable(&mut sx, "i", TypeRef::INTEGER);
        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let body = b.build_null_statement(span());
        let incr = b.build_unary(i, crate::ast::UnaryOp::PostInc, span());

        let node = b.build_for_statement(None, Some(i), Some(incr), body, span());
        assert_eq!(b.sx.tree.args(node), &[0, 1, 1]);
        assert_eq!(b.sx.tree.child_count(node), 3);
    }

    #[test]
    fn test_return_checks() {
        let mut sx = syntax();
        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let one = b.build_integer_literal(1, span());
        assert!(!b.build_return_statement(Some(one), TypeRef::VOID, span()).is_valid());
        assert!(!b.build_return_statement(None, TypeRef::INTEGER, span()).is_valid());

        let widened = b.build_integer_literal(1, span());
        let node = b.build_return_statement(Some(widened), TypeRef::FLOATING, span());
        let value = b.sx.tree.nth_child(node, 0);
        assert_eq!(b.sx.tree.kind(value), NodeKind::FloatingLiteral);

        let kinds: Vec<_> = sx.reporter.errors().iter().map(|e| e.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::VoidFunctionValuedReturn,
                ErrorKind::NonVoidFunctionVoidReturn
            ]
        );
    }

    #[test]
    fn test_switch_requires_integer() {
        let mut sx = syntax();
        let x = variable(&mut sx, "x", TypeRef::FLOATING);
        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let body = b.build_compound_statement(Vec::new(), span());
        assert!(!b.build_switch_statement(x, body, span()).is_valid());
        assert!(matches!(
            sx.reporter.errors()[0].kind,
            ErrorKind::SwitchExpressionNotInteger { .. }
        ));
    }

    #[test]
    fn test_compound_drops_broken_items() {
        let mut sx = syntax();
        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let null = b.build_null_statement(span());
        let node = b.build_compound_statement(vec![null, NodeId::BROKEN, null], span());
        assert_eq!(b.sx.tree.child_count(node), 2);
    }

    #[test]
    fn test_array_declaration_with_initializer() {
        let mut sx = syntax();
        let name = sx.reprs.intern("a");
        let array = sx.types.array_of(TypeRef::INTEGER);
        let id = sx
            .declare(name, IdentKind::Variable, array, SourceLocation::new(1, 1))
            .unwrap();

        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        let bound = b.build_integer_literal(3, span());
        let items = (1..=3).map(|v| b.build_integer_literal(v, span())).collect();
        let init = b.build_initializer(items, span());
        let node = b.build_variable_declaration(id, vec![bound], false, Some(init), span());

        assert_eq!(b.sx.tree.args(node), &[id.to_item(), 1, 1]);
        assert_eq!(b.sx.tree.child_count(node), 2);

        let bound = b.build_integer_literal(2, span());
        let items = (1..=3).map(|v| b.build_integer_literal(v, span())).collect();
        let init = b.build_initializer(items, span());
        assert!(!b.build_variable_declaration(id, vec![bound], false, Some(init), span()).is_valid());
        assert!(matches!(
            sx.reporter.errors()[0].kind,
            ErrorKind::WrongInitializerCount { expected: 2, found: 3 }
        ));
    }

    #[test]
    fn test_empty_bound_needs_initializer() {
        let mut sx = syntax();
        let name = sx.reprs.intern("a");
        let array = sx.types.array_of(TypeRef::INTEGER);
        let id = sx
            .declare(name, IdentKind::Variable, array, SourceLocation::new(1, 1))
            .unwrap();

        let mut b = Builder::new(&mut sx, &FrontendOptions::fragment());
        assert!(!b.build_variable_declaration(id, Vec::new(), true, None, span()).is_valid());
        assert!(matches!(
            sx.reporter.errors()[0].kind,
            ErrorKind::EmptyBoundWithoutInit
        ));
    }
}
