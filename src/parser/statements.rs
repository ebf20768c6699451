//! Statement parsing implementation
//!
//! This module handles parsing of all RuC statement types:
//!
//! - Compound statements with their own scope: `{ ... }`
//! - Control flow: `if`, `while`, `do-while`, `for`, `switch`
//! - Jump statements: `return`, `break`, `continue`, `goto`
//! - Labeled statements: `label:`, `case value:`, `default:`
//! - Expression and null statements
//!
//! # Grammar
//!
//! ```text
//! statement  ::= compound | if_stmt | while_stmt | do_stmt | for_stmt
//!              | switch_stmt | case_stmt | default_stmt | labeled_stmt
//!              | goto_stmt | return_stmt | "break" ";" | "continue" ";"
//!              | expression? ";"
//! compound   ::= "{" (declaration | statement)* "}"
//! for_stmt   ::= "for" "(" (declaration | expression? ";") expression? ";" expression? ")" statement
//! ```
//!
//! Every statement parser returns a [`NodeId`], which is [`NodeId::BROKEN`]
//! when the statement could not be built. Errors inside a statement are
//! reported once; the parser then skips to the next `;` or `}`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::ast::{Expr, NodeId, Span};
use crate::errors::ErrorKind;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{Parser, StopSet};
use crate::stack::ensure_sufficient_stack;
use crate::tables::{IdentId, ReprId};
use tracing::trace;

impl Parser {
    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> NodeId {
        ensure_sufficient_stack(|| self.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> NodeId {
        match *self.peek_kind() {
            TokenKind::Semicolon => {
                let span = self.advance().span;
                self.builder().build_null_statement(span)
            }
            TokenKind::LBrace => self.parse_compound_statement(true),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Case => self.parse_case_statement(),
            TokenKind::Default => self.parse_default_statement(),
            TokenKind::Goto => self.parse_goto_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Identifier(name) if self.check_ahead(1, &TokenKind::Colon) => {
                self.parse_labeled_statement(name)
            }
            TokenKind::Else
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Colon
            | TokenKind::Comma
            | TokenKind::Question
            | TokenKind::Eof => {
                let found = self.describe_current();
                let location = self.current_location();
                self.report(ErrorKind::ExpectedStatement { found }, location);
                if !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
                    self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
                    self.match_token(&TokenKind::Semicolon);
                }
                NodeId::BROKEN
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse one item of a block: a declaration or a statement
    pub(crate) fn parse_block_item(&mut self, items: &mut Vec<NodeId>) {
        if self.is_declaration_specifier() {
            self.parse_declaration(items, false);
        } else {
            items.push(self.parse_statement());
        }
    }

    /// Parse `{ ... }`. A function body shares the scope of its parameters,
    /// so it passes `new_scope = false`.
    pub(crate) fn parse_compound_statement(&mut self, new_scope: bool) -> NodeId {
        let start = self.current_span();
        if !self.expect_token(&TokenKind::LBrace, "'{'") {
            self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::Semicolon);
            return NodeId::BROKEN;
        }
        if new_scope {
            self.sx.idents.enter_scope();
        }

        let mut items = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.sx.reporter.limit_reached() {
                break;
            }
            let before = self.position;
            self.parse_block_item(&mut items);
            if self.position == before {
                self.advance();
            }
        }
        self.expect_token(&TokenKind::RBrace, "'}'");

        if new_scope {
            self.sx.idents.exit_scope();
        }
        let span = start.to(self.previous_span());
        self.builder().build_compound_statement(items, span)
    }

    fn parse_expression_statement(&mut self) -> NodeId {
        let expr = self.parse_expression();
        if !self.expect_semicolon() {
            self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::Semicolon);
            return NodeId::BROKEN;
        }
        self.builder().build_expression_statement(expr)
    }

    /// `( expression )` of a condition
    fn parse_parenthesized_expression(&mut self) -> Expr {
        self.expect_token(&TokenKind::LParen, "'('");
        let expr = self.parse_expression();
        self.expect_rparen();
        expr
    }

    /// Parses a loop body with `break` and `continue` enabled
    fn parse_loop_body(&mut self) -> NodeId {
        let saved = self.ctx.in_loop;
        self.ctx.in_loop = true;
        let body = self.parse_statement();
        self.ctx.in_loop = saved;
        body
    }

    fn parse_if_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let condition = self.parse_parenthesized_expression();
        let then = self.parse_statement();
        let otherwise = self
            .match_token(&TokenKind::Else)
            .then(|| self.parse_statement());

        let span = start.to(self.previous_span());
        self.builder()
            .build_if_statement(condition, then, otherwise, span)
    }

    fn parse_while_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let condition = self.parse_parenthesized_expression();
        let body = self.parse_loop_body();

        let span = start.to(self.previous_span());
        self.builder().build_while_statement(condition, body, span)
    }

    fn parse_do_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let body = self.parse_loop_body();
        self.expect_token(&TokenKind::While, "'while'");
        let condition = self.parse_parenthesized_expression();
        self.expect_semicolon();

        let span = start.to(self.previous_span());
        self.builder().build_do_statement(body, condition, span)
    }

    /// `for` opens a scope so that a declaration in its first clause is
    /// local to the loop.
    fn parse_for_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        self.expect_token(&TokenKind::LParen, "'('");
        self.sx.idents.enter_scope();

        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.is_declaration_specifier() {
            let decl_start = self.current_span();
            let mut decls = Vec::new();
            self.parse_declaration(&mut decls, false);
            match decls.len() {
                0 => None,
                1 => Some(decls[0]),
                _ => {
                    let span = decl_start.to(self.previous_span());
                    let failed = decls.iter().any(|node| !node.is_valid());
                    let compound = self.builder().build_compound_statement(decls, span);
                    Some(if failed { NodeId::BROKEN } else { compound })
                }
            }
        } else {
            let init = self.parse_expression_statement();
            Some(init)
        };

        let condition = (!self.check(&TokenKind::Semicolon)).then(|| self.parse_expression());
        self.expect_semicolon();
        let increment = (!self.check(&TokenKind::RParen)).then(|| self.parse_expression());
        self.expect_rparen();

        let body = self.parse_loop_body();
        self.sx.idents.exit_scope();

        let span = start.to(self.previous_span());
        self.builder()
            .build_for_statement(init, condition, increment, body, span)
    }

    fn parse_switch_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let condition = self.parse_parenthesized_expression();

        let saved = (self.ctx.in_switch, self.ctx.was_default);
        self.ctx.in_switch = true;
        self.ctx.was_default = false;
        let body = self.parse_statement();
        (self.ctx.in_switch, self.ctx.was_default) = saved;

        let span = start.to(self.previous_span());
        self.builder().build_switch_statement(condition, body, span)
    }

    fn parse_case_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let misplaced = if !self.ctx.in_switch {
            Some(ErrorKind::CaseOrDefaultNotInSwitch)
        } else if self.ctx.was_default {
            Some(ErrorKind::CaseAfterDefault)
        } else {
            None
        };
        let failed = misplaced.is_some();
        if let Some(kind) = misplaced {
            self.report(kind, start.start);
        }

        let value = self.parse_conditional_expression();
        self.expect_token(&TokenKind::Colon, "':'");
        let statement = self.parse_statement();
        if failed {
            return NodeId::BROKEN;
        }

        let span = start.to(self.previous_span());
        self.builder().build_case_statement(value, statement, span)
    }

    fn parse_default_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let misplaced = if !self.ctx.in_switch {
            Some(ErrorKind::CaseOrDefaultNotInSwitch)
        } else if self.ctx.was_default {
            Some(ErrorKind::RepeatedDefault)
        } else {
            None
        };
        let failed = misplaced.is_some();
        match misplaced {
            Some(kind) => self.report(kind, start.start),
            None => self.ctx.was_default = true,
        }

        self.expect_token(&TokenKind::Colon, "':'");
        let statement = self.parse_statement();
        if failed {
            return NodeId::BROKEN;
        }

        let span = start.to(self.previous_span());
        self.builder().build_default_statement(statement, span)
    }

    fn parse_labeled_statement(&mut self, name: ReprId) -> NodeId {
        let start = self.advance().span;
        self.advance();
        let label = self.define_label(name, start);
        let statement = self.parse_statement();

        let span = start.to(self.previous_span());
        match label {
            Some(label) => self.builder().build_labeled_statement(label, statement, span),
            None => NodeId::BROKEN,
        }
    }

    fn parse_goto_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let Some((name, name_span)) = self.expect_identifier() else {
            self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::Semicolon);
            return NodeId::BROKEN;
        };
        let label = self.reference_label(name, name_span);
        self.expect_semicolon();

        let span = start.to(self.previous_span());
        self.builder().build_goto_statement(label, span)
    }

    fn parse_return_statement(&mut self) -> NodeId {
        let start = self.advance().span;
        let value = (!self.check(&TokenKind::Semicolon)).then(|| self.parse_expression());
        if !self.expect_semicolon() {
            self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::Semicolon);
        }
        self.ctx.was_return = true;

        let span = start.to(self.previous_span());
        let return_type = self.ctx.return_type;
        self.builder()
            .build_return_statement(value, return_type, span)
    }

    fn parse_break_statement(&mut self) -> NodeId {
        let span = self.advance().span;
        self.expect_semicolon();
        if !self.ctx.in_loop && !self.ctx.in_switch {
            self.report(ErrorKind::BreakNotInLoopOrSwitch, span.start);
            return NodeId::BROKEN;
        }
        self.builder().build_break_statement(span)
    }

    fn parse_continue_statement(&mut self) -> NodeId {
        let span = self.advance().span;
        self.expect_semicolon();
        if !self.ctx.in_loop {
            self.report(ErrorKind::ContinueNotInLoop, span.start);
            return NodeId::BROKEN;
        }
        self.builder().build_continue_statement(span)
    }

    // ===== Labels =====

    /// Label used by a `goto`. A label not seen yet is recorded as pending.
    fn reference_label(&mut self, name: ReprId, span: Span) -> IdentId {
        if let Some(&label) = self.ctx.labels.get(&name) {
            return label;
        }
        let label = self.sx.idents.add_label(name, span.start);
        self.ctx.labels.insert(name, label);
        label
    }

    fn define_label(&mut self, name: ReprId, span: Span) -> Option<IdentId> {
        let label = self.reference_label(name, span);
        if self.sx.idents.get(label).defined {
            let name = self.sx.spelling(name).to_string();
            self.report(ErrorKind::RepeatedLabel { name }, span.start);
            return None;
        }
        self.sx.idents.mark_defined(label, span.start);
        Some(label)
    }

    /// Reports every label a `goto` named but the function never defined.
    pub(crate) fn resolve_pending_labels(&mut self) {
        let mut pending: Vec<IdentId> = self
            .ctx
            .labels
            .values()
            .copied()
            .filter(|&label| !self.sx.idents.get(label).defined)
            .collect();
        pending.sort_by_key(|&label| self.sx.idents.get(label).location);
        trace!(
            labels = self.ctx.labels.len(),
            unresolved = pending.len(),
            "resolving labels"
        );

        for label in pending {
            let location = self.sx.idents.get(label).location;
            let name = self.sx.ident_name(label).to_string();
            self.report(
                ErrorKind::LabelNotDeclared {
                    name,
                    line: location.line,
                },
                location,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeKind;
    use crate::config::FrontendOptions;
    use crate::errors::ErrorKind;
    use crate::parser::parse::{Module, Parser};
    use crate::tables::IdentId;

    fn parse(source: &str) -> Module {
        Parser::with_options(source, FrontendOptions::fragment())
            .unwrap()
            .parse_translation_unit()
    }

    fn error_kinds(module: &Module) -> Vec<ErrorKind> {
        module.errors().iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_loops() {
        let module = parse(
            "void f() {
                int i = 0;
                while (i < 10) { i++; if (i == 5) break; else continue; }
                do i--; while (i > 0);
                for (int j = 0; j < 3; j++) i += j;
                for (;;) break;
            }",
        );
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.nodes_of(NodeKind::While).len(), 1);
        assert_eq!(module.nodes_of(NodeKind::Do).len(), 1);
        assert_eq!(module.nodes_of(NodeKind::For).len(), 2);
        assert_eq!(module.nodes_of(NodeKind::Break).len(), 2);
        assert_eq!(module.nodes_of(NodeKind::Continue).len(), 1);
    }

    #[test]
    fn test_for_declaration_is_scoped_to_loop() {
        let module = parse("void f() { for (int i = 0; i < 3; i++) ; i = 1; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::UndeclaredVariable { name }] if name == "i"
        ));
    }

    #[test]
    fn test_block_scope_shadowing() {
        let module = parse("void f() { int x = 1; { float x = 2.5; x = x * 2; } x = 3; }");
        assert!(!module.had_errors(), "{:?}", module.errors());
    }

    #[test]
    fn test_break_and_continue_placement() {
        let module = parse("void f() { break; }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::BreakNotInLoopOrSwitch]);

        let module = parse("void f(int x) { switch (x) { case 1: continue; } }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::ContinueNotInLoop]);

        let module = parse("void f(int x) { while (x) switch (x) { default: continue; } }");
        assert!(!module.had_errors(), "{:?}", module.errors());
    }

    #[test]
    fn test_switch_labels() {
        let module = parse(
            "void f(int x) { switch (x) { case 1: x = 2; break; case 2 + 1: ; default: x = 0; } }",
        );
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.nodes_of(NodeKind::Case).len(), 2);
        assert_eq!(module.nodes_of(NodeKind::Default).len(), 1);
    }

    #[test]
    fn test_misplaced_case_and_default() {
        let module = parse("void f() { case 1: ; }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::CaseOrDefaultNotInSwitch]);

        let module = parse("void f(int x) { switch (x) { default: ; default: ; } }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::RepeatedDefault]);

        let module = parse("void f(int x) { switch (x) { default: ; case 1: ; } }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::CaseAfterDefault]);
    }

    #[test]
    fn test_case_value_must_be_constant() {
        let module = parse("void f(int x) { switch (x) { case x: ; } }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::NotConstantExpression]);
    }

    #[test]
    fn test_forward_goto() {
        let module = parse("void f() { goto done; done: ; }");
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.nodes_of(NodeKind::Goto).len(), 1);
        assert_eq!(module.nodes_of(NodeKind::Labeled).len(), 1);
    }

    #[test]
    fn test_forward_label_takes_definition_location() {
        let module = parse("void f() {\n  goto done;\n  done: ;\n}");
        assert!(!module.had_errors(), "{:?}", module.errors());
        let labeled = module.nodes_of(NodeKind::Labeled)[0];
        let label = IdentId::from_item(module.syntax.tree.arg(labeled, 0));
        let location = module.syntax.idents.get(label).location;
        assert_eq!((location.line, location.column), (3, 3));
    }

    #[test]
    fn test_undefined_label() {
        let module = parse("void f() {\n  goto nowhere;\n}");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::LabelNotDeclared { name, line: 2 }] if name == "nowhere"
        ));
    }

    #[test]
    fn test_repeated_label() {
        let module = parse("void f() { again: ; again: ; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::RepeatedLabel { name }] if name == "again"
        ));
    }

    #[test]
    fn test_labels_are_local_to_function() {
        let module = parse("void f() { l: ; } void g() { goto l; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::LabelNotDeclared { name, .. }] if name == "l"
        ));
    }

    #[test]
    fn test_recovery_after_bad_expression() {
        let module = parse("int f() { int x; x = ; return 1; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::ExpectedExpression { .. }]
        ));
    }

    #[test]
    fn test_missing_semicolon_recovers_at_next_statement() {
        let module = parse("int f() { int x; x = 1 x = 2; return x; }");
        assert_eq!(module.errors().len(), 1);
        assert!(matches!(module.errors()[0].kind, ErrorKind::ExpectedToken { .. }));
    }

    #[test]
    fn test_stray_else() {
        let module = parse("void f() { else; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::ExpectedStatement { .. }]
        ));
    }
}
