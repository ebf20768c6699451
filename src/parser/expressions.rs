//! Expression parsing implementation
//!
//! This module handles parsing of RuC expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, floats, characters, strings, `NULL`
//! - Identifiers and enum constants
//! - Binary operators: arithmetic, comparison, logical, bitwise, assignment, comma
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`, `abs`, `upb`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary: `? :`
//! - Braced initializer lists
//!
//! # Precedence
//!
//! Binary operators follow C precedence. Assignment and `?:` group to the
//! right, everything else to the left.
//!
//! Every operand goes through the [`Builder`](crate::builder::Builder) as
//! soon as it is parsed, so types are known bottom-up and constant operands
//! fold on the way.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::errors::ErrorKind;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{Parser, StopSet};
use crate::stack::ensure_sufficient_stack;

/// Binding strength of binary operators, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Unknown,
    Comma,
    Assignment,
    Conditional,
    LogicalOr,
    LogicalAnd,
    Or,
    Xor,
    And,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::Unknown => Precedence::Comma,
            Precedence::Comma => Precedence::Assignment,
            Precedence::Assignment => Precedence::Conditional,
            Precedence::Conditional => Precedence::LogicalOr,
            Precedence::LogicalOr => Precedence::LogicalAnd,
            Precedence::LogicalAnd => Precedence::Or,
            Precedence::Or => Precedence::Xor,
            Precedence::Xor => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Shift,
            Precedence::Shift => Precedence::Additive,
            Precedence::Additive | Precedence::Multiplicative => Precedence::Multiplicative,
        }
    }

    fn is_right_associative(self) -> bool {
        matches!(self, Precedence::Assignment | Precedence::Conditional)
    }
}

/// Operator between two operands; `?` carries its middle operand
enum Operator {
    Binary(BinaryOp),
    Conditional(Expr),
}

/// Binary operator spelled by `kind`, with its precedence
fn binary_operator(kind: &TokenKind) -> Option<(BinaryOp, Precedence)> {
    let pair = match kind {
        TokenKind::Comma => (BinaryOp::Comma, Precedence::Comma),
        TokenKind::Eq => (BinaryOp::Assign, Precedence::Assignment),
        TokenKind::StarEq => (BinaryOp::MulAssign, Precedence::Assignment),
        TokenKind::SlashEq => (BinaryOp::DivAssign, Precedence::Assignment),
        TokenKind::PercentEq => (BinaryOp::RemAssign, Precedence::Assignment),
        TokenKind::PlusEq => (BinaryOp::AddAssign, Precedence::Assignment),
        TokenKind::MinusEq => (BinaryOp::SubAssign, Precedence::Assignment),
        TokenKind::LtLtEq => (BinaryOp::ShlAssign, Precedence::Assignment),
        TokenKind::GtGtEq => (BinaryOp::ShrAssign, Precedence::Assignment),
        TokenKind::AmpEq => (BinaryOp::AndAssign, Precedence::Assignment),
        TokenKind::CaretEq => (BinaryOp::XorAssign, Precedence::Assignment),
        TokenKind::PipeEq => (BinaryOp::OrAssign, Precedence::Assignment),
        TokenKind::OrOr => (BinaryOp::LogOr, Precedence::LogicalOr),
        TokenKind::AndAnd => (BinaryOp::LogAnd, Precedence::LogicalAnd),
        TokenKind::Pipe => (BinaryOp::BitOr, Precedence::Or),
        TokenKind::Caret => (BinaryOp::BitXor, Precedence::Xor),
        TokenKind::Amp => (BinaryOp::BitAnd, Precedence::And),
        TokenKind::EqEq => (BinaryOp::Eq, Precedence::Equality),
        TokenKind::NotEq => (BinaryOp::Ne, Precedence::Equality),
        TokenKind::Lt => (BinaryOp::Lt, Precedence::Relational),
        TokenKind::Gt => (BinaryOp::Gt, Precedence::Relational),
        TokenKind::Le => (BinaryOp::Le, Precedence::Relational),
        TokenKind::Ge => (BinaryOp::Ge, Precedence::Relational),
        TokenKind::LtLt => (BinaryOp::Shl, Precedence::Shift),
        TokenKind::GtGt => (BinaryOp::Shr, Precedence::Shift),
        TokenKind::Plus => (BinaryOp::Add, Precedence::Additive),
        TokenKind::Minus => (BinaryOp::Sub, Precedence::Additive),
        TokenKind::Star => (BinaryOp::Mul, Precedence::Multiplicative),
        TokenKind::Slash => (BinaryOp::Div, Precedence::Multiplicative),
        TokenKind::Percent => (BinaryOp::Rem, Precedence::Multiplicative),
        _ => return None,
    };
    Some(pair)
}

fn prefix_operator(kind: &TokenKind) -> Option<UnaryOp> {
    let op = match kind {
        TokenKind::PlusPlus => UnaryOp::PreInc,
        TokenKind::MinusMinus => UnaryOp::PreDec,
        TokenKind::Amp => UnaryOp::Address,
        TokenKind::Star => UnaryOp::Indirection,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Minus => UnaryOp::Minus,
        TokenKind::Tilde => UnaryOp::BitNot,
        TokenKind::Bang => UnaryOp::LogNot,
        _ => return None,
    };
    Some(op)
}

impl Parser {
    /// Parse expression (top-level entry point, includes the comma operator)
    pub(crate) fn parse_expression(&mut self) -> Expr {
        let lhs = self.parse_unary_expression();
        self.parse_rhs_of_binary_expression(lhs, Precedence::Comma)
    }

    pub(crate) fn parse_assignment_expression(&mut self) -> Expr {
        let lhs = self.parse_unary_expression();
        self.parse_rhs_of_binary_expression(lhs, Precedence::Assignment)
    }

    pub(crate) fn parse_conditional_expression(&mut self) -> Expr {
        let lhs = self.parse_unary_expression();
        self.parse_rhs_of_binary_expression(lhs, Precedence::Conditional)
    }

    /// Conditional expression that must fold to a literal
    pub(crate) fn parse_constant_expression(&mut self) -> Expr {
        let expr = self.parse_conditional_expression();
        self.builder().build_constant_expression(expr)
    }

    fn current_precedence(&self) -> Precedence {
        match self.peek_kind() {
            TokenKind::Question => Precedence::Conditional,
            kind => binary_operator(kind).map_or(Precedence::Unknown, |(_, prec)| prec),
        }
    }

    /// Precedence climbing over binary operators and `?:`, starting from an
    /// already parsed left operand.
    fn parse_rhs_of_binary_expression(&mut self, mut lhs: Expr, min: Precedence) -> Expr {
        loop {
            let prec = self.current_precedence();
            if prec == Precedence::Unknown || prec < min {
                return lhs;
            }

            let operator = match binary_operator(self.peek_kind()) {
                Some((op, _)) => {
                    self.advance();
                    Operator::Binary(op)
                }
                None => {
                    self.advance();
                    let middle = self.parse_expression();
                    if !self.expect_token(&TokenKind::Colon, "':'") {
                        self.skip_until(
                            StopSet::COLON | StopSet::SEMICOLON | StopSet::RPAREN | StopSet::RBRACE,
                        );
                        self.match_token(&TokenKind::Colon);
                    }
                    Operator::Conditional(middle)
                }
            };

            let mut rhs = self.parse_unary_expression();
            loop {
                let next = self.current_precedence();
                if next == Precedence::Unknown {
                    break;
                }
                if next > prec {
                    rhs = self.parse_rhs_of_binary_expression(rhs, prec.next());
                } else if next == prec && prec.is_right_associative() {
                    rhs = self.parse_rhs_of_binary_expression(rhs, prec);
                } else {
                    break;
                }
            }

            let span = lhs.span.to(self.previous_span());
            lhs = match operator {
                Operator::Binary(op) => self.builder().build_binary(lhs, rhs, op, span),
                Operator::Conditional(middle) => {
                    self.builder().build_ternary(lhs, middle, rhs, span)
                }
            };
        }
    }

    pub(crate) fn parse_unary_expression(&mut self) -> Expr {
        ensure_sufficient_stack(|| self.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Expr {
        let start = self.current_span();

        if let Some(op) = prefix_operator(self.peek_kind()) {
            self.advance();
            let operand = self.parse_unary_expression();
            let span = start.to(self.previous_span());
            return self.builder().build_unary(operand, op, span);
        }

        let op = match self.peek_kind() {
            TokenKind::Abs => Some(UnaryOp::Abs),
            TokenKind::Upb => Some(UnaryOp::Upb),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            self.expect_token(&TokenKind::LParen, "'('");
            let operand = self.parse_assignment_expression();
            if !self.expect_rparen() {
                self.skip_until(StopSet::RPAREN | StopSet::SEMICOLON);
                self.match_token(&TokenKind::RParen);
            }
            let span = start.to(self.previous_span());
            let expr = self.builder().build_unary(operand, op, span);
            return self.parse_postfix_suffix(expr);
        }

        let primary = self.parse_primary_expression();
        self.parse_postfix_suffix(primary)
    }

    /// Subscripts, calls, member access and postfix `++`/`--` applied to `expr`
    fn parse_postfix_suffix(&mut self, mut expr: Expr) -> Expr {
        loop {
            let start = expr.span;
            expr = match *self.peek_kind() {
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression();
                    if !self.expect_token(&TokenKind::RBracket, "']'") {
                        self.skip_until(StopSet::RBRACKET | StopSet::SEMICOLON);
                        self.match_token(&TokenKind::RBracket);
                    }
                    let span = start.to(self.previous_span());
                    self.builder().build_subscript(expr, index, span)
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_argument_list();
                    let span = start.to(self.previous_span());
                    self.builder().build_call(expr, args, span)
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    let is_arrow = self.advance().kind == TokenKind::Arrow;
                    let Some((name, _)) = self.expect_identifier() else {
                        return Expr::broken_at(start.to(self.previous_span()));
                    };
                    let span = start.to(self.previous_span());
                    self.builder().build_member(expr, name, is_arrow, span)
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.advance().kind == TokenKind::PlusPlus {
                        UnaryOp::PostInc
                    } else {
                        UnaryOp::PostDec
                    };
                    let span = start.to(self.previous_span());
                    self.builder().build_unary(expr, op, span)
                }
                _ => return expr,
            };
        }
    }

    /// Arguments after the opening parenthesis, through the closing one
    fn parse_argument_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.match_token(&TokenKind::RParen) {
            return args;
        }
        loop {
            args.push(self.parse_assignment_expression());
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        if !self.expect_rparen() {
            self.skip_until(StopSet::RPAREN | StopSet::SEMICOLON);
            self.match_token(&TokenKind::RParen);
        }
        args
    }

    fn parse_primary_expression(&mut self) -> Expr {
        let span = self.current_span();
        match *self.peek_kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                self.builder().build_identifier(name, span)
            }
            TokenKind::IntLiteral(value) => {
                self.advance();
                self.builder().build_integer_literal(value, span)
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                self.builder().build_floating_literal(value, span)
            }
            TokenKind::CharLiteral(value) => {
                self.advance();
                self.builder().build_character_literal(value, span)
            }
            TokenKind::StringLiteral(_) => {
                // Adjacent literals form one string
                let mut value = String::new();
                while let TokenKind::StringLiteral(part) = self.peek_kind() {
                    value.push_str(part);
                    self.advance();
                }
                let span = span.to(self.previous_span());
                self.builder().build_string_literal(value, span)
            }
            TokenKind::Null => {
                self.advance();
                self.builder().build_null_literal(span)
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression();
                if !self.expect_rparen() {
                    self.skip_until(StopSet::RPAREN | StopSet::SEMICOLON);
                    self.match_token(&TokenKind::RParen);
                }
                expr
            }
            _ => {
                let found = self.describe_current();
                self.report(ErrorKind::ExpectedExpression { found }, span.start);
                Expr::broken_at(span)
            }
        }
    }

    /// Parse an initializer: a braced list or an assignment expression.
    /// Braced lists are typed later against the declared type.
    pub(crate) fn parse_initializer(&mut self) -> Expr {
        if !self.check(&TokenKind::LBrace) {
            return self.parse_assignment_expression();
        }

        ensure_sufficient_stack(|| {
            let start = self.advance().span;
            let mut items = Vec::new();
            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                items.push(self.parse_initializer());
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            if !self.expect_token(&TokenKind::RBrace, "'}'") {
                self.skip_until(StopSet::RBRACE | StopSet::SEMICOLON);
                self.match_token(&TokenKind::RBrace);
            }
            let span = start.to(self.previous_span());
            self.builder().build_initializer(items, span)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{NodeId, NodeKind};
    use crate::config::FrontendOptions;
    use crate::errors::ErrorKind;
    use crate::parser::parse::{Module, Parser};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Module {
        Parser::with_options(source, FrontendOptions::fragment())
            .unwrap()
            .parse_translation_unit()
    }

    /// Expressions of every expression statement, in source order
    fn statement_expressions(module: &Module) -> Vec<NodeId> {
        module
            .nodes_of(NodeKind::ExpressionStatement)
            .into_iter()
            .map(|stmt| module.syntax.tree.nth_child(stmt, 0))
            .collect()
    }

    fn dump_first_expression(source: &str) -> String {
        let module = parse(source);
        assert!(!module.had_errors(), "{:?}", module.errors());
        module.syntax.dump(statement_expressions(&module)[0])
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        let dump = dump_first_expression("void f(int a, int b, int c) { a + b * c; }");
        assert_eq!(
            dump,
            "Binary + : int rvalue\n\
             \x20 Identifier a : int lvalue\n\
             \x20 Binary * : int rvalue\n\
             \x20   Identifier b : int lvalue\n\
             \x20   Identifier c : int lvalue\n"
        );
    }

    #[test]
    fn test_subtraction_groups_left() {
        let dump = dump_first_expression("void f(int a, int b, int c) { a - b - c; }");
        assert_eq!(
            dump,
            "Binary - : int rvalue\n\
             \x20 Binary - : int rvalue\n\
             \x20   Identifier a : int lvalue\n\
             \x20   Identifier b : int lvalue\n\
             \x20 Identifier c : int lvalue\n"
        );
    }

    #[test]
    fn test_assignment_groups_right() {
        let dump = dump_first_expression("void f(int a, int b) { a = b = 1; }");
        assert_eq!(
            dump,
            "Binary = : int rvalue\n\
             \x20 Identifier a : int lvalue\n\
             \x20 Binary = : int rvalue\n\
             \x20   Identifier b : int lvalue\n\
             \x20   IntegerLiteral 1 : int rvalue\n"
        );
    }

    #[test]
    fn test_nested_conditional() {
        let module = parse("int f(int a, int b) { return a ? 1 : b ? 2 : 3; }");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let ternaries = module.nodes_of(NodeKind::Ternary);
        assert_eq!(ternaries.len(), 2);
        let tree = &module.syntax.tree;
        let outer = ternaries[0];
        assert_eq!(tree.kind(tree.nth_child(outer, 2)), NodeKind::Ternary);
    }

    #[test]
    fn test_comma_is_weakest() {
        let module = parse("void f(int a, int b) { a = 1, b = 2; }");
        assert!(!module.had_errors(), "{:?}", module.errors());
        let expr = statement_expressions(&module)[0];
        assert!(module.syntax.dump(expr).starts_with("Binary , : int rvalue\n"));
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let dump = dump_first_expression("void f() { (1 + 2) * 3; }");
        assert_eq!(dump, "IntegerLiteral 9 : int rvalue\n");
    }

    #[test]
    fn test_negative_literal_folds() {
        let dump = dump_first_expression("void f() { -2.5; }");
        assert_eq!(dump, "FloatingLiteral -2.5 : float rvalue\n");
    }

    #[test]
    fn test_postfix_chain() {
        let module = parse(
            "struct node { int value; int items[4]; };
             void f(node n, node *p) { n.items[2]++; p->value--; }",
        );
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.nodes_of(NodeKind::Member).len(), 2);
        assert_eq!(module.nodes_of(NodeKind::Subscript).len(), 1);
        assert_eq!(module.nodes_of(NodeKind::Unary).len(), 2);
    }

    #[test]
    fn test_call_arguments() {
        let module = parse("int add(int a, int b) { return a + b; } int g() { return add(1, 2 + 3); }");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let call = module.nodes_of(NodeKind::Call)[0];
        assert_eq!(module.syntax.tree.child_count(call), 3);
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        let module = parse("void f() { printf(\"a\" \"b\\n\"); }");
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.syntax.strings, vec!["ab\n".to_string()]);
    }

    #[test]
    fn test_abs_and_upb() {
        let module = parse("void f(float x, int a[]) { abs(x) + upb(a); }");
        assert!(!module.had_errors(), "{:?}", module.errors());
        let expr = statement_expressions(&module)[0];
        assert!(module.syntax.dump(expr).starts_with("Binary + : float rvalue\n"));
    }

    #[test]
    fn test_missing_operand() {
        let module = parse("void f(int a) { a * ; }");
        assert!(matches!(
            &module.errors().iter().map(|e| e.kind.clone()).collect::<Vec<_>>()[..],
            [ErrorKind::ExpectedExpression { found }] if found == "';'"
        ));
    }

    #[test]
    fn test_missing_colon() {
        let module = parse("void f(int a) { a ? 1 ; }");
        assert!(matches!(
            module.errors()[0].kind,
            ErrorKind::ExpectedToken { expected: "':'", .. }
        ));
    }

    #[test]
    fn test_nested_initializer() {
        let module = parse("int m[2][2] = {{1, 2}, {3, 4},};");
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.nodes_of(NodeKind::Initializer).len(), 3);
    }
}
