//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! the token cursor, the per-function [`ParseContext`], error recovery with
//! [`Parser::skip_until`], and the translation unit entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: type specifiers, declarators, function definitions
//! - `statements`: every statement form, labels and loop/switch context
//! - `expressions`: precedence climbing, unary/postfix/primary, initializers
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state. Nodes are built through the
//! [`Builder`], which owns the typing rules; the parser owns scopes, labels and
//! the loop/switch flags.

use crate::ast::{NodeId, NodeKind, SourceLocation, Span};
use crate::builder::Builder;
use crate::config::FrontendOptions;
use crate::errors::{Diagnostic, ErrorKind, Warning};
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use crate::syntax::Syntax;
use crate::tables::{IdentId, IdentKind, ReprId, TypeRef};
use rustc_hash::FxHashMap;
use std::ops::BitOr;
use tracing::debug;

/// Result of parsing one translation unit
#[derive(Debug)]
pub struct Module {
    pub syntax: Syntax,
    pub root: NodeId,
}

impl Module {
    pub fn had_errors(&self) -> bool {
        self.syntax.reporter.had_errors()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.syntax.reporter.errors()
    }

    pub fn warnings(&self) -> &[Warning] {
        self.syntax.reporter.warnings()
    }

    /// Indented textual form of the whole tree
    pub fn dump(&self) -> String {
        self.syntax.dump(self.root)
    }

    /// Nodes of `kind` reachable from the root, in pre-order
    pub fn nodes_of(&self, kind: NodeKind) -> Vec<NodeId> {
        let tree = &self.syntax.tree;
        tree.preorder(self.root)
            .into_iter()
            .filter(|&node| tree.kind(node) == kind)
            .collect()
    }
}

/// Tokens at which [`Parser::skip_until`] stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StopSet(u8);

impl StopSet {
    pub(crate) const RPAREN: StopSet = StopSet(1);
    pub(crate) const RBRACKET: StopSet = StopSet(1 << 1);
    pub(crate) const RBRACE: StopSet = StopSet(1 << 2);
    pub(crate) const COLON: StopSet = StopSet(1 << 3);
    pub(crate) const SEMICOLON: StopSet = StopSet(1 << 4);
    pub(crate) const COMMA: StopSet = StopSet(1 << 5);

    fn contains(self, kind: &TokenKind) -> bool {
        let bit = match kind {
            TokenKind::RParen => StopSet::RPAREN,
            TokenKind::RBracket => StopSet::RBRACKET,
            TokenKind::RBrace => StopSet::RBRACE,
            TokenKind::Colon => StopSet::COLON,
            TokenKind::Semicolon => StopSet::SEMICOLON,
            TokenKind::Comma => StopSet::COMMA,
            _ => return false,
        };
        self.0 & bit.0 != 0
    }
}

impl BitOr for StopSet {
    type Output = StopSet;

    fn bitor(self, other: StopSet) -> StopSet {
        StopSet(self.0 | other.0)
    }
}

/// State of the function body being parsed
#[derive(Debug)]
pub(crate) struct ParseContext {
    pub(crate) in_loop: bool,
    pub(crate) in_switch: bool,
    /// The innermost switch already has a `default`
    pub(crate) was_default: bool,
    pub(crate) was_return: bool,
    pub(crate) return_type: TypeRef,
    /// Labels defined or referenced in this function; an undefined entry is
    /// a pending forward `goto`
    pub(crate) labels: FxHashMap<ReprId, IdentId>,
}

impl ParseContext {
    pub(crate) fn new(return_type: TypeRef) -> Self {
        Self {
            in_loop: false,
            in_switch: false,
            was_default: false,
            was_return: false,
            return_type,
            labels: FxHashMap::default(),
        }
    }
}

/// Recursive descent parser for RuC
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) sx: Syntax,
    pub(crate) ctx: ParseContext,
    pub(crate) options: FrontendOptions,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, LexError> {
        Self::with_options(source, FrontendOptions::default())
    }

    pub fn with_options(source: &str, options: FrontendOptions) -> Result<Self, LexError> {
        let mut sx = Syntax::new(&options);
        let tokens = Lexer::new(source).tokenize(&mut sx.reprs)?;
        Ok(Self {
            tokens,
            position: 0,
            sx,
            ctx: ParseContext::new(TypeRef::VOID),
            options,
        })
    }

    /// Parse the entire program (top-level declarations and definitions)
    pub fn parse_translation_unit(mut self) -> Module {
        let start = self.current_span();
        let mut items = Vec::new();

        while !self.is_at_end() {
            if self.sx.reporter.limit_reached() {
                debug!(errors = self.sx.reporter.error_count(), "error limit reached");
                break;
            }
            let before = self.position;
            self.parse_external_declaration(&mut items);
            if self.position == before {
                self.advance();
            }
        }

        if !self.sx.reporter.limit_reached() {
            self.check_undefined_functions();
            if self.options.require_main {
                self.check_main();
            }
        }

        let span = start.to(self.current_span());
        let root = self.builder().build_translation_unit(items, span);
        Module {
            syntax: self.sx,
            root,
        }
    }

    fn check_undefined_functions(&mut self) {
        for id in self.sx.idents.visible() {
            let ident = self.sx.idents.get(id);
            if ident.kind == IdentKind::Function && !ident.defined {
                let location = ident.location;
                let name = self.sx.ident_name(id).to_string();
                self.report(ErrorKind::PredeclaredButNotDefined { name }, location);
            }
        }
    }

    fn check_main(&mut self) {
        let main = self.sx.main_repr();
        let defined = self.sx.idents.resolve(main).is_some_and(|id| {
            let ident = self.sx.idents.get(id);
            ident.kind == IdentKind::Function && ident.defined
        });
        if !defined {
            let location = self.current_location();
            self.report(ErrorKind::NoMainInProgram, location);
        }
    }

    /// Builder over this parser's tables
    pub(crate) fn builder(&mut self) -> Builder<'_> {
        Builder::new(&mut self.sx, &self.options)
    }

    pub(crate) fn report(&mut self, kind: ErrorKind, location: SourceLocation) {
        self.sx.reporter.error(kind, location);
    }

    /// Consumes tokens until one in `stop` or the end of input, skipping
    /// whole bracketed groups and `? :` pairs so that a stop token nested
    /// inside them is never taken.
    pub(crate) fn skip_until(&mut self, stop: StopSet) {
        crate::stack::ensure_sufficient_stack(|| loop {
            let kind = self.peek_kind();
            if stop.contains(kind) {
                return;
            }
            let closing = match kind {
                TokenKind::Eof => return,
                TokenKind::LParen => Some((StopSet::RPAREN, TokenKind::RParen)),
                TokenKind::LBracket => Some((StopSet::RBRACKET, TokenKind::RBracket)),
                TokenKind::LBrace => Some((StopSet::RBRACE, TokenKind::RBrace)),
                TokenKind::Question => Some((StopSet::COLON, TokenKind::Colon)),
                _ => None,
            };
            self.advance();
            if let Some((set, token)) = closing {
                self.skip_until(set);
                self.match_token(&token);
            }
        })
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn check_ahead(&self, n: usize, kind: &TokenKind) -> bool {
        self.peek_ahead(n)
            .is_some_and(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_span(&self) -> Span {
        self.previous().span
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    /// Human-readable form of the current token for diagnostics
    pub(crate) fn describe_current(&self) -> String {
        match self.peek_kind() {
            TokenKind::Identifier(repr) => format!("identifier '{}'", self.sx.spelling(*repr)),
            kind => kind.to_string(),
        }
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, expected: &'static str) -> bool {
        if self.match_token(kind) {
            return true;
        }
        let found = self.describe_current();
        let location = self.current_location();
        self.report(ErrorKind::ExpectedToken { expected, found }, location);
        false
    }

    pub(crate) fn expect_semicolon(&mut self) -> bool {
        self.expect_token(&TokenKind::Semicolon, "';'")
    }

    pub(crate) fn expect_rparen(&mut self) -> bool {
        self.expect_token(&TokenKind::RParen, "')'")
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<(ReprId, Span)> {
        if let TokenKind::Identifier(repr) = *self.peek_kind() {
            let span = self.advance().span;
            Some((repr, span))
        } else {
            let found = self.describe_current();
            let location = self.current_location();
            self.report(ErrorKind::ExpectedIdentifier { found }, location);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Module {
        Parser::new(source).unwrap().parse_translation_unit()
    }

    #[test]
    fn test_parse_simple_function() {
        let module = parse("int main() { return 0; }");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let functions = module.nodes_of(NodeKind::FunctionDefinition);
        assert_eq!(functions.len(), 1);
        let tree = &module.syntax.tree;
        let body = tree.nth_child(functions[0], 0);
        assert_eq!(tree.kind(body), NodeKind::Compound);
        assert_eq!(tree.child_count(body), 1);
    }

    #[test]
    fn test_dump() {
        let module = parse("int main() { int x = 1 + 2 * 3; return x; }");
        let expected = "\
TranslationUnit
  FunctionDefinition main frame=1
    Compound
      VariableDeclaration x: int
        IntegerLiteral 7 : int rvalue
      Return
        Identifier x : int lvalue
";
        assert_eq!(module.dump(), expected);
    }

    #[test]
    fn test_missing_main() {
        let module = parse("int f() { return 0; }");
        assert!(matches!(
            module.errors()[0].kind,
            ErrorKind::NoMainInProgram
        ));

        let fragment = Parser::with_options("int f() { return 0; }", FrontendOptions::fragment())
            .unwrap()
            .parse_translation_unit();
        assert!(!fragment.had_errors());
    }

    #[test]
    fn test_skip_until_respects_nesting() {
        let mut parser = Parser::new("(a ; b) [ ; ] x ? y ; z : w ; tail").unwrap();
        parser.skip_until(StopSet::SEMICOLON);
        assert!(matches!(parser.peek_kind(), TokenKind::Semicolon));
        let semicolon = parser.current_location();
        assert_eq!(semicolon.column, 29);
    }

    #[test]
    fn test_skip_until_stops_at_end_of_input() {
        let mut parser = Parser::new("( ( (").unwrap();
        parser.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
        assert!(parser.is_at_end());
    }

    #[test]
    fn test_error_limit_stops_parsing() {
        let options = FrontendOptions {
            max_errors: Some(1),
            require_main: false,
            ..FrontendOptions::default()
        };
        let module = Parser::with_options("int x = y; int z = w; int q = r;", options)
            .unwrap()
            .parse_translation_unit();
        assert_eq!(module.errors().len(), 1);
    }

    #[test]
    fn test_undefined_prototype() {
        let module = parse("int f(int); int main() { return 0; }");
        assert!(matches!(
            &module.errors()[0].kind,
            ErrorKind::PredeclaredButNotDefined { name } if name == "f"
        ));
    }
}
