//! Declaration parsing implementation
//!
//! This module handles declarations at file and block scope:
//!
//! - Type specifiers: primitive keywords, `struct`, `enum`, type names
//! - `typedef` declarations
//! - Variable declarators with array bounds and initializers
//! - Function prototypes and definitions, including function-type parameters
//!
//! # Grammar
//!
//! ```text
//! declaration      ::= specifier ( ";" | init_declarator ("," init_declarator)* ";" )
//!                    | specifier function_declarator compound_statement
//! specifier        ::= "typedef"? ( "int" | "long" | "char" | "float" | "double" | "void"
//!                    | struct_specifier | enum_specifier | type_name )
//! struct_specifier ::= "struct" identifier? ( "{" (specifier member ("," member)* ";")* "}" )?
//! enum_specifier   ::= "enum" identifier? ( "{" enumerator ("," enumerator)* ","? "}" )?
//! enumerator       ::= identifier ( "=" constant_expression )?
//! init_declarator  ::= "*"* identifier ( "[" expression? "]" )* ( "=" initializer )?
//! function_declarator ::= "*"* identifier "(" ( "void" | parameter ("," parameter)* )? ")"
//! parameter        ::= specifier "*"* ( "(" "*" identifier? ")" "(" parameters ")"
//!                    | identifier? ( "[" expression? "]" )* ( "(" parameters ")" )? )
//! ```
//!
//! Parameters are read in one of four [`DeclaratorMode`]s: a prototype lists
//! unnamed parameters, a definition names every parameter, and the parameters
//! of a function-type parameter are abstract. The first parameter decides
//! between prototype and definition.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::ast::{Expr, NodeId, NodeKind, SourceLocation, Span};
use crate::errors::{ErrorKind, WarningKind};
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseContext, Parser, StopSet};
use crate::tables::{DeclareError, IdentId, IdentKind, Item, ReprId, TypeRef};
use rustc_hash::FxHashSet;
use tracing::debug;

/// How identifiers in a parameter list are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclaratorMode {
    /// Parameters of a function-type parameter: no identifiers
    Abstract,
    /// Unnamed parameters, declaration without a body
    Prototype,
    /// Named parameters, followed by a body
    Definition,
    /// Not decided until the first parameter is seen
    Undecided,
}

/// Type produced by a declaration specifier
#[derive(Debug, Clone, Copy)]
pub(crate) struct Specifier {
    pub(crate) ty: TypeRef,
    /// A struct or enum body was written here
    pub(crate) defines_type: bool,
    pub(crate) is_typedef: bool,
    /// An error was reported while reading the specifier
    pub(crate) reported: bool,
    pub(crate) span: Span,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Parameter {
    pub(crate) name: Option<(ReprId, Span)>,
    pub(crate) ty: TypeRef,
}

impl Parser {
    /// Whether the current token can start a declaration
    pub(crate) fn is_declaration_specifier(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Int
            | TokenKind::Long
            | TokenKind::Char
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Void
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Typedef => true,
            TokenKind::Identifier(repr) => self.type_name(*repr).is_some(),
            _ => false,
        }
    }

    /// Type declared for `repr` by a `typedef` or a struct/enum tag
    fn type_name(&self, repr: ReprId) -> Option<TypeRef> {
        let id = self.sx.idents.resolve(repr)?;
        let ident = self.sx.idents.get(id);
        (ident.kind == IdentKind::TypeName).then_some(ident.ty)
    }

    /// Parse one external declaration, pushing the nodes it produces
    pub(crate) fn parse_external_declaration(&mut self, items: &mut Vec<NodeId>) {
        if self.is_declaration_specifier() {
            self.parse_declaration(items, true);
            return;
        }

        let found = self.describe_current();
        let location = self.current_location();
        self.report(ErrorKind::NotADeclaration { found }, location);
        self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
        if !self.match_token(&TokenKind::Semicolon) {
            self.match_token(&TokenKind::RBrace);
        }
    }

    /// Parse a declaration at file scope or inside a block.
    pub(crate) fn parse_declaration(&mut self, items: &mut Vec<NodeId>, at_file_scope: bool) {
        let spec = self.parse_declaration_specifiers();

        if self.match_token(&TokenKind::Semicolon) {
            if spec.defines_type && !spec.is_typedef {
                let node = self.builder().build_type_declaration(spec.ty, spec.span);
                items.push(node);
            } else {
                self.report(ErrorKind::DeclarationDoesNotDeclareAnything, spec.span.start);
            }
            return;
        }
        if spec.defines_type {
            let node = self.builder().build_type_declaration(spec.ty, spec.span);
            items.push(node);
        }

        loop {
            if self.parse_init_declarator(&spec, items, at_file_scope) {
                return;
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        if !self.expect_semicolon() {
            self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::Semicolon);
        }
    }

    // ===== Type specifiers =====

    pub(crate) fn parse_declaration_specifiers(&mut self) -> Specifier {
        let start = self.current_span();
        let errors = self.sx.reporter.error_count();
        let mut spec = Specifier {
            ty: TypeRef::UNDEFINED,
            defines_type: false,
            is_typedef: false,
            reported: false,
            span: start,
        };

        if self.match_token(&TokenKind::Typedef) {
            spec.is_typedef = true;
        }

        match *self.peek_kind() {
            TokenKind::Int | TokenKind::Long => {
                self.advance();
                spec.ty = TypeRef::INTEGER;
            }
            TokenKind::Char => {
                self.advance();
                spec.ty = TypeRef::CHARACTER;
            }
            TokenKind::Float | TokenKind::Double => {
                self.advance();
                spec.ty = TypeRef::FLOATING;
            }
            TokenKind::Void => {
                self.advance();
                spec.ty = TypeRef::VOID;
            }
            TokenKind::Struct => {
                (spec.ty, spec.defines_type) = self.parse_struct_specifier();
            }
            TokenKind::Enum => {
                (spec.ty, spec.defines_type) = self.parse_enum_specifier();
            }
            TokenKind::Identifier(repr) => match self.type_name(repr) {
                Some(ty) => {
                    self.advance();
                    spec.ty = ty;
                }
                None => {
                    let name = self.sx.spelling(repr).to_string();
                    let location = self.current_location();
                    self.report(ErrorKind::NotAType { name }, location);
                }
            },
            _ => {
                let found = self.describe_current();
                let location = self.current_location();
                self.report(ErrorKind::NotADeclaration { found }, location);
            }
        }

        spec.span = start.to(self.previous_span());
        spec.reported = self.sx.reporter.error_count() > errors;
        spec
    }

    /// Whether a declarator built on `spec` has a usable type. An undefined
    /// specifier type is reported here unless the specifier already was.
    fn has_complete_type(
        &mut self,
        spec: &Specifier,
        name: Option<ReprId>,
        location: SourceLocation,
    ) -> bool {
        if !self.sx.types.is_undefined(spec.ty) {
            return true;
        }
        if !spec.reported {
            let what = match name {
                Some(name) => format!("'{}'", self.sx.spelling(name)),
                None => "unnamed parameter".to_string(),
            };
            self.report(ErrorKind::IncompleteType { what }, location);
        }
        false
    }

    /// Declares a struct or enum tag as a type name
    fn declare_tag(&mut self, tag: Option<(ReprId, Span)>, ty: TypeRef) {
        if let Some((name, span)) = tag {
            self.declare_ident(name, IdentKind::TypeName, ty, span);
        }
    }

    /// Type named by a bare `struct tag` or `enum tag`
    fn tagged_type(&mut self, tag: Option<(ReprId, Span)>, is_struct: bool) -> TypeRef {
        let Some((name, span)) = tag else {
            return TypeRef::UNDEFINED;
        };
        let types = &self.sx.types;
        let tagged = self.type_name(name).filter(|&ty| {
            if is_struct {
                types.is_struct(ty)
            } else {
                types.is_enum(ty)
            }
        });
        match tagged {
            Some(ty) => ty,
            None => {
                let name = self.sx.spelling(name).to_string();
                self.report(ErrorKind::NotAType { name }, span.start);
                TypeRef::UNDEFINED
            }
        }
    }

    fn optional_tag(&mut self) -> Option<(ReprId, Span)> {
        match *self.peek_kind() {
            TokenKind::Identifier(repr) => {
                let span = self.advance().span;
                Some((repr, span))
            }
            _ => None,
        }
    }

    /// `struct tag? { members }` or `struct tag`
    fn parse_struct_specifier(&mut self) -> (TypeRef, bool) {
        self.advance();
        let tag = self.optional_tag();
        let start = self.current_span();

        if !self.match_token(&TokenKind::LBrace) {
            if tag.is_none() {
                self.expect_identifier();
            }
            return (self.tagged_type(tag, true), false);
        }

        let mut fields: Vec<(TypeRef, ReprId)> = Vec::new();
        let mut seen = FxHashSet::default();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if !self.is_declaration_specifier() {
                let found = self.describe_current();
                let location = self.current_location();
                self.report(ErrorKind::NotADeclaration { found }, location);
                self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
                self.match_token(&TokenKind::Semicolon);
                continue;
            }

            let spec = self.parse_declaration_specifiers();
            loop {
                if let Some((ty, (name, span))) = self.parse_member_declarator(&spec) {
                    if seen.insert(name) {
                        fields.push((ty, name));
                    } else {
                        let name = self.sx.spelling(name).to_string();
                        self.report(ErrorKind::DuplicateMember { name }, span.start);
                    }
                }
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
            if !self.expect_semicolon() {
                self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
                self.match_token(&TokenKind::Semicolon);
            }
        }
        self.expect_token(&TokenKind::RBrace, "'}'");

        let ty = if fields.is_empty() {
            self.sx
                .reporter
                .warning(WarningKind::EmptyStruct, start.start);
            TypeRef::UNDEFINED
        } else {
            self.sx.types.structure(&fields)
        };
        self.declare_tag(tag, ty);
        (ty, true)
    }

    /// One struct member: pointers, name and array bounds
    fn parse_member_declarator(&mut self, spec: &Specifier) -> Option<(TypeRef, (ReprId, Span))> {
        let ty = self.parse_pointers(spec.ty);
        let stars = ty != spec.ty;
        let Some((name, name_span)) = self.expect_identifier() else {
            self.skip_until(StopSet::SEMICOLON | StopSet::COMMA | StopSet::RBRACE);
            return None;
        };
        let complete = self.has_complete_type(spec, Some(name), name_span.start);

        let (bounds, outer_empty) = self.parse_array_bounds();
        if stars && !bounds.is_empty() {
            self.report(ErrorKind::PointerBeforeArray, self.previous_span().start);
        }
        if outer_empty {
            self.report(ErrorKind::EmptyBoundWithoutInit, name_span.start);
        }
        let written: Vec<Expr> = bounds.iter().flatten().copied().collect();
        self.builder().check_array_bounds(&written);
        if !complete {
            return Some((TypeRef::UNDEFINED, (name, name_span)));
        }
        let mut ty = ty;
        for _ in &bounds {
            ty = self.sx.types.array_of(ty);
        }
        if ty == TypeRef::VOID {
            self.report(ErrorKind::OnlyFunctionsMayHaveVoid, self.previous_span().start);
            return None;
        }
        Some((ty, (name, name_span)))
    }

    /// `enum tag? { A, B = 5, C }` or `enum tag`
    fn parse_enum_specifier(&mut self) -> (TypeRef, bool) {
        self.advance();
        let tag = self.optional_tag();

        if !self.match_token(&TokenKind::LBrace) {
            if tag.is_none() {
                self.expect_identifier();
            }
            return (self.tagged_type(tag, false), false);
        }

        let mut constants: Vec<(Item, ReprId)> = Vec::new();
        let mut declared: Vec<IdentId> = Vec::new();
        let mut next: Option<Item> = Some(0);
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let Some((name, span)) = self.expect_identifier() else {
                self.skip_until(StopSet::COMMA | StopSet::RBRACE);
                if self.match_token(&TokenKind::Comma) {
                    continue;
                }
                break;
            };

            let mut value = next;
            if self.match_token(&TokenKind::Eq) {
                let expr = self.parse_constant_expression();
                // a rejected value was reported by integer_constant
                value = Some(self.integer_constant(expr).or(next).unwrap_or_default());
            }
            let value = match value {
                Some(value) => value,
                None => {
                    let name = self.sx.spelling(name).to_string();
                    self.report(ErrorKind::EnumeratorOverflow { name }, span.start);
                    Item::MAX
                }
            };

            constants.push((value, name));
            if let Some(id) = self.declare_ident(name, IdentKind::EnumConstant, TypeRef::INTEGER, span) {
                self.sx.idents.set_displacement(id, value);
                declared.push(id);
            }
            next = value.checked_add(1);

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_token(&TokenKind::RBrace, "'}'");

        let ty = self.sx.types.enumeration(&constants);
        for id in declared {
            self.sx.idents.set_type(id, ty);
        }
        self.declare_tag(tag, ty);
        (ty, true)
    }

    /// Value of a folded integer constant, reporting anything else
    pub(crate) fn integer_constant(&mut self, value: Expr) -> Option<Item> {
        if value.is_broken() {
            return None;
        }
        let tree = &self.sx.tree;
        if tree.kind(value.node) == NodeKind::IntegerLiteral {
            return Some(tree.literal_integer(value.node));
        }
        self.report(ErrorKind::NotConstantExpression, value.span.start);
        None
    }

    // ===== Declarators =====

    fn parse_pointers(&mut self, base: TypeRef) -> TypeRef {
        let mut ty = base;
        while self.match_token(&TokenKind::Star) {
            ty = self.sx.types.pointer_to(ty);
        }
        ty
    }

    /// `[bound]` groups; returns the written bounds and whether the first
    /// one was left empty. Only the first may be empty.
    fn parse_array_bounds(&mut self) -> (Vec<Option<Expr>>, bool) {
        let mut bounds = Vec::new();
        while self.match_token(&TokenKind::LBracket) {
            if self.check(&TokenKind::RBracket) {
                if !bounds.is_empty() {
                    let location = self.current_location();
                    self.report(ErrorKind::EmptyBoundNotOutermost, location);
                }
                bounds.push(None);
            } else {
                bounds.push(Some(self.parse_assignment_expression()));
            }
            if !self.expect_token(&TokenKind::RBracket, "']'") {
                self.skip_until(StopSet::RBRACKET | StopSet::SEMICOLON);
                self.match_token(&TokenKind::RBracket);
            }
        }
        let outer_empty = matches!(bounds.first(), Some(None));
        (bounds, outer_empty)
    }

    /// One declarator of a declaration. Returns `true` when it was a function
    /// definition, which ends the declaration without a `;`.
    fn parse_init_declarator(
        &mut self,
        spec: &Specifier,
        items: &mut Vec<NodeId>,
        at_file_scope: bool,
    ) -> bool {
        let start = self.current_span();
        let ty = self.parse_pointers(spec.ty);
        let stars = ty != spec.ty;
        let Some((name, name_span)) = self.expect_identifier() else {
            self.skip_until(StopSet::SEMICOLON | StopSet::COMMA | StopSet::RBRACE);
            return false;
        };
        let ty = if spec.is_typedef || self.has_complete_type(spec, Some(name), name_span.start) {
            ty
        } else {
            TypeRef::UNDEFINED
        };

        if self.match_token(&TokenKind::LParen) {
            let mut mode = DeclaratorMode::Undecided;
            let params = self.parse_parameter_list(&mut mode);
            let param_types: Vec<TypeRef> = params.iter().map(|p| p.ty).collect();
            let fn_ty = self.sx.types.function(ty, &param_types);

            if spec.is_typedef {
                self.declare_ident(name, IdentKind::TypeName, fn_ty, name_span);
                return false;
            }
            if self.check(&TokenKind::LBrace) {
                if !at_file_scope {
                    let found = self.describe_current();
                    let location = self.current_location();
                    self.report(ErrorKind::ExpectedToken { expected: "';'", found }, location);
                    self.skip_until(StopSet::SEMICOLON | StopSet::RBRACE);
                    self.match_token(&TokenKind::RBrace);
                    return true;
                }
                if mode == DeclaratorMode::Prototype {
                    self.report(ErrorKind::FunctionDeclarationRequiresParams, name_span.start);
                }
                let node = self.parse_function_definition(name, name_span, fn_ty, params, start);
                items.push(node);
                return true;
            }

            if mode == DeclaratorMode::Definition {
                self.report(ErrorKind::FunctionHasNoBody, name_span.start);
            }
            self.declare_prototype(name, name_span, fn_ty);
            return false;
        }

        let (bounds, outer_empty) = self.parse_array_bounds();
        if stars && !bounds.is_empty() {
            self.report(ErrorKind::PointerBeforeArray, name_span.start);
        }
        if !bounds.is_empty() && self.check(&TokenKind::LParen) {
            self.report(ErrorKind::ArrayBeforeFunction, self.current_location());
            self.skip_until(StopSet::SEMICOLON | StopSet::COMMA);
            return false;
        }
        let mut ty = ty;
        for _ in &bounds {
            ty = self.sx.types.array_of(ty);
        }

        if spec.is_typedef {
            if self.check(&TokenKind::Eq) {
                let found = self.describe_current();
                let location = self.current_location();
                self.report(ErrorKind::ExpectedToken { expected: "';'", found }, location);
            }
            if self.declare_ident(name, IdentKind::TypeName, ty, name_span).is_some() {
                let span = start.to(self.previous_span());
                let node = self.builder().build_type_declaration(ty, span);
                items.push(node);
            }
            return false;
        }

        if ty == TypeRef::VOID {
            self.report(ErrorKind::OnlyFunctionsMayHaveVoid, name_span.start);
            ty = TypeRef::UNDEFINED;
        }
        let ident = self.declare_ident(name, IdentKind::Variable, ty, name_span);

        let init = self
            .match_token(&TokenKind::Eq)
            .then(|| self.parse_initializer());

        if let Some(ident) = ident {
            if !self.sx.types.is_undefined(ty) {
                let bounds: Vec<Expr> = bounds.into_iter().flatten().collect();
                let span = start.to(self.previous_span());
                let node = self
                    .builder()
                    .build_variable_declaration(ident, bounds, outer_empty, init, span);
                items.push(node);
            }
        }
        false
    }

    /// Declares `name` in the current scope, reporting a conflict.
    pub(crate) fn declare_ident(
        &mut self,
        name: ReprId,
        kind: IdentKind,
        ty: TypeRef,
        span: Span,
    ) -> Option<IdentId> {
        match self.sx.declare(name, kind, ty, span.start) {
            Ok(id) => Some(id),
            Err(err) => {
                self.report_declare_error(err, name, span);
                None
            }
        }
    }

    fn report_declare_error(&mut self, err: DeclareError, name: ReprId, span: Span) {
        let kind = match err {
            DeclareError::MainRedefinition => ErrorKind::MainRedefinition,
            DeclareError::Redefinition { .. } => ErrorKind::Redefinition {
                name: self.sx.spelling(name).to_string(),
            },
        };
        self.report(kind, span.start);
    }

    // ===== Functions =====

    /// Parameters after the opening parenthesis, through the closing one
    pub(crate) fn parse_parameter_list(&mut self, mode: &mut DeclaratorMode) -> Vec<Parameter> {
        let mut params = Vec::new();
        if self.match_token(&TokenKind::RParen) {
            return params;
        }
        if self.check(&TokenKind::Void) && self.check_ahead(1, &TokenKind::RParen) {
            self.advance();
            self.advance();
            return params;
        }

        loop {
            if self.is_declaration_specifier() {
                let spec = self.parse_declaration_specifiers();
                params.push(self.parse_parameter_declarator(&spec, mode));
            } else {
                let found = self.describe_current();
                let location = self.current_location();
                self.report(ErrorKind::NotADeclaration { found }, location);
                self.skip_until(StopSet::COMMA | StopSet::RPAREN | StopSet::SEMICOLON);
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        if !self.expect_rparen() {
            self.skip_until(StopSet::RPAREN | StopSet::SEMICOLON | StopSet::RBRACE);
            self.match_token(&TokenKind::RParen);
        }
        params
    }

    fn parse_parameter_declarator(&mut self, spec: &Specifier, mode: &mut DeclaratorMode) -> Parameter {
        let start = self.current_location();
        let ty = self.parse_pointers(spec.ty);
        let stars = ty != spec.ty;

        let (name, ty) = if self.check(&TokenKind::LParen) && self.check_ahead(1, &TokenKind::Star) {
            if stars {
                self.report(ErrorKind::AsteriskBeforeFunction, start);
            }
            self.advance();
            self.advance();
            let name = self.optional_tag();
            self.expect_rparen();
            self.expect_token(&TokenKind::LParen, "'('");
            (name, self.parse_function_type(ty))
        } else {
            let name = self.optional_tag();
            let (bounds, _) = self.parse_array_bounds();
            let mut ty = ty;
            if self.check(&TokenKind::LParen) {
                if !bounds.is_empty() {
                    self.report(ErrorKind::ArrayBeforeFunction, start);
                } else if stars {
                    self.report(ErrorKind::AsteriskBeforeFunction, start);
                }
                self.advance();
                ty = self.parse_function_type(ty);
            } else {
                if stars && !bounds.is_empty() {
                    self.report(ErrorKind::PointerBeforeArray, start);
                }
                for _ in &bounds {
                    ty = self.sx.types.array_of(ty);
                }
            }
            (name, ty)
        };

        if ty == TypeRef::VOID {
            self.report(ErrorKind::VoidParameterWithoutFunction, start);
        }
        let ty = if self.has_complete_type(spec, name.map(|(name, _)| name), start) {
            ty
        } else {
            TypeRef::UNDEFINED
        };

        match (*mode, name) {
            (DeclaratorMode::Abstract, Some((_, span))) => {
                self.report(ErrorKind::IdentInDeclarator, span.start);
            }
            (DeclaratorMode::Undecided, Some(_)) => *mode = DeclaratorMode::Definition,
            (DeclaratorMode::Undecided, None) => *mode = DeclaratorMode::Prototype,
            (DeclaratorMode::Prototype, Some((_, span))) => {
                self.report(ErrorKind::ExpectedDeclarator, span.start);
            }
            (DeclaratorMode::Definition, None) => {
                self.report(ErrorKind::ExpectedDefinition, start);
            }
            _ => {}
        }
        Parameter { name, ty }
    }

    /// Function type whose abstract parameter list starts after `(`
    fn parse_function_type(&mut self, return_type: TypeRef) -> TypeRef {
        let mut inner = DeclaratorMode::Abstract;
        let params = self.parse_parameter_list(&mut inner);
        let types: Vec<TypeRef> = params.iter().map(|p| p.ty).collect();
        self.sx.types.function(return_type, &types)
    }

    fn declare_prototype(&mut self, name: ReprId, span: Span, ty: TypeRef) {
        match self.sx.idents.declare_function(name, ty, false, span.start) {
            Ok(id) => {
                let number = self.sx.add_function(id);
                self.sx.idents.set_displacement(id, number as Item);
            }
            Err(err) => self.report_declare_error(err, name, span),
        }
    }

    /// Declares the function, its parameters and parses its body.
    fn parse_function_definition(
        &mut self,
        name: ReprId,
        name_span: Span,
        ty: TypeRef,
        params: Vec<Parameter>,
        start: Span,
    ) -> NodeId {
        let prototype = self.sx.idents.resolve(name).filter(|&id| {
            let ident = self.sx.idents.get(id);
            ident.kind == IdentKind::Function && !ident.defined
        });
        if let Some(prototype) = prototype {
            let declared = self.sx.idents.get(prototype).ty;
            if !self.sx.types.is_equal(declared, ty) {
                let name = self.sx.spelling(name).to_string();
                self.report(ErrorKind::DeclarationAndDefinitionDiffer { name }, name_span.start);
            }
        }

        let ident = match self.sx.idents.declare_function(name, ty, true, name_span.start) {
            Ok(id) => {
                if prototype.is_none() {
                    let number = self.sx.add_function(id);
                    self.sx.idents.set_displacement(id, number as Item);
                }
                Some(id)
            }
            Err(err) => {
                self.report_declare_error(err, name, name_span);
                None
            }
        };

        let return_type = self.sx.types.function_return(ty);
        let saved = std::mem::replace(&mut self.ctx, ParseContext::new(return_type));
        self.sx.idents.enter_function_scope();
        for param in &params {
            if let Some((param_name, span)) = param.name {
                self.declare_ident(param_name, IdentKind::Variable, param.ty, span);
            }
        }

        let body = self.parse_compound_statement(false);

        self.resolve_pending_labels();
        let returns_value = !self.sx.types.is_void(return_type) && !self.sx.types.is_undefined(return_type);
        if returns_value && !self.ctx.was_return {
            let name = self.sx.spelling(name).to_string();
            self.report(ErrorKind::NoReturnInFunction { name }, name_span.start);
        }
        let frame = self.sx.idents.exit_function_scope();
        self.ctx = saved;

        debug!(function = self.sx.spelling(name), frame, "function definition");
        match ident {
            Some(ident) => {
                let span = start.to(self.previous_span());
                self.builder().build_function_definition(ident, frame, body, span)
            }
            None => NodeId::BROKEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeKind;
    use crate::config::FrontendOptions;
    use crate::errors::ErrorKind;
    use crate::parser::parse::{Module, Parser};
    use crate::tables::{IdentKind, TypeRef};

    fn parse(source: &str) -> Module {
        Parser::with_options(source, FrontendOptions::fragment())
            .unwrap()
            .parse_translation_unit()
    }

    fn error_kinds(module: &Module) -> Vec<ErrorKind> {
        module.errors().iter().map(|e| e.kind.clone()).collect()
    }

    fn global_type(module: &Module, name: &str) -> TypeRef {
        let repr = module.syntax.reprs.get(name).unwrap();
        let id = module.syntax.idents.resolve(repr).unwrap();
        module.syntax.idents.get(id).ty
    }

    #[test]
    fn test_struct_declaration() {
        let module = parse("struct point { int x; float y; }; point p;");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let ty = global_type(&module, "p");
        let types = &module.syntax.types;
        assert!(types.is_struct(ty));
        assert_eq!(types.field_count(ty), 2);
        assert_eq!(types.size_of(ty), 3);
        assert_eq!(module.nodes_of(NodeKind::TypeDeclaration).len(), 1);
    }

    #[test]
    fn test_duplicate_member() {
        let module = parse("struct s { int a; int a; };");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::DuplicateMember { name }] if name == "a"
        ));
    }

    #[test]
    fn test_empty_struct_warns() {
        let module = parse("struct s { };");
        assert!(!module.had_errors());
        assert_eq!(module.warnings().len(), 1);
    }

    #[test]
    fn test_enum_constants() {
        let module = parse("enum color { RED, GREEN = 5, BLUE }; int x = BLUE;");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let repr = module.syntax.reprs.get("BLUE").unwrap();
        let id = module.syntax.idents.resolve(repr).unwrap();
        let blue = module.syntax.idents.get(id);
        assert_eq!(blue.kind, IdentKind::EnumConstant);
        assert_eq!(blue.displacement, 6);
        assert!(module.syntax.types.is_enum(blue.ty));
    }

    #[test]
    fn test_typedef() {
        let module = parse("typedef float real; real r = 1;");
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(global_type(&module, "r"), TypeRef::FLOATING);
        assert_eq!(module.nodes_of(NodeKind::TypeDeclaration).len(), 1);
    }

    #[test]
    fn test_declaration_without_declarator() {
        let module = parse("int;");
        assert_eq!(
            error_kinds(&module),
            vec![ErrorKind::DeclarationDoesNotDeclareAnything]
        );
    }

    #[test]
    fn test_void_variable() {
        let module = parse("void v;");
        assert_eq!(error_kinds(&module), vec![ErrorKind::OnlyFunctionsMayHaveVoid]);
    }

    #[test]
    fn test_failed_variable_does_not_cascade() {
        let module = parse("void f() { void v; int y; y = v * 2; v++; y = -v; }");
        assert_eq!(error_kinds(&module), vec![ErrorKind::OnlyFunctionsMayHaveVoid]);
    }

    #[test]
    fn test_empty_struct_variable() {
        let module = parse("int f() { struct {} v; int y; v = 1; y = 2; return y; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::IncompleteType { what }] if what == "'v'"
        ));
        assert_eq!(module.warnings().len(), 1);
    }

    #[test]
    fn test_empty_struct_through_typedef() {
        let module = parse("typedef struct {} empty; empty a, *b; void g(empty e) { }");
        let errors = error_kinds(&module);
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .all(|kind| matches!(kind, ErrorKind::IncompleteType { .. })));
    }

    #[test]
    fn test_unknown_tag_is_reported_once() {
        let module = parse("struct missing v; int w = v;");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::NotAType { name }] if name == "missing"
        ));
    }

    #[test]
    fn test_enum_value_overflow() {
        let module = parse("enum big { A = 9223372036854775807, B, C = 1, D };");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::EnumeratorOverflow { name }] if name == "B"
        ));

        let repr = module.syntax.reprs.get("D").unwrap();
        let id = module.syntax.idents.resolve(repr).unwrap();
        assert_eq!(module.syntax.idents.get(id).displacement, 2);
    }

    #[test]
    fn test_member_bounds_are_checked() {
        let module = parse("struct s { int a[1.5]; int b[]; int c[2][]; };");
        let errors = error_kinds(&module);
        assert_eq!(errors.len(), 3, "{errors:?}");
        assert!(matches!(&errors[0], ErrorKind::ArraySizeMustBeInteger { found } if found == "float"));
        assert_eq!(errors[1], ErrorKind::EmptyBoundWithoutInit);
        assert_eq!(errors[2], ErrorKind::EmptyBoundNotOutermost);
    }

    #[test]
    fn test_member_of_incomplete_type() {
        let module = parse("typedef struct {} empty; struct s { empty e; int x; }; void f() { struct s v; v.e = 1; v.x = 2; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::IncompleteType { what }] if what == "'e'"
        ));
    }

    #[test]
    fn test_pointer_before_array() {
        let module = parse("int *a[3];");
        assert_eq!(error_kinds(&module), vec![ErrorKind::PointerBeforeArray]);
    }

    #[test]
    fn test_only_outer_bound_may_be_empty() {
        let module = parse("int a[2][] = {{1}, {2}};");
        assert!(error_kinds(&module).contains(&ErrorKind::EmptyBoundNotOutermost));

        let module = parse("int b[] = {1, 2, 3};");
        assert!(!module.had_errors(), "{:?}", module.errors());
    }

    #[test]
    fn test_prototype_then_definition() {
        let module = parse("int f(int); int f(int x) { return x; }");
        assert!(!module.had_errors(), "{:?}", module.errors());
        assert_eq!(module.syntax.functions.len(), 1);
        assert!(module.syntax.functions[0].definition.is_some());
    }

    #[test]
    fn test_prototype_mismatch() {
        let module = parse("int f(int); int f(float x) { return 1; }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::DeclarationAndDefinitionDiffer { name }] if name == "f"
        ));
    }

    #[test]
    fn test_parameter_naming_modes() {
        let module = parse("int f(int x, int);");
        assert!(error_kinds(&module).contains(&ErrorKind::ExpectedDefinition));

        let module = parse("int g(int, int y);");
        assert!(error_kinds(&module).contains(&ErrorKind::ExpectedDeclarator));

        let module = parse("int h(int x);");
        assert!(error_kinds(&module).contains(&ErrorKind::FunctionHasNoBody));

        let module = parse("int k(int) { return 0; }");
        assert!(error_kinds(&module).contains(&ErrorKind::FunctionDeclarationRequiresParams));
    }

    #[test]
    fn test_function_type_parameter() {
        let module = parse("float apply(float (*g)(float), float v) { return g(v); }");
        assert!(!module.had_errors(), "{:?}", module.errors());

        let module = parse("float bad(float (*g)(float x)) { return 0; }");
        assert!(error_kinds(&module).contains(&ErrorKind::IdentInDeclarator));
    }

    #[test]
    fn test_redefinition() {
        let module = parse("int x; float x;");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::Redefinition { name }] if name == "x"
        ));

        let module = parse("int main() { return 0; } int main() { return 1; }");
        assert!(error_kinds(&module).contains(&ErrorKind::MainRedefinition));
    }

    #[test]
    fn test_missing_return() {
        let module = parse("int f() { }");
        assert!(matches!(
            &error_kinds(&module)[..],
            [ErrorKind::NoReturnInFunction { name }] if name == "f"
        ));
    }
}
