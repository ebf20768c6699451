//! Diagnostics for the front end
//!
//! This module defines [`ErrorKind`] and [`WarningKind`], the [`Diagnostic`]
//! records that pair them with a source position, and the [`Reporter`] that
//! collects them during a single parsing pass.
//!
//! User errors never abort compilation: they are recorded once, at the site
//! that detects the root cause, and the offending construct becomes a broken
//! value. Only front-end bugs go through [`internal_error`], which panics.

use crate::ast::SourceLocation;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Errors in the user's program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// A specific punctuator or keyword was required
    #[error("expected {expected}, found {found}")]
    ExpectedToken { expected: &'static str, found: String },

    #[error("expected expression, found {found}")]
    ExpectedExpression { found: String },

    #[error("expected identifier, found {found}")]
    ExpectedIdentifier { found: String },

    #[error("expected statement, found {found}")]
    ExpectedStatement { found: String },

    /// The token cannot start a declaration
    #[error("expected a type specifier, found {found}")]
    NotADeclaration { found: String },

    #[error("'{name}' does not name a type")]
    NotAType { name: String },

    #[error("expression is not a constant")]
    NotConstantExpression,

    #[error("value of enumerator '{name}' does not fit in an integer")]
    EnumeratorOverflow { name: String },

    #[error("empty initializer list")]
    EmptyInitializer,

    /// Only the first written array bound may be left empty
    #[error("only the outermost array bound may be omitted")]
    EmptyBoundNotOutermost,

    #[error("pointer declarator before array declarator")]
    PointerBeforeArray,

    /// Identifier inside an abstract (nested) function declarator
    #[error("identifier in an abstract function declarator")]
    IdentInDeclarator,

    /// A prototype mixed named and unnamed parameters, named after unnamed
    #[error("expected an abstract declarator, found a named parameter")]
    ExpectedDeclarator,

    /// A definition mixed named and unnamed parameters, unnamed after named
    #[error("expected a named parameter in a function definition")]
    ExpectedDefinition,

    #[error("'*' before a function-type parameter")]
    AsteriskBeforeFunction,

    #[error("'[]' before a function-type parameter")]
    ArrayBeforeFunction,

    #[error("parameter of type void must be a function")]
    VoidParameterWithoutFunction,

    #[error("function definition requires named parameters")]
    FunctionDeclarationRequiresParams,

    #[error("function with named parameters has no body")]
    FunctionHasNoBody,

    #[error("use of undeclared identifier '{name}'")]
    UndeclaredVariable { name: String },

    #[error("redefinition of '{name}'")]
    Redefinition { name: String },

    /// Kept apart from [`ErrorKind::Redefinition`]: the entry point is special
    #[error("redefinition of 'main'")]
    MainRedefinition,

    #[error("type name '{name}' used as a value")]
    TypeNameUsedAsValue { name: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("expression is not assignable")]
    NotAnLvalue,

    #[error("cannot take the address of an rvalue")]
    AddressOfNonLvalue,

    #[error("indirection requires a pointer operand, found {found}")]
    IndirectionOfNonPointer { found: String },

    #[error("subscripted value is not an array, found {found}")]
    SubscriptOfNonArray { found: String },

    #[error("array subscript is not an integer, found {found}")]
    SubscriptNotInteger { found: String },

    #[error("called object is not a function, found {found}")]
    CallOfNonFunction { found: String },

    #[error("wrong number of arguments: expected {expected}, found {found}")]
    WrongArgumentCount { expected: usize, found: usize },

    #[error("member reference base is not a structure, found {found}")]
    MemberOfNonStruct { found: String },

    #[error("'->' requires a pointer to a structure, found {found}")]
    ArrowOfNonPointerToStruct { found: String },

    #[error("no member named '{name}'")]
    NoSuchMember { name: String },

    #[error("duplicate member '{name}'")]
    DuplicateMember { name: String },

    #[error("incompatible operand types in conditional expression: {then} and {otherwise}")]
    IncompatibleConditionalOperands { then: String, otherwise: String },

    #[error("condition must be of scalar type, found {found}")]
    ConditionMustBeScalar { found: String },

    #[error("switch expression must be an integer, found {found}")]
    SwitchExpressionNotInteger { found: String },

    #[error("case value must be an integer constant")]
    CaseExpressionNotInteger,

    #[error("'case' or 'default' outside of a switch")]
    CaseOrDefaultNotInSwitch,

    #[error("'case' after 'default'")]
    CaseAfterDefault,

    #[error("multiple 'default' labels in one switch")]
    RepeatedDefault,

    #[error("'break' outside of a loop or switch")]
    BreakNotInLoopOrSwitch,

    #[error("'continue' outside of a loop")]
    ContinueNotInLoop,

    /// A `goto` target never defined in the function body
    #[error("label '{name}' used at line {line} is not declared")]
    LabelNotDeclared { name: String, line: usize },

    #[error("redefinition of label '{name}'")]
    RepeatedLabel { name: String },

    #[error("void function returns a value")]
    VoidFunctionValuedReturn,

    #[error("non-void function returns no value")]
    NonVoidFunctionVoidReturn,

    #[error("non-void function '{name}' has no return statement")]
    NoReturnInFunction { name: String },

    #[error("only functions may have type void")]
    OnlyFunctionsMayHaveVoid,

    /// Declarator whose type is an empty struct, directly or through a typedef
    #[error("{what} has an incomplete type")]
    IncompleteType { what: String },

    #[error("array size must be an integer, found {found}")]
    ArraySizeMustBeInteger { found: String },

    #[error("array with an empty bound requires an initializer")]
    EmptyBoundWithoutInit,

    #[error("wrong number of initializers: expected {expected}, found {found}")]
    WrongInitializerCount { expected: usize, found: usize },

    #[error("braced initializer for a value of type {found}")]
    BracedInitializerForScalar { found: String },

    #[error("declaration does not declare anything")]
    DeclarationDoesNotDeclareAnything,

    #[error("definition of '{name}' does not match its prototype")]
    DeclarationAndDefinitionDiffer { name: String },

    #[error("function '{name}' is declared but never defined")]
    PredeclaredButNotDefined { name: String },

    #[error("program has no 'main' function")]
    NoMainInProgram,

    #[error("first argument of printf must be a string literal")]
    PrintfFormatNotString,

    #[error("unknown printf conversion '%{specifier}'")]
    PrintfUnknownSpecifier { specifier: char },

    #[error("printf format ends with an incomplete conversion")]
    PrintfIncompleteSpecifier,

    #[error("printf format expects {expected} arguments, found {found}")]
    PrintfArgumentCount { expected: usize, found: usize },

    #[error("printf accepts at most {max} arguments")]
    PrintfTooManyArguments { max: usize },
}

/// Suspicious but valid constructs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarningKind {
    #[error("comparing floating values for equality")]
    FloatEquality,

    #[error("structure has no members")]
    EmptyStruct,
}

/// One error at a source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.location.line, self.location.column, self.kind
        )
    }
}

/// One warning at a source position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub location: SourceLocation,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {}: {}",
            self.location.line, self.location.column, self.kind
        )
    }
}

/// Collects diagnostics for one translation unit.
///
/// The error count is what gates code generation downstream: a module with
/// [`Reporter::had_errors`] set must not be lowered.
#[derive(Debug, Default)]
pub struct Reporter {
    errors: Vec<Diagnostic>,
    warnings: Vec<Warning>,
    warnings_enabled: bool,
    max_errors: Option<usize>,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            warnings_enabled: true,
            ..Self::default()
        }
    }

    pub fn with_limits(warnings_enabled: bool, max_errors: Option<usize>) -> Self {
        Self {
            warnings_enabled,
            max_errors,
            ..Self::default()
        }
    }

    pub fn error(&mut self, kind: ErrorKind, location: SourceLocation) {
        debug!(line = location.line, column = location.column, "error: {kind}");
        self.errors.push(Diagnostic { kind, location });
    }

    pub fn warning(&mut self, kind: WarningKind, location: SourceLocation) {
        if self.warnings_enabled {
            debug!(line = location.line, column = location.column, "warning: {kind}");
            self.warnings.push(Warning { kind, location });
        }
    }

    pub fn had_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// True once the configured error limit has been reached
    pub fn limit_reached(&self) -> bool {
        self.max_errors
            .is_some_and(|max| self.errors.len() >= max)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Aborts on a front-end bug. Never used for mistakes in the user's program.
#[track_caller]
pub fn internal_error(message: impl fmt::Display) -> ! {
    panic!("internal compiler error: {message}")
}
