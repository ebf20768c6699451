//! Abstract syntax tree
//!
//! The tree is an arena ([`tree::Tree`]) of nodes tagged with a [`NodeKind`].
//! Each kind has a fixed number of scalar arguments and a child shape given by
//! [`NodeKind::arity`], so a node describes its own layout:
//!
//! ```text
//! node := kind  arg_0 .. arg_{k-1}  child_0 .. child_{m-1}
//! ```
//!
//! Expression nodes always start with two arguments, their type and their
//! value category. Statement nodes never carry either.

pub mod expr;
pub mod tree;

pub use expr::Expr;
pub use tree::{NodeId, Tree};

use crate::errors::internal_error;
use crate::tables::Item;
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open source range covered by a token or node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl Span {
    pub fn new(start: SourceLocation, end: SourceLocation) -> Self {
        Self { start, end }
    }

    /// Span from the start of `self` to the end of `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

/// Value category of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lvalue,
    Rvalue,
}

impl Category {
    pub fn to_item(self) -> Item {
        match self {
            Category::Lvalue => 1,
            Category::Rvalue => 0,
        }
    }

    pub fn from_item(item: Item) -> Self {
        match item {
            1 => Category::Lvalue,
            0 => Category::Rvalue,
            _ => internal_error(format_args!("slot {item} is not a value category")),
        }
    }
}

/// Binary operators, assignments and comma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
    Assign,
    MulAssign,
    DivAssign,
    RemAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Comma,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 30] = [
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Rem,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::BitAnd,
        BinaryOp::BitXor,
        BinaryOp::BitOr,
        BinaryOp::LogAnd,
        BinaryOp::LogOr,
        BinaryOp::Assign,
        BinaryOp::MulAssign,
        BinaryOp::DivAssign,
        BinaryOp::RemAssign,
        BinaryOp::AddAssign,
        BinaryOp::SubAssign,
        BinaryOp::ShlAssign,
        BinaryOp::ShrAssign,
        BinaryOp::AndAssign,
        BinaryOp::XorAssign,
        BinaryOp::OrAssign,
        BinaryOp::Comma,
    ];

    pub fn to_item(self) -> Item {
        self as Item
    }

    pub fn from_item(item: Item) -> Self {
        usize::try_from(item)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_else(|| internal_error(format_args!("slot {item} is not a binary operator")))
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            BinaryOp::Assign
                | BinaryOp::MulAssign
                | BinaryOp::DivAssign
                | BinaryOp::RemAssign
                | BinaryOp::AddAssign
                | BinaryOp::SubAssign
                | BinaryOp::ShlAssign
                | BinaryOp::ShrAssign
                | BinaryOp::AndAssign
                | BinaryOp::XorAssign
                | BinaryOp::OrAssign
        )
    }

    /// Operator applied by a compound assignment, `+` for `+=`
    pub fn underlying(self) -> Option<BinaryOp> {
        match self {
            BinaryOp::MulAssign => Some(BinaryOp::Mul),
            BinaryOp::DivAssign => Some(BinaryOp::Div),
            BinaryOp::RemAssign => Some(BinaryOp::Rem),
            BinaryOp::AddAssign => Some(BinaryOp::Add),
            BinaryOp::SubAssign => Some(BinaryOp::Sub),
            BinaryOp::ShlAssign => Some(BinaryOp::Shl),
            BinaryOp::ShrAssign => Some(BinaryOp::Shr),
            BinaryOp::AndAssign => Some(BinaryOp::BitAnd),
            BinaryOp::XorAssign => Some(BinaryOp::BitXor),
            BinaryOp::OrAssign => Some(BinaryOp::BitOr),
            _ => None,
        }
    }

    /// Operators defined on integer operands only
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            BinaryOp::Rem
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::BitAnd
                | BinaryOp::BitXor
                | BinaryOp::BitOr
        )
    }

    pub fn is_relational(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogAnd | BinaryOp::LogOr)
    }

    pub fn spelling(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
            BinaryOp::Assign => "=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
            BinaryOp::RemAssign => "%=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::ShlAssign => "<<=",
            BinaryOp::ShrAssign => ">>=",
            BinaryOp::AndAssign => "&=",
            BinaryOp::XorAssign => "^=",
            BinaryOp::OrAssign => "|=",
            BinaryOp::Comma => ",",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    PostInc,
    PostDec,
    PreInc,
    PreDec,
    Address,
    Indirection,
    Plus,
    Minus,
    BitNot,
    LogNot,
    Abs,
    /// Number of elements of an array
    Upb,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 12] = [
        UnaryOp::PostInc,
        UnaryOp::PostDec,
        UnaryOp::PreInc,
        UnaryOp::PreDec,
        UnaryOp::Address,
        UnaryOp::Indirection,
        UnaryOp::Plus,
        UnaryOp::Minus,
        UnaryOp::BitNot,
        UnaryOp::LogNot,
        UnaryOp::Abs,
        UnaryOp::Upb,
    ];

    pub fn to_item(self) -> Item {
        self as Item
    }

    pub fn from_item(item: Item) -> Self {
        usize::try_from(item)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_else(|| internal_error(format_args!("slot {item} is not a unary operator")))
    }

    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::PostInc | UnaryOp::PreInc => "++",
            UnaryOp::PostDec | UnaryOp::PreDec => "--",
            UnaryOp::Address => "&",
            UnaryOp::Indirection => "*",
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::LogNot => "!",
            UnaryOp::Abs => "abs",
            UnaryOp::Upb => "upb",
        }
    }
}

/// Tag of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Expressions: args start with [type, category]
    /// `[type, category, ident]`
    Identifier,
    /// `[type, category, value]`
    IntegerLiteral,
    /// `[type, category, f64 bits]`
    FloatingLiteral,
    /// `[type, category, string index]`
    StringLiteral,
    NullLiteral,
    /// children: base, index
    Subscript,
    /// children: callee, arguments...
    Call,
    /// `[type, category, field index, is_arrow]`, child: base
    Member,
    /// Implicit conversion of its child to the node type
    Cast,
    /// `[type, category, op]`, child: operand
    Unary,
    /// `[type, category, op]`, children: left, right
    Binary,
    /// children: condition, then, else
    Ternary,
    /// children: items...
    Initializer,

    // Statements and declarations
    /// children: external declarations...
    TranslationUnit,
    /// `[ident, frame size]`, child: body
    FunctionDefinition,
    /// `[ident, bound count, has initializer]`, children: bounds..., initializer?
    VariableDeclaration,
    /// `[type]`
    TypeDeclaration,
    /// children: items...
    Compound,
    /// child: expression
    ExpressionStatement,
    Null,
    /// `[ident]`, child: statement
    Labeled,
    /// children: value, statement
    Case,
    /// child: statement
    Default,
    /// `[has else]`, children: condition, then, else?
    If,
    /// children: condition, body
    Switch,
    /// children: condition, body
    While,
    /// children: body, condition
    Do,
    /// `[has init, has condition, has increment]`, children: init?, condition?, increment?, body
    For,
    /// `[ident]`
    Goto,
    Continue,
    Break,
    /// `[has value]`, child: value?
    Return,
}

/// How many children follow a node's arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Children {
    Exactly(usize),
    /// A base count plus the values of the listed arguments
    FromArgs(usize, &'static [usize]),
    AtLeast(usize),
}

/// Static layout of one node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub args: usize,
    pub children: Children,
}

impl Arity {
    const fn new(args: usize, children: Children) -> Self {
        Self { args, children }
    }
}

impl NodeKind {
    pub const ALL: [NodeKind; 32] = [
        NodeKind::Identifier,
        NodeKind::IntegerLiteral,
        NodeKind::FloatingLiteral,
        NodeKind::StringLiteral,
        NodeKind::NullLiteral,
        NodeKind::Subscript,
        NodeKind::Call,
        NodeKind::Member,
        NodeKind::Cast,
        NodeKind::Unary,
        NodeKind::Binary,
        NodeKind::Ternary,
        NodeKind::Initializer,
        NodeKind::TranslationUnit,
        NodeKind::FunctionDefinition,
        NodeKind::VariableDeclaration,
        NodeKind::TypeDeclaration,
        NodeKind::Compound,
        NodeKind::ExpressionStatement,
        NodeKind::Null,
        NodeKind::Labeled,
        NodeKind::Case,
        NodeKind::Default,
        NodeKind::If,
        NodeKind::Switch,
        NodeKind::While,
        NodeKind::Do,
        NodeKind::For,
        NodeKind::Goto,
        NodeKind::Continue,
        NodeKind::Break,
        NodeKind::Return,
    ];

    pub fn arity(self) -> Arity {
        use Children::*;
        match self {
            NodeKind::Identifier
            | NodeKind::IntegerLiteral
            | NodeKind::FloatingLiteral
            | NodeKind::StringLiteral => Arity::new(3, Exactly(0)),
            NodeKind::NullLiteral => Arity::new(2, Exactly(0)),
            NodeKind::Subscript => Arity::new(2, Exactly(2)),
            NodeKind::Call => Arity::new(2, AtLeast(1)),
            NodeKind::Member => Arity::new(4, Exactly(1)),
            NodeKind::Cast => Arity::new(2, Exactly(1)),
            NodeKind::Unary => Arity::new(3, Exactly(1)),
            NodeKind::Binary => Arity::new(3, Exactly(2)),
            NodeKind::Ternary => Arity::new(2, Exactly(3)),
            NodeKind::Initializer => Arity::new(2, AtLeast(1)),

            NodeKind::TranslationUnit | NodeKind::Compound => Arity::new(0, AtLeast(0)),
            NodeKind::FunctionDefinition => Arity::new(2, Exactly(1)),
            NodeKind::VariableDeclaration => Arity::new(3, FromArgs(0, &[1, 2])),
            NodeKind::TypeDeclaration => Arity::new(1, Exactly(0)),
            NodeKind::ExpressionStatement | NodeKind::Default => Arity::new(0, Exactly(1)),
            NodeKind::Null | NodeKind::Continue | NodeKind::Break => Arity::new(0, Exactly(0)),
            NodeKind::Labeled => Arity::new(1, Exactly(1)),
            NodeKind::Case | NodeKind::Switch | NodeKind::While | NodeKind::Do => {
                Arity::new(0, Exactly(2))
            }
            NodeKind::If => Arity::new(1, FromArgs(2, &[0])),
            NodeKind::For => Arity::new(3, FromArgs(1, &[0, 1, 2])),
            NodeKind::Goto => Arity::new(1, Exactly(0)),
            NodeKind::Return => Arity::new(1, FromArgs(0, &[0])),
        }
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            NodeKind::Identifier
                | NodeKind::IntegerLiteral
                | NodeKind::FloatingLiteral
                | NodeKind::StringLiteral
                | NodeKind::NullLiteral
                | NodeKind::Subscript
                | NodeKind::Call
                | NodeKind::Member
                | NodeKind::Cast
                | NodeKind::Unary
                | NodeKind::Binary
                | NodeKind::Ternary
                | NodeKind::Initializer
        )
    }

    pub fn is_statement(self) -> bool {
        !self.is_expression()
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            NodeKind::IntegerLiteral
                | NodeKind::FloatingLiteral
                | NodeKind::StringLiteral
                | NodeKind::NullLiteral
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_kinds_carry_type_and_category() {
        for kind in NodeKind::ALL {
            if kind.is_expression() {
                assert!(kind.arity().args >= 2, "{kind:?}");
            }
        }
    }

    #[test]
    fn test_operator_items_round_trip() {
        for op in BinaryOp::ALL {
            assert_eq!(BinaryOp::from_item(op.to_item()), op);
        }
        for op in UnaryOp::ALL {
            assert_eq!(UnaryOp::from_item(op.to_item()), op);
        }
    }

    #[test]
    fn test_compound_assignment_underlying() {
        assert_eq!(BinaryOp::ShlAssign.underlying(), Some(BinaryOp::Shl));
        assert_eq!(BinaryOp::Assign.underlying(), None);
        assert!(BinaryOp::OrAssign.is_assignment());
        assert!(!BinaryOp::Comma.is_assignment());
    }

    #[test]
    fn test_span_join() {
        let a = Span::new(SourceLocation::new(1, 1), SourceLocation::new(1, 3));
        let b = Span::new(SourceLocation::new(2, 5), SourceLocation::new(2, 9));
        assert_eq!(a.to(b), Span::new(a.start, b.end));
    }
}
