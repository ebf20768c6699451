//! RuC source code parser
//!
//! This module turns RuC source text into the checked syntax tree:
//! - [`lexer`]: Tokenization (source text → tokens, identifiers interned)
//! - [`parse`]: The [`Parser`] driver, token helpers and error recovery
//! - `declarations`, `statements`, `expressions`: the grammar, as methods on
//!   [`Parser`]
//!
//! # Supported language
//!
//! - Types: `int`, `long`, `char`, `float`, `double`, `void`, pointers,
//!   arrays with an optional outermost bound, structs, enums, `typedef`,
//!   function types including function-type parameters
//! - Statements: all C statements including `switch`, labels and `goto`
//! - Expressions: C operators plus `abs` and `upb`
//! - Keywords in English or Russian spelling
//! - Preprocessor lines are skipped; the source is expected to be
//!   preprocessed already
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! There is no separate semantic pass: each construct is handed to the
//! [`Builder`](crate::builder::Builder) as soon as it is parsed. The parser
//! never stops at the first error; it reports it, skips to a synchronizing
//! token and continues.

mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use lexer::{LexError, Lexer, Token, TokenKind};
pub use parse::{Module, Parser};
