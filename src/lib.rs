//! # Introduction
//!
//! rucfront is the front end of the RuC compiler. It reads a RuC translation
//! unit, checks it against the language's typing and scoping rules and
//! produces a typed syntax tree together with the tables a back end needs:
//! interned identifier spellings, types, declared identifiers and string
//! literals.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser ⇄ Builder → Tree + Tables → Module
//! ```
//!
//! 1. [`parser`]: tokenises the source and parses it by recursive descent.
//!    Diagnostics are collected; parsing always runs to the end of input.
//! 2. [`builder`]: validates every construct as it is parsed, inserts
//!    implicit conversions and folds constant operands.
//! 3. [`ast`]: the arena tree the builder appends to, with [`ast::Expr`]
//!    handles for typed expressions.
//! 4. [`tables`]: spellings, types and identifiers, all append-only.
//! 5. [`syntax`]: the [`syntax::Syntax`] bundle that owns all of the above.
//!
//! ## Example
//!
//! ```
//! use rucfront::{compile, FrontendOptions};
//!
//! let module = compile("int main() { return 2 * 21; }", &FrontendOptions::default()).unwrap();
//! assert!(!module.had_errors());
//! assert!(module.dump().contains("IntegerLiteral 42"));
//! ```

pub mod ast;
pub mod builder;
pub mod config;
pub mod errors;
pub mod parser;
pub mod stack;
pub mod syntax;
pub mod tables;

pub use config::FrontendOptions;
pub use errors::{Diagnostic, ErrorKind, Warning, WarningKind};
pub use parser::{LexError, Module, Parser};
pub use syntax::Syntax;

/// Parses and checks `source` as one translation unit.
///
/// Only a lexical error stops compilation early. Every other problem is
/// reported through [`Module::errors`].
pub fn compile(source: &str, options: &FrontendOptions) -> Result<Module, LexError> {
    let parser = Parser::with_options(source, options.clone())?;
    Ok(parser.parse_translation_unit())
}
