//! Symbol and type tables
//!
//! - [`repr`]: interned spellings of identifiers
//! - [`types`]: the append-only table of composite type descriptors
//! - [`idents`]: declared identifiers and their scopes
//!
//! All three are append-only. Handles into them stay valid for the whole
//! compilation, so tree nodes can store them as plain integers.

pub mod idents;
pub mod repr;
pub mod types;

pub use idents::{DeclareError, Ident, IdentId, IdentKind, IdentTable};
pub use repr::{ReprId, ReprTable};
pub use types::{TypeClass, TypeRef, TypeTable};

/// Scalar slot stored in type descriptors and tree node arguments
pub type Item = i64;
