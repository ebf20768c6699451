//! Stack growth for the recursive-descent parser
//!
//! Nested parentheses, blocks and declarators recurse without bound, so the
//! statement and unary-expression entry points run inside
//! [`ensure_sufficient_stack`].

/// Remaining stack below which a new segment is allocated
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
