//! Error taxonomy for the generation core.
//!
//! Every error here is fatal to the compilation unit being generated: the
//! caller is expected to abort that unit and report the error. Resolution
//! ambiguity is deliberately *not* an error — a losing symbol is emitted
//! fully qualified instead.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EmitError>;

/// Fatal errors raised while generating a compilation unit.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The scanner saw a `}` with no matching open block. The scanner only
    /// ever consumes the generator's own output, so this is an internal bug
    /// in the caller's emission sequence.
    #[error("block end with no open block in emitted text")]
    UnexpectedBlockEnd,

    /// A string or character literal was still open when the unit ended.
    #[error("unterminated {0} literal in emitted text")]
    UnterminatedLiteral(&'static str),

    /// The unit ended with one or more blocks still open.
    #[error("compilation unit ended with {0} unclosed block(s)")]
    UnclosedBlocks(usize),

    /// A scope key was inserted at a level no open scope can hold.
    #[error("no open scope accepts a {0}-level key")]
    NoEligibleScope(&'static str),

    /// The innermost scope was closed more times than it was opened.
    #[error("attempted to close the file scope")]
    ClosedFileScope,

    /// A reference to a symbol the type model flags as unresolvable.
    /// Emitting it would guarantee downstream compilation failure, so the
    /// reference is rejected before any text lands.
    #[error("cannot reference unresolvable type '{0}'")]
    UnresolvableReference(String),
}
