//! The §7 runtime error list: one `thiserror` variant each, every one fatal.
//! Unlike scanner/parser diagnostics (reported, counted, recovered from),
//! a `RuntimeError` always tears down the interpreter — there is no
//! user-visible exception construct besides `return`.

use lotus_gc::GcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("type mismatch: {message}")]
    TypeMismatch { message: String, line: u32 },

    #[error("undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String, line: u32 },

    #[error("'{name}' is not a function")]
    NotAFunction { name: String, line: u32 },

    #[error("'{name}' expected {expected} argument(s), got {got}")]
    ArityMismatch { name: String, expected: usize, got: usize, line: u32 },

    #[error("closures cannot be compared")]
    ClosureComparison { line: u32 },

    #[error("stack overflow")]
    StackOverflow { line: u32 },

    #[error("'return' outside a function")]
    ReturnOutsideFunction { line: u32 },

    #[error("forwarding operator requires a call on its right-hand side")]
    ForwardTargetNotACall { line: u32 },

    #[error(transparent)]
    Gc(#[from] GcError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Source line the diagnostic should be reported against, when one is
    /// known — `Gc` wraps an internal slab error with no source position.
    pub fn line(&self) -> Option<u32> {
        match self {
            RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::UndeclaredIdentifier { line, .. }
            | RuntimeError::NotAFunction { line, .. }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::ClosureComparison { line }
            | RuntimeError::StackOverflow { line }
            | RuntimeError::ReturnOutsideFunction { line }
            | RuntimeError::ForwardTargetNotACall { line } => Some(*line),
            RuntimeError::Gc(_) | RuntimeError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
