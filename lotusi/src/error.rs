//! Top-level error type for the `lotusi` binary, aggregating I/O and the
//! phase-specific errors (`lotus-eval::RuntimeError`) the same way the
//! teacher workspace's own CLI driver error enums do.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Runtime(#[from] lotus_eval::RuntimeError),

    /// §7: "Any `ERROR` count > 0 aborts before evaluation." The scanner
    /// and parser already reported every individual diagnostic through the
    /// `Handler`; this variant just carries the abort decision.
    #[error("{0} error(s) reported, aborting before evaluation")]
    CompileErrors(u32),
}

pub type Result<T> = std::result::Result<T, InterpError>;
