//! lotus-util - shared diagnostic plumbing.
//!
//! Every other crate in the workspace reports through the `Handler` here so
//! that the `[<SEVERITY>] message [Line: N]` contract stays identical across
//! the scanner, parser and evaluator.

pub mod diagnostic;

pub use diagnostic::{Diagnostic, Handler, Level};
