//! lotus-eval - the `Environment` and the tree-walking `Evaluator` that
//! drives the GC-managed heap from `lotus-gc` against parsed `lotus-par`
//! statements.

pub mod environment;
pub mod error;
pub mod evaluator;

pub use environment::Environment;
pub use error::{Result, RuntimeError};
pub use evaluator::Evaluator;
