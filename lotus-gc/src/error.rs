//! Typed errors for the value heap.
//!
//! In practice every `ValueId` handed back by `Gc::alloc` stays valid until
//! the slot it names is actually swept, and nothing in `lotus-eval` holds a
//! `ValueId` past the point where it stopped being a root. So this error is
//! not expected to occur on any of the paths `lotus-eval` drives — it exists
//! so that a slab-corruption bug surfaces as a typed `Result`, not a panic.

use thiserror::Error;

use crate::value::ValueId;

#[derive(Debug, Error)]
pub enum GcError {
    #[error("value {0:?} does not name a live heap slot")]
    InvalidValueId(ValueId),
}

pub type Result<T> = std::result::Result<T, GcError>;
