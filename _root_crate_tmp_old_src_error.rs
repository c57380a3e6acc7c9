//! Domain error types.
//!
//! `EndOfSet` is a control signal (§7): unit sets use it to tell the tree
//! iterator "no further unit at this level", and the iterator converts it
//! into a structural "no child"/"no sibling" rather than propagating it as a
//! failure. `TrailError` covers the actual fatal domain failures: trail
//! underflow, I/O/parse failure, and the θ-compatible-states sanity
//! assertion.

use thiserror::Error;

/// Signals that a unit set has no further unit at the current level.
/// Not a failure — the tree iterator treats this as "no child"/"no sibling".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfSet;

/// Fatal domain failures.
#[derive(Debug, Error)]
pub enum TrailError {
    #[error("cannot prepop past the initial two-round trail core")]
    PrepopUnderflow,

    #[error("could not read trail file {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("theta-compatible-states max_weight {0} exceeds sanity bound of 100")]
    MaxWeightTooLarge(u32),
}


