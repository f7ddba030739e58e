//! Error type for `astar-engine`'s one fallible boundary operation.
//!
//! Everything else the engine does reports through `AstarState::find`'s
//! signed return; construction is the only place a caller can misuse
//! the library in a way that deserves a `Result` instead of a
//! `debug_assert!`.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The requested capacity rounds to a power of two smaller than
    /// `2^8`, the minimum live capacity the table will accept.
    #[error("requested capacity {requested} is too small; minimum live capacity is {minimum} slots (2^8)")]
    CapacityTooSmall { requested: usize, minimum: usize },
}
