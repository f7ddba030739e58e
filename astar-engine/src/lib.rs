//! A fixed-capacity, allocation-free A* search engine.
//!
//! [`AstarState`] owns a versioned slot table sized once up front; each
//! [`AstarState::find`] call reuses that table across queries by
//! bumping an internal epoch rather than clearing it, so the per-query
//! cost scales with the region actually explored, not the table's
//! capacity. The caller supplies graph structure through a neighbor
//! callback describing the edges out of a coordinate, not a stored
//! graph, which keeps the engine domain-agnostic: grids, navmeshes,
//! and abstract state spaces all go through the same driver.

pub mod error;
pub mod neighbor;
mod open_list;
mod search;
mod slot;
mod table;

pub use error::EngineError;
pub use neighbor::{Neighbor, NEIGHBOR_MAX};
pub use search::AstarState;
pub use slot::Coord;

/// Initializes the `env_logger` backend for the `log` facade this crate
/// emits through. Safe to call more than once; only the first call has
/// any effect.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
