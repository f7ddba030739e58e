//! The neighbor-callback contract: for a queried coordinate, the caller
//! writes up to [`NEIGHBOR_MAX`] edges into a fixed-size array and
//! returns how many it wrote.

use crate::slot::Coord;

/// Maximum number of neighbor descriptors the callback may report in a
/// single call.
pub const NEIGHBOR_MAX: usize = 16;

/// One outgoing edge from the queried coordinate: where it leads
/// (`pos`), what it costs to get there (`dist`), and the callback's
/// heuristic estimate from `pos` to the goal (`estimate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Neighbor {
    pub pos: Coord,
    pub dist: u32,
    pub estimate: u32,
}
