//! The A* driver: expands nodes from the open list, relaxes edges
//! through the caller's neighbor callback, and reconstructs the
//! predecessor chain on termination.

use log::{debug, info, warn};

use crate::error::EngineError;
use crate::neighbor::{Neighbor, NEIGHBOR_MAX};
use crate::open_list;
use crate::slot::Coord;
use crate::table::{Probe, SlotTable};

/// Owns the fixed-capacity working set for repeated A* queries. One
/// `AstarState` is constructed once and reused across queries: each
/// `find` call bumps the internal epoch instead of clearing the table.
pub struct AstarState {
    table: SlotTable,
    terminal: Option<usize>,
    path_len: i64,
}

impl AstarState {
    /// How large a capacity to allocate to search a grid (or any
    /// graph) whose live node count will not exceed the implied
    /// capacity.
    pub fn required_capacity(extent: u32) -> usize {
        SlotTable::required_capacity(extent)
    }

    /// Allocates its own backing store sized to the smallest power of
    /// two at least `capacity`; fails if that is below `2^8` live
    /// slots.
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        Ok(Self {
            table: SlotTable::new(capacity)?,
            terminal: None,
            path_len: 0,
        })
    }

    /// Convenience constructor chaining `required_capacity` with `new`
    /// for the common grid case. `required_capacity` always floors at
    /// `1024 = 2^10 >= 2^8`, so this never fails.
    pub fn for_extent(extent: u32) -> Self {
        Self::new(Self::required_capacity(extent))
            .expect("required_capacity always yields a valid capacity")
    }

    /// Runs one query from `start` to `goal`, invoking `neighbor_fn` to
    /// expand each popped node. Returns a signed path length: `> 0`
    /// goal reached, `< 0` best-effort (budget exhausted or
    /// unreachable with a frontier fallback), `0` no progress possible.
    pub fn find<F>(&mut self, start: Coord, goal: Coord, mut neighbor_fn: F) -> i64
    where
        F: FnMut(Coord, &mut [Neighbor; NEIGHBOR_MAX]) -> usize,
    {
        let epoch = self.table.begin_query();
        let budget = self.table.capacity() / 2;
        debug!(
            "astar: query start epoch={epoch} start={start} goal={goal} budget={budget}"
        );

        let start_idx = match self.table.find_slot(start) {
            Probe::Hit(idx) | Probe::Empty(idx) => idx,
        };
        {
            let slot = self.table.slot_mut(start_idx);
            slot.epoch = epoch;
            slot.coord = start;
            slot.gscore = 0;
            slot.fscore = 0;
            slot.camefrom = Some(start_idx);
            slot.next = None;
        }
        let mut open_head = Some(start_idx);
        let mut live_count = 1usize;

        loop {
            let Some(current_idx) = open_head else {
                self.terminal = None;
                self.path_len = 0;
                warn!("astar: open list exhausted before reaching {goal}; unreachable");
                return 0;
            };
            let current_coord = self.table.slot(current_idx).coord;

            if current_coord == goal {
                self.terminal = Some(current_idx);
                self.path_len = self.reconstruct_length(current_idx);
                info!("astar: goal reached, path length {}", self.path_len);
                return self.path_len;
            }

            let mut neighbors = [Neighbor::default(); NEIGHBOR_MAX];
            let reported = neighbor_fn(current_coord, &mut neighbors);
            let n = if reported > NEIGHBOR_MAX {
                warn!(
                    "astar: neighbor callback reported {reported} > {NEIGHBOR_MAX} neighbors for {current_coord}, clamping"
                );
                NEIGHBOR_MAX
            } else {
                reported
            };

            // Close the current node and advance the list head. Whether
            // the list is now empty is only known for certain once this
            // node's neighbors have been relaxed below, so the
            // unreachable check happens at the top of the next
            // iteration rather than here.
            let current_gscore = self.table.slot(current_idx).gscore;
            let current_next = self.table.slot(current_idx).next;
            self.table.slot_mut(current_idx).fscore = 0;
            open_head = current_next;

            for d in &neighbors[..n] {
                let tentative_g = current_gscore + d.dist;
                match self.table.find_slot(d.pos) {
                    Probe::Empty(idx) => {
                        let slot = self.table.slot_mut(idx);
                        slot.epoch = epoch;
                        slot.coord = d.pos;
                        slot.gscore = tentative_g;
                        slot.fscore = tentative_g + d.estimate;
                        slot.camefrom = Some(current_idx);
                        open_head = open_list::insert(self.table.slots_mut(), open_head, idx);
                        live_count += 1;
                    }
                    Probe::Hit(idx) => {
                        if tentative_g < self.table.slot(idx).gscore {
                            let was_open = self.table.slot(idx).fscore != 0;
                            {
                                let slot = self.table.slot_mut(idx);
                                slot.gscore = tentative_g;
                                slot.fscore = tentative_g + d.estimate;
                                slot.camefrom = Some(current_idx);
                            }
                            if was_open {
                                debug_assert!(
                                    open_head.is_some(),
                                    "a slot can only be open if the open list is non-empty"
                                );
                                if let Some(head) = open_head {
                                    open_head = Some(open_list::advance(self.table.slots_mut(), head, idx));
                                }
                            } else {
                                debug!(
                                    "astar: reopening closed node {} at cheaper gscore {tentative_g}",
                                    d.pos
                                );
                                open_head = open_list::insert(self.table.slots_mut(), open_head, idx);
                            }
                        }
                    }
                }
            }

            if let Some(frontier) = open_head {
                if live_count > budget {
                    self.terminal = Some(frontier);
                    self.path_len = -self.reconstruct_length(frontier);
                    warn!(
                        "astar: budget exhausted at {live_count} live slots (cap/2={budget}), best-effort path length {}",
                        self.path_len
                    );
                    return self.path_len;
                }
            }
        }
    }

    /// Walks `camefrom` from `terminal` until `gscore == 0` (the
    /// start), counting links.
    fn reconstruct_length(&self, terminal: usize) -> i64 {
        let mut idx = terminal;
        let mut count: i64 = 1;
        while self.table.slot(idx).gscore != 0 {
            let Some(prev) = self.table.slot(idx).camefrom else {
                debug_assert!(false, "live slot missing camefrom");
                break;
            };
            idx = prev;
            count += 1;
        }
        count
    }

    /// Copies the last reconstructed path into `out`, truncated to the
    /// tail nearest the goal if `out` is shorter than the true path.
    /// Returns the true path length, which may exceed `out.len()`.
    pub fn path(&self, out: &mut [Coord]) -> usize {
        let Some(terminal) = self.terminal else {
            return 0;
        };
        let k = self.path_len.unsigned_abs() as usize;
        let fill = out.len().min(k);
        let mut idx = terminal;

        // Always walk back from the terminal, writing the highest
        // indices first. A buffer shorter than the true path therefore
        // ends up holding the tail closest to the goal, not the head
        // closest to the start.
        for i in (0..fill).rev() {
            out[i] = self.table.slot(idx).coord;
            let Some(prev) = self.table.slot(idx).camefrom else {
                debug_assert!(false, "reconstruction ran past start");
                break;
            };
            idx = prev;
        }
        k
    }

    /// Writes a gray-level heatmap of the currently-live region into a
    /// `width * height` byte buffer. `coord_to_point` maps an opaque
    /// coordinate to `(col, row)`, returning `None` for a coordinate
    /// that doesn't decode to a point at all; the engine does not
    /// interpret coordinates itself, so the mapping is a parameter
    /// rather than hard-coded. A decoded point still outside
    /// `width * height` is skipped. Returns the number of live slots.
    pub fn image(
        &self,
        out: &mut [u8],
        width: usize,
        height: usize,
        coord_to_point: impl Fn(Coord) -> Option<(usize, usize)>,
    ) -> usize {
        debug_assert_eq!(out.len(), width * height);
        for b in out.iter_mut() {
            *b = 0;
        }

        let epoch = self.table.epoch();
        let mut max_gscore = 0u32;
        let mut live_count = 0usize;
        for slot in self.table.slots() {
            if slot.epoch == epoch {
                live_count += 1;
                max_gscore = max_gscore.max(slot.gscore);
            }
        }
        if max_gscore == 0 {
            return live_count;
        }

        for slot in self.table.slots() {
            if slot.epoch != epoch {
                continue;
            }
            if let Some((col, row)) = coord_to_point(slot.coord) {
                if col < width && row < height {
                    let level = (u64::from(slot.gscore) * 255 / u64::from(max_gscore)) as u8;
                    out[row * width + col] = level;
                }
            }
        }
        live_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tiny `size x size` open grid with 4-neighbor unit-cost edges
    /// and a Manhattan-distance heuristic, used to exercise the driver
    /// without dragging in the demo crate's grid/rendering code.
    fn grid_neighbor_fn(size: u32, goal: Coord) -> impl FnMut(Coord, &mut [Neighbor; NEIGHBOR_MAX]) -> usize {
        move |coord, out| {
            let x = coord.0 >> 16;
            let y = coord.0 & 0xFFFF;
            let gx = goal.0 >> 16;
            let gy = goal.0 & 0xFFFF;
            let mut n = 0;
            let deltas: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
            for (dx, dy) in deltas {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx >= 0 && ny >= 0 && (nx as u32) < size && (ny as u32) < size {
                    let npos = Coord(((nx as u32) << 16) | (ny as u32));
                    let estimate = nx.abs_diff(gx as i64) as u32 + ny.abs_diff(gy as i64) as u32;
                    out[n] = Neighbor {
                        pos: npos,
                        dist: 1,
                        estimate,
                    };
                    n += 1;
                }
            }
            n
        }
    }

    #[test]
    fn straight_line_is_optimal() {
        let mut state = AstarState::for_extent(8);
        let start = Coord(0);
        let goal = Coord(4u32 << 16);
        let len = state.find(start, goal, grid_neighbor_fn(8, goal));
        assert_eq!(len, 5);
        let mut path = vec![Coord(0); 5];
        assert_eq!(state.path(&mut path), 5);
        assert_eq!(path[0], start);
        assert_eq!(path[4], goal);
    }

    #[test]
    fn start_equals_goal_returns_single_node_path() {
        let mut state = AstarState::for_extent(8);
        let start = Coord(0);
        let len = state.find(start, start, grid_neighbor_fn(8, start));
        assert_eq!(len, 1);
        let mut path = [Coord(0)];
        assert_eq!(state.path(&mut path), 1);
        assert_eq!(path[0], start);
    }

    #[test]
    fn blocked_start_returns_zero() {
        let mut state = AstarState::for_extent(8);
        let start = Coord(0);
        let goal = Coord(4u32 << 16);
        let len = state.find(start, goal, |_coord: Coord, _out: &mut [Neighbor; NEIGHBOR_MAX]| 0usize);
        assert_eq!(len, 0);
        let mut path = [Coord(0); 4];
        assert_eq!(state.path(&mut path), 0);
    }

    #[test]
    fn path_truncation_returns_tail_nearest_goal() {
        let mut state = AstarState::for_extent(8);
        let start = Coord(0);
        let goal = Coord(4u32 << 16);
        let len = state.find(start, goal, grid_neighbor_fn(8, goal));
        assert_eq!(len, 5);
        let mut tail = vec![Coord(0); 2];
        let reported = state.path(&mut tail);
        assert_eq!(reported, 5);
        assert_eq!(tail[1], goal);
    }

    #[test]
    fn reuse_across_queries_on_one_state_matches_fresh_state() {
        let mut shared = AstarState::for_extent(8);
        let mut results = Vec::new();
        for gx in 1..4u32 {
            let goal = Coord(gx << 16);
            let len = shared.find(Coord(0), goal, grid_neighbor_fn(8, goal));
            results.push(len);
        }
        for (i, gx) in (1..4u32).enumerate() {
            let mut fresh = AstarState::for_extent(8);
            let goal = Coord(gx << 16);
            let len = fresh.find(Coord(0), goal, grid_neighbor_fn(8, goal));
            assert_eq!(len, results[i]);
        }
    }

    #[test]
    fn reopening_a_closed_node_uses_the_cheaper_predecessor() {
        // Four nodes: start=0, y=1, x=2, goal=3.
        // Edges: start->y (cost 1), start->x (cost 3, a suboptimal
        // shortcut), x->goal (cost 1), y->x (cost 1, the cheap bridge).
        // True optimal path is start->y->x->goal, cost 3.
        //
        // h(y)=2 is admissible (true remaining from y is 2) but
        // inconsistent across the y->x edge: h(y)=2 > cost(y,x) + h(x)
        // = 1 + 0 = 1. Combined with the tie-breaking rule (an insert
        // whose fscore ties the head becomes the new head), this makes
        // `x` pop and close via the cost-3 direct route before `y` is
        // ever expanded. `x` must then be reopened once `y` reveals
        // the cost-2 route.
        let start = Coord(0);
        let y = Coord(1);
        let x = Coord(2);
        let goal = Coord(3);

        let h = move |c: Coord| -> u32 {
            match c {
                Coord(1) => 2, // y: admissible, but inconsistent over y->x
                Coord(2) => 0, // x: exact remaining cost
                Coord(3) => 0, // goal
                _ => unreachable!(),
            }
        };

        let mut state = AstarState::for_extent(4);
        let len = state.find(start, goal, move |c, out| -> usize {
            let mut n = 0;
            let mut push = |pos: Coord, dist: u32| {
                out[n] = Neighbor {
                    pos,
                    dist,
                    estimate: h(pos),
                };
                n += 1;
            };
            match c {
                Coord(0) => {
                    // Emission order matters for the head-tie rule: `y`
                    // first, then the competing `x`.
                    push(y, 1);
                    push(x, 3);
                }
                Coord(1) => push(x, 1),
                Coord(2) => push(goal, 1),
                Coord(3) => {}
                _ => unreachable!(),
            }
            n
        });

        assert_eq!(len, 4);
        let mut path = vec![Coord(0); 4];
        state.path(&mut path);
        assert_eq!(path, vec![start, y, x, goal]);
    }

    #[test]
    fn budget_fallback_returns_negative_length_with_valid_partial_path() {
        // A 1-D line long enough that the reachable region exceeds
        // cap/2 for the minimum-sized table (capacity 256, budget 128),
        // with no way to reach a goal that doesn't exist on the line.
        let mut state = AstarState::new(256).unwrap();
        let start = Coord(0);
        let goal = Coord(9_999);
        let neighbor_fn = |coord: Coord, out: &mut [Neighbor; NEIGHBOR_MAX]| -> usize {
            out[0] = Neighbor {
                pos: Coord(coord.0 + 1),
                dist: 1,
                estimate: goal.0.saturating_sub(coord.0 + 1),
            };
            1
        };
        let len = state.find(start, goal, neighbor_fn);
        assert!(len < 0, "expected budget-exhaustion fallback, got {len}");
        let k = len.unsigned_abs() as usize;
        let mut path = vec![Coord(0); k];
        assert_eq!(state.path(&mut path), k);
        assert_eq!(path[0], start);
        for w in path.windows(2) {
            assert_eq!(w[1].0, w[0].0 + 1);
        }
    }

    #[test]
    fn image_skips_non_live_and_out_of_bounds_slots() {
        let mut state = AstarState::for_extent(4);
        let goal = Coord(2u32 << 16 | 2);
        state.find(Coord(0), goal, grid_neighbor_fn(4, goal));
        let mut img = vec![0u8; 4 * 4];
        let live = state.image(&mut img, 4, 4, |c| Some(((c.0 >> 16) as usize, (c.0 & 0xFFFF) as usize)));
        assert!(live > 0);
        assert!(img.iter().any(|&b| b > 0));
    }
}
