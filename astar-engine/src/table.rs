//! The versioned slot table: a power-of-two-sized, open-addressed hash
//! map where liveness is expressed by comparing a per-slot epoch
//! against the table's current epoch, rather than by clearing slots
//! between queries.

use crate::error::EngineError;
use crate::slot::{Coord, Slot};

/// Result of probing the table for a coordinate: either the slot that
/// already holds it, or the slot a fresh insert should land in.
pub(crate) enum Probe {
    Hit(usize),
    Empty(usize),
}

pub(crate) struct SlotTable {
    slots: Vec<Slot>,
    pow2: u32,
    epoch: u32,
}

impl SlotTable {
    /// Smallest power of two not less than `max(1024, extent * extent)`.
    /// Since the engine owns its backing store rather than
    /// reinterpreting a caller-provided byte buffer, the quantity
    /// returned is a slot count, not a byte count.
    pub fn required_capacity(extent: u32) -> usize {
        let area = u64::from(extent) * u64::from(extent);
        let mut capacity: u64 = 1024;
        while capacity < area.max(1024) {
            capacity *= 2;
        }
        capacity as usize
    }

    /// Allocates a table sized to the smallest power of two at least
    /// `capacity`. Fails if that power of two is below `2^8`, the
    /// minimum live capacity the table will accept.
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        let rounded = capacity.max(1).next_power_of_two();
        let pow2 = rounded.trailing_zeros();
        if pow2 < 8 {
            return Err(EngineError::CapacityTooSmall {
                requested: capacity,
                minimum: 1 << 8,
            });
        }
        Ok(Self {
            slots: vec![Slot::default(); rounded],
            pow2,
            epoch: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        1usize << self.pow2
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Starts a new query: increments the epoch, and on wraparound
    /// re-sweeps every slot so none is mistaken for live under the
    /// reused epoch value.
    pub fn begin_query(&mut self) -> u32 {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            let stale = self.epoch.wrapping_sub(1);
            for slot in &mut self.slots {
                slot.epoch = stale;
            }
            log::warn!(
                "astar-engine: epoch counter wrapped, resweeping {} slots",
                self.slots.len()
            );
        }
        self.epoch
    }

    fn hash_index(&self, coord: Coord) -> usize {
        let h = 2654435761u32.wrapping_mul(coord.0);
        let shifted = h >> (32 - self.pow2);
        (shifted as usize) & (self.capacity() - 1)
    }

    /// Probes for `coord` starting at its hash slot, linearly advancing
    /// on collision. Guaranteed to terminate: the caller never lets
    /// live occupancy exceed half the capacity.
    pub fn find_slot(&self, coord: Coord) -> Probe {
        let mut idx = self.hash_index(coord);
        loop {
            let slot = &self.slots[idx];
            if slot.epoch == self.epoch {
                if slot.coord == coord {
                    return Probe::Hit(idx);
                }
            } else {
                return Probe::Empty(idx);
            }
            idx = (idx + 1) & (self.capacity() - 1);
        }
    }

    pub fn slot(&self, idx: usize) -> &Slot {
        &self.slots[idx]
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        &mut self.slots[idx]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }
}
