//! The intrusive, ascending-by-`fscore` open list: a singly-linked
//! chain threaded through `Slot::next`. No heap, no allocation, just
//! index splicing over the table's own slot array.

use crate::slot::Slot;

/// Inserts `idx` (not currently in the list) in ascending-`fscore`
/// order. Ties land after existing equal-`fscore` entries, except at
/// the head: an insert whose `fscore` is `<=` the current head's
/// becomes the new head. Returns the new head.
pub(crate) fn insert(slots: &mut [Slot], head: Option<usize>, idx: usize) -> usize {
    let Some(head_idx) = head else {
        slots[idx].next = None;
        return idx;
    };

    if slots[idx].fscore <= slots[head_idx].fscore {
        slots[idx].next = Some(head_idx);
        return idx;
    }

    let mut current = head_idx;
    loop {
        match slots[current].next {
            None => {
                slots[current].next = Some(idx);
                slots[idx].next = None;
                break;
            }
            Some(next_idx) => {
                if slots[idx].fscore <= slots[next_idx].fscore {
                    slots[idx].next = Some(next_idx);
                    slots[current].next = Some(idx);
                    break;
                }
                current = next_idx;
            }
        }
    }
    head_idx
}

/// Decrease-key: `idx` is already linked into the list rooted at
/// `head` and its `fscore` has just been lowered. Finds its
/// predecessor, unlinks it in one splice ("unlink at known position"),
/// then reinserts it with the ordinary ordered-insert logic. A no-op
/// if `idx` is already the head. Returns the new head.
pub(crate) fn advance(slots: &mut [Slot], head: usize, idx: usize) -> usize {
    if idx == head {
        return head;
    }

    let mut pred = head;
    while slots[pred].next != Some(idx) {
        let Some(next) = slots[pred].next else {
            debug_assert!(false, "advance: target slot is not linked into the given open list");
            return head;
        };
        pred = next;
    }
    let successor = slots[idx].next;
    slots[pred].next = successor; // unlink at a known position, no re-scan needed

    insert(slots, Some(head), idx)
}
