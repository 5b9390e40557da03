use alloc::boxed::Box;

use mq_os::atomic::{AtomicUsize, Ordering::Relaxed};
use mq_os::{CachePadded, Pcg32};

use crate::config::Config;
use crate::selection::{HandleIds, Selection};

/// In-flight marker: a slot being swapped by its owning handle.
const SWAPPING: usize = usize::MAX;

// -----------------------------------------------------------------------------
// SwapAssignment

/// Sticky selection over a shared permutation table.
///
/// The table holds every sub-queue index exactly once; handle `id` owns
/// the `K` consecutive slots starting at `K * id` and operates on the
/// sub-queues those slots currently map to. Since the table is a
/// permutation, no two handles ever share an assignment.
///
/// Redrawing a slot swaps its value with a uniformly chosen other slot via
/// a three-step protocol: mark the own slot as [`SWAPPING`], install the
/// old value into the victim slot by CAS, then store the victim's old
/// value into the own slot. Handles whose slots are swapped from outside
/// adopt the new assignment on their next query.
pub struct SwapAssignment<const K: usize = 2> {
    rng: Pcg32,
    num_queues: usize,
    stickiness: u32,
    /// First own slot in the table (`K * id`).
    base: usize,
    /// Cached values of the own slots.
    index: [usize; K],
    uses_left: [u32; K],
    push_slot: usize,
}

/// Shared state of [`SwapAssignment`]: the permutation table.
#[derive(Debug)]
pub struct SwapShared {
    ids: HandleIds,
    permutation: Box<[CachePadded<AtomicUsize>]>,
}

impl SwapShared {
    /// Current table contents; a valid permutation of `0..len` at any
    /// quiescent point.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> alloc::vec::Vec<usize> {
        self.permutation
            .iter()
            .map(|slot| slot.load(Relaxed))
            .collect()
    }
}

impl<const K: usize> SwapAssignment<K> {
    /// Swaps the own slot `slot` with a random victim and resamples the
    /// countdown.
    fn redraw(&mut self, slot: usize, shared: &SwapShared) {
        self.uses_left[slot] = self.rng.geometric(self.stickiness);
        let own = &shared.permutation[self.base + slot];
        if own
            .compare_exchange(self.index[slot], SWAPPING, Relaxed, Relaxed)
            .is_err()
        {
            // Someone swapped our slot from outside; the next refresh
            // adopts their assignment, no swap needed. Only the owner may
            // mark a slot as swapping.
            return;
        }
        loop {
            let victim = self.rng.below(self.num_queues);
            let assigned = shared.permutation[victim].load(Relaxed);
            if assigned == SWAPPING {
                continue;
            }
            if shared.permutation[victim]
                .compare_exchange(assigned, self.index[slot], Relaxed, Relaxed)
                .is_ok()
            {
                own.store(assigned, Relaxed);
                self.index[slot] = assigned;
                return;
            }
        }
    }

    /// Adopts an externally swapped assignment for `slot`.
    fn refresh(&mut self, slot: usize, shared: &SwapShared) {
        let current = shared.permutation[self.base + slot].load(Relaxed);
        if current != self.index[slot] {
            self.index[slot] = current;
            self.uses_left[slot] = self.rng.geometric(self.stickiness);
        }
    }

    fn consume(&mut self, slot: usize, shared: &SwapShared) {
        if self.uses_left[slot] == 0 {
            self.redraw(slot, shared);
        } else {
            self.uses_left[slot] -= 1;
        }
    }
}

impl<const K: usize> Selection for SwapAssignment<K> {
    type Shared = SwapShared;
    type Candidates = [usize; K];

    fn shared(num_queues: usize) -> SwapShared {
        SwapShared {
            ids: HandleIds::new(),
            permutation: (0..num_queues)
                .map(|index| CachePadded::new(AtomicUsize::new(index)))
                .collect(),
        }
    }

    fn attach(shared: &SwapShared, num_queues: usize, config: &Config) -> Self {
        const { assert!(K > 0, "at least one pop candidate") };
        let id = shared.ids.next() as usize;
        let base = K * id;
        assert!(
            base + K <= num_queues,
            "swap assignment supports at most num_queues / K handles"
        );
        let mut policy = Self {
            rng: Pcg32::new(config.seed, id as u64),
            num_queues,
            stickiness: config.stickiness,
            base,
            index: [0; K],
            uses_left: [0; K],
            push_slot: 0,
        };
        for slot in 0..K {
            policy.index[slot] = shared.permutation[base + slot].load(Relaxed);
            policy.uses_left[slot] = policy.rng.geometric(policy.stickiness);
        }
        policy
    }

    fn push_queue(&mut self, shared: &SwapShared) -> usize {
        self.refresh(self.push_slot, shared);
        self.index[self.push_slot]
    }

    fn reset_push_queue(&mut self, shared: &SwapShared) {
        self.redraw(self.push_slot, shared);
    }

    fn use_push_queue(&mut self, shared: &SwapShared) {
        self.consume(self.push_slot, shared);
        self.push_slot = (self.push_slot + 1) % K;
    }

    fn pop_queues(&mut self, shared: &SwapShared) -> [usize; K] {
        for slot in 0..K {
            self.refresh(slot, shared);
        }
        self.index
    }

    fn reset_pop_queues(&mut self, shared: &SwapShared) {
        for slot in 0..K {
            self.redraw(slot, shared);
        }
    }

    fn use_pop_queues(&mut self, shared: &SwapShared) {
        for slot in 0..K {
            self.consume(slot, shared);
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
