use mq_os::Pcg32;

use crate::config::Config;
use crate::selection::{HandleIds, Selection};

// -----------------------------------------------------------------------------
// StickRandom

/// Sticky random selection, the default policy.
///
/// The handle keeps `K` sticky sub-queue indices. Each has a countdown
/// sampled from a geometric distribution with mean `stickiness`; a
/// successful operation decrements it, expiry or any failure redraws the
/// index. Pushes rotate through the slots so both (all) sticky sub-queues
/// receive inserts.
///
/// Sticky indices are kept pairwise distinct (by rejection) whenever the
/// queue has at least `K` sub-queues, so a pop really compares `K`
/// different tops.
pub struct StickRandom<const K: usize = 2> {
    rng: Pcg32,
    num_queues: usize,
    stickiness: u32,
    index: [usize; K],
    uses_left: [u32; K],
    push_slot: usize,
}

/// Shared state of [`StickRandom`]: just the handle-id dispenser.
#[derive(Debug, Default)]
pub struct StickShared {
    ids: HandleIds,
}

impl<const K: usize> StickRandom<K> {
    /// Redraws the sticky index of `slot` and resamples its countdown.
    fn redraw(&mut self, slot: usize) {
        self.uses_left[slot] = self.rng.geometric(self.stickiness);
        loop {
            let pick = self.rng.below(self.num_queues);
            let collides = self.num_queues >= K
                && (0..K).any(|other| other != slot && self.index[other] == pick);
            if !collides {
                self.index[slot] = pick;
                return;
            }
        }
    }

    /// Decrements the countdown of `slot`, redrawing on expiry.
    fn consume(&mut self, slot: usize) {
        if self.uses_left[slot] == 0 {
            self.redraw(slot);
        } else {
            self.uses_left[slot] -= 1;
        }
    }
}

impl<const K: usize> Selection for StickRandom<K> {
    type Shared = StickShared;
    type Candidates = [usize; K];

    fn shared(_num_queues: usize) -> StickShared {
        StickShared {
            ids: HandleIds::new(),
        }
    }

    fn attach(shared: &StickShared, num_queues: usize, config: &Config) -> Self {
        const { assert!(K > 0, "at least one pop candidate") };
        let id = shared.ids.next();
        let mut policy = Self {
            rng: Pcg32::new(config.seed, u64::from(id)),
            num_queues,
            stickiness: config.stickiness,
            // usize::MAX never collides with a drawn index.
            index: [usize::MAX; K],
            uses_left: [0; K],
            push_slot: 0,
        };
        for slot in 0..K {
            policy.redraw(slot);
        }
        policy
    }

    fn push_queue(&mut self, _shared: &StickShared) -> usize {
        self.index[self.push_slot]
    }

    fn reset_push_queue(&mut self, _shared: &StickShared) {
        self.redraw(self.push_slot);
    }

    fn use_push_queue(&mut self, _shared: &StickShared) {
        self.consume(self.push_slot);
        self.push_slot = (self.push_slot + 1) % K;
    }

    fn pop_queues(&mut self, _shared: &StickShared) -> [usize; K] {
        self.index
    }

    fn reset_pop_queues(&mut self, _shared: &StickShared) {
        for slot in 0..K {
            self.redraw(slot);
        }
    }

    fn use_pop_queues(&mut self, _shared: &StickShared) {
        for slot in 0..K {
            self.consume(slot);
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
