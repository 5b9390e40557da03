use mq_os::Pcg32;

use crate::config::Config;
use crate::selection::{HandleIds, Selection};

// -----------------------------------------------------------------------------
// Random

/// Stateless selection: every query draws fresh uniform indices.
///
/// The baseline policy. No stickiness, no shared state beyond the id
/// dispenser, and the `reset`/`use` hooks are no-ops.
pub struct Random<const K: usize = 2> {
    rng: Pcg32,
    num_queues: usize,
}

/// Shared state of [`Random`]: just the handle-id dispenser.
#[derive(Debug, Default)]
pub struct RandomShared {
    ids: HandleIds,
}

impl<const K: usize> Selection for Random<K> {
    type Shared = RandomShared;
    type Candidates = [usize; K];

    fn shared(_num_queues: usize) -> RandomShared {
        RandomShared {
            ids: HandleIds::new(),
        }
    }

    fn attach(shared: &RandomShared, num_queues: usize, config: &Config) -> Self {
        let id = shared.ids.next();
        Self {
            rng: Pcg32::new(config.seed, u64::from(id)),
            num_queues,
        }
    }

    fn push_queue(&mut self, _shared: &RandomShared) -> usize {
        self.rng.below(self.num_queues)
    }

    fn reset_push_queue(&mut self, _shared: &RandomShared) {}

    fn use_push_queue(&mut self, _shared: &RandomShared) {}

    fn pop_queues(&mut self, _shared: &RandomShared) -> [usize; K] {
        core::array::from_fn(|_| self.rng.below(self.num_queues))
    }

    fn reset_pop_queues(&mut self, _shared: &RandomShared) {}

    fn use_pop_queues(&mut self, _shared: &RandomShared) {}
}

// -----------------------------------------------------------------------------
// Tests
