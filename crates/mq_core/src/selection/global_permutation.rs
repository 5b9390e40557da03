use mq_os::atomic::{AtomicU64, Ordering::Relaxed};
use mq_os::{CachePadded, Pcg32};

use crate::config::Config;
use crate::selection::{HandleIds, Selection};

const SHIFT: u32 = 32;
const MASK: u64 = (1 << SHIFT) - 1;

// -----------------------------------------------------------------------------
// GlobalPermutation

/// Selection through one shared affine permutation.
///
/// A single 64-bit word encodes `(a, b)` with `a` odd in the low half.
/// Over a power-of-two queue count `P`, `i * a + b mod P` is then a
/// bijection, and handle `id` owns the images of `K * id + k` for
/// `k < K`. All handles share one countdown epoch: whichever handle's
/// countdown expires first publishes a fresh word by CAS, and the others
/// pick it up lazily on their next query.
///
/// After a failure the handle falls back to uniformly random indices
/// until the next success, so a locked or empty assignment does not pin
/// the handle down for a whole epoch.
pub struct GlobalPermutation<const K: usize = 2> {
    rng: Pcg32,
    num_queues: usize,
    stickiness: u32,
    /// Slot base: this handle permutes `K * id + k`.
    id: usize,
    /// Local copy of the shared word.
    local: u64,
    uses_left: i64,
    random_push: bool,
    random_pop: bool,
    push_slot: usize,
}

/// Shared state of [`GlobalPermutation`]: the permutation word.
#[derive(Debug)]
pub struct PermutationShared {
    ids: HandleIds,
    word: CachePadded<AtomicU64>,
}

impl<const K: usize> GlobalPermutation<K> {
    /// The sub-queue the local permutation assigns to own slot `slot`.
    fn slot_index(&self, slot: usize) -> usize {
        let a = self.local & MASK;
        let b = self.local >> SHIFT;
        debug_assert!(a & 1 == 1, "the multiplier must be odd");
        let i = (K * self.id + slot) as u64;
        (i.wrapping_mul(a).wrapping_add(b) & (self.num_queues as u64 - 1)) as usize
    }

    fn fresh_countdown(&mut self) -> i64 {
        // The countdown is shared between push and pop and pops consume K
        // at a time, so the epoch mean is doubled.
        i64::from(self.rng.geometric(self.stickiness.saturating_mul(2)))
    }

    /// Adopts a word published by another handle, if any.
    fn refresh(&mut self, shared: &PermutationShared) {
        let word = shared.word.load(Relaxed);
        if word != self.local {
            self.local = word;
            self.uses_left = self.fresh_countdown();
            self.random_push = false;
            self.random_pop = false;
        }
    }

    /// Publishes a fresh permutation word; loses gracefully to a
    /// concurrent publisher.
    fn republish(&mut self, shared: &PermutationShared) {
        let fresh =
            (u64::from(self.rng.next_u32()) << SHIFT) | u64::from(self.rng.next_u32()) | 1;
        match shared.word.compare_exchange(self.local, fresh, Relaxed, Relaxed) {
            Ok(_) => self.local = fresh,
            Err(current) => self.local = current,
        }
        self.uses_left = self.fresh_countdown();
        self.random_push = false;
        self.random_pop = false;
    }
}

impl<const K: usize> Selection for GlobalPermutation<K> {
    type Shared = PermutationShared;
    type Candidates = [usize; K];

    fn shared(_num_queues: usize) -> PermutationShared {
        PermutationShared {
            ids: HandleIds::new(),
            word: CachePadded::new(AtomicU64::new(1)),
        }
    }

    fn attach(shared: &PermutationShared, num_queues: usize, config: &Config) -> Self {
        const { assert!(K > 0, "at least one pop candidate") };
        assert!(
            num_queues.is_power_of_two(),
            "global permutation needs a power-of-two queue count"
        );
        let id = shared.ids.next() as usize;
        let mut policy = Self {
            rng: Pcg32::new(config.seed, id as u64),
            num_queues,
            stickiness: config.stickiness,
            id,
            local: shared.word.load(Relaxed),
            uses_left: 0,
            random_push: false,
            random_pop: false,
            push_slot: 0,
        };
        policy.uses_left = policy.fresh_countdown();
        policy
    }

    fn push_queue(&mut self, shared: &PermutationShared) -> usize {
        if self.random_push {
            return self.rng.below(self.num_queues);
        }
        self.refresh(shared);
        self.slot_index(self.push_slot)
    }

    fn reset_push_queue(&mut self, _shared: &PermutationShared) {
        self.random_push = true;
    }

    fn use_push_queue(&mut self, shared: &PermutationShared) {
        self.random_push = false;
        if self.uses_left <= 0 {
            self.republish(shared);
        } else {
            self.uses_left -= 1;
        }
        self.push_slot = (self.push_slot + 1) % K;
    }

    fn pop_queues(&mut self, shared: &PermutationShared) -> [usize; K] {
        if self.random_pop {
            return core::array::from_fn(|_| self.rng.below(self.num_queues));
        }
        self.refresh(shared);
        core::array::from_fn(|slot| self.slot_index(slot))
    }

    fn reset_pop_queues(&mut self, _shared: &PermutationShared) {
        self.random_pop = true;
    }

    fn use_pop_queues(&mut self, shared: &PermutationShared) {
        self.random_pop = false;
        if self.uses_left <= 0 {
            self.republish(shared);
        } else {
            self.uses_left -= K as i64;
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use mq_os::atomic::Ordering::Relaxed;

    use super::{GlobalPermutation, PermutationShared};
    use crate::config::Config;
    use crate::selection::Selection;

    fn attach(shared: &PermutationShared, num_queues: usize) -> GlobalPermutation<2> {
        GlobalPermutation::attach(shared, num_queues, &Config::default())
    }

    #[test]
    #[should_panic(expected = "power-of-two")]
    fn rejects_non_power_of_two() {
        let shared = GlobalPermutation::<2>::shared(6);
        let _ = attach(&shared, 6);
    }

    #[test]
    fn affine_map_is_a_bijection() {
        let shared = GlobalPermutation::<1>::shared(16);
        let config = Config::default();
        // 16 handles with K = 1 tile the whole index space.
        let mut images: Vec<usize> = (0..16)
            .map(|_| {
                let mut policy = GlobalPermutation::<1>::attach(&shared, 16, &config);
                policy.pop_queues(&shared)[0]
            })
            .collect();
        images.sort_unstable();
        assert_eq!(images, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn republish_rotates_the_word() {
        let shared = GlobalPermutation::<2>::shared(8);
        let mut policy = attach(&shared, 8);
        let before = shared.word.load(Relaxed);
        // Drive successes until the countdown expires and the word moves.
        let mut moved = false;
        for _ in 0..10_000 {
            policy.push_queue(&shared);
            policy.use_push_queue(&shared);
            if shared.word.load(Relaxed) != before {
                moved = true;
                break;
            }
        }
        assert!(moved);
        // The multiplier half stays odd.
        assert_eq!(shared.word.load(Relaxed) & 1, 1);
    }

    #[test]
    fn peers_adopt_published_words() {
        let shared = GlobalPermutation::<2>::shared(8);
        let mut publisher = attach(&shared, 8);
        let mut observer = attach(&shared, 8);
        for _ in 0..10_000 {
            publisher.push_queue(&shared);
            publisher.use_push_queue(&shared);
        }
        // Any observer query after a publish sees indices of the current
        // word.
        observer.pop_queues(&shared);
        assert_eq!(observer.local, shared.word.load(Relaxed));
    }

    #[test]
    fn reset_falls_back_to_random() {
        let shared = GlobalPermutation::<2>::shared(8);
        let mut policy = attach(&shared, 8);
        let sticky = policy.pop_queues(&shared);
        policy.reset_pop_queues(&shared);
        let mut diverged = false;
        for _ in 0..32 {
            if policy.pop_queues(&shared) != sticky {
                diverged = true;
                break;
            }
        }
        assert!(diverged);
        // The next success leaves random mode.
        policy.use_pop_queues(&shared);
        let settled = policy.pop_queues(&shared);
        assert_eq!(policy.pop_queues(&shared), settled);
    }
}
