use alloc::boxed::Box;
use alloc::sync::Arc;

use mq_os::CachePadded;
use mq_seq::SeqQueue;

use crate::config::Config;
use crate::guard::Guard;
use crate::handle::Handle;
use crate::selection::{Selection, StickRandom};

// -----------------------------------------------------------------------------
// Core

/// The shared state behind every handle: the guard array, the policy's
/// cross-handle data, and the configuration.
pub(crate) struct Core<Q: SeqQueue, S: Selection> {
    pub(crate) guards: Box<[CachePadded<Guard<Q>>]>,
    pub(crate) selection: S::Shared,
    pub(crate) config: Config,
}

// -----------------------------------------------------------------------------
// MultiQueue

/// A relaxed concurrent priority queue over `P = c * num_threads`
/// sub-queues.
///
/// The root owns the guards and the selection policy's shared data and
/// vends per-thread [`Handle`]s; all pushing and popping happens through
/// handles. See the [crate docs](crate) for the semantics.
///
/// `Q` is the sequential container inside each guard, `S` the selection
/// policy. The aliases [`BufferedQueue`](crate::BufferedQueue) and
/// [`HeapQueue`](crate::HeapQueue) cover the common container choices.
///
/// # Examples
///
/// ```
/// use mq_core::{Config, HeapQueue};
///
/// let queue = HeapQueue::<u64>::new(2, Config::default());
/// assert_eq!(queue.num_queues(), 8);
///
/// let mut handle = queue.handle();
/// handle.push(3).unwrap();
/// assert_eq!(handle.try_pop(), Some(3));
/// assert_eq!(handle.try_pop(), None);
/// ```
pub struct MultiQueue<Q: SeqQueue, S: Selection = StickRandom> {
    core: Arc<Core<Q, S>>,
}

impl<Q: SeqQueue, S: Selection> MultiQueue<Q, S> {
    /// Creates a queue sized for `num_threads` workers with default
    /// containers.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` or `config.queues_per_thread` is zero.
    pub fn new(num_threads: usize, config: Config) -> Self
    where
        Q: Default,
    {
        Self::with_queues(num_threads, config, Q::default)
    }

    /// Creates a queue whose sub-queue containers come from `make`, for
    /// containers that need construction arguments (ring capacities).
    ///
    /// The sub-queue count `c * num_threads` is rounded up to the next
    /// power of two so index masking works for every policy.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` or `config.queues_per_thread` is zero.
    pub fn with_queues(num_threads: usize, config: Config, mut make: impl FnMut() -> Q) -> Self {
        assert!(num_threads > 0, "need at least one thread");
        assert!(
            config.queues_per_thread > 0,
            "need at least one sub-queue per thread"
        );
        let num_queues = (num_threads * config.queues_per_thread).next_power_of_two();
        log::debug!(
            "creating multiqueue: {num_queues} sub-queues for {num_threads} threads \
             (c = {})",
            config.queues_per_thread
        );
        let guards = (0..num_queues)
            .map(|_| CachePadded::new(Guard::new(make())))
            .collect();
        Self {
            core: Arc::new(Core {
                guards,
                selection: S::shared(num_queues),
                config,
            }),
        }
    }

    /// Creates a fresh handle. Call once per worker thread.
    pub fn handle(&self) -> Handle<Q, S> {
        Handle::new(Arc::clone(&self.core))
    }

    /// The number of sub-queues.
    pub fn num_queues(&self) -> usize {
        self.core.guards.len()
    }

    /// Whether every sub-queue currently looks empty.
    ///
    /// A lock-free observation over the cached top keys; under concurrent
    /// use it may be outdated by the time it returns.
    pub fn is_empty(&self) -> bool {
        self.core.guards.iter().all(|guard| guard.is_empty())
    }

    /// The configuration this queue was built with.
    pub fn config(&self) -> &Config {
        &self.core.config
    }

    /// Empties every sub-queue.
    ///
    /// Waits for each guard's lock in turn; concurrent pushers may refill
    /// sub-queues that were already cleared.
    pub fn clear(&self) {
        log::debug!("clearing {} sub-queues", self.core.guards.len());
        for guard in self.core.guards.iter() {
            loop {
                if let Some(mut locked) = guard.try_lock() {
                    locked.clear();
                    break;
                }
                core::hint::spin_loop();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn selection_shared(&self) -> &S::Shared {
        &self.core.selection
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(all(test, feature = "std"))]
mod tests {
    use alloc::vec::Vec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::scope;

    use mq_os::Pcg32;
    use mq_seq::{BufferedHeap, DaryHeap};

    use crate::selection::{GlobalPermutation, Random, Selection, StickRandom, SwapAssignment};
    use crate::{BufferedQueue, Config, HeapQueue, MultiQueue};

    #[cfg(miri)]
    const PER_THREAD: usize = 200;
    #[cfg(not(miri))]
    const PER_THREAD: usize = 10_000;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn empty_pop_returns_none() {
        let queue = BufferedQueue::<u64>::new(1, config());
        assert_eq!(queue.num_queues(), 4);
        assert!(queue.is_empty());
        let mut handle = queue.handle();
        assert_eq!(handle.try_pop(), None);
        assert!(handle.stats().empty_pop > 0);
        assert_eq!(handle.stats().locked_pop, 0);
    }

    #[test]
    fn push_then_pop_round_trips() {
        let queue = BufferedQueue::<u64>::new(1, config());
        let mut handle = queue.handle();
        handle.push(17).unwrap();
        assert!(!queue.is_empty());
        assert_eq!(handle.try_pop(), Some(17));
        assert_eq!(handle.try_pop(), None);
        assert!(queue.is_empty());
    }

    // With K = P the candidate set covers every sub-queue, so a single
    // handle sees the true minimum and the sequential limit is strict
    // priority order.
    fn sequential_exact<S: Selection>(input: impl Iterator<Item = u64> + Clone) {
        let queue = MultiQueue::<BufferedHeap<u64>, S>::new(1, config());
        assert_eq!(queue.num_queues(), 4);
        let mut handle = queue.handle();
        let mut expected: Vec<u64> = input.clone().collect();
        for v in input {
            handle.push(v).unwrap();
        }
        expected.sort_unstable();
        for want in expected {
            assert_eq!(handle.try_pop(), Some(want));
        }
        assert_eq!(handle.try_pop(), None);
    }

    #[test]
    fn sequential_ascending_is_sorted() {
        sequential_exact::<StickRandom<4>>(0..1000);
    }

    #[test]
    fn sequential_descending_is_sorted() {
        sequential_exact::<StickRandom<4>>((0..1000).rev());
    }

    #[test]
    fn sequential_exact_under_global_permutation() {
        sequential_exact::<GlobalPermutation<4>>(0..1000);
        sequential_exact::<GlobalPermutation<4>>((0..1000).rev());
    }

    #[test]
    fn single_sub_queue_is_a_plain_priority_queue() {
        let queue = BufferedQueue::<u64>::new(
            1,
            Config {
                queues_per_thread: 1,
                ..config()
            },
        );
        assert_eq!(queue.num_queues(), 1);
        let mut handle = queue.handle();
        for v in (0..500).rev() {
            handle.push(v).unwrap();
        }
        for want in 0..500 {
            assert_eq!(handle.try_pop(), Some(want));
        }
        assert_eq!(handle.try_pop(), None);
    }

    #[test]
    fn clear_then_pop_is_none() {
        let queue = BufferedQueue::<u64>::new(1, config());
        let mut handle = queue.handle();
        for v in 0..100 {
            handle.push(v).unwrap();
        }
        queue.clear();
        assert_eq!(handle.try_pop(), None);
    }

    fn concurrent_conservation<S: Selection>(threads: usize, strict: bool) {
        let queue = MultiQueue::<BufferedHeap<u64>, S>::new(
            threads,
            Config {
                strict_comparison: strict,
                ..config()
            },
        );
        let total = threads * PER_THREAD;

        // Disjoint ranges in, then pop until the global count says done.
        scope(|s| {
            for t in 0..threads {
                let queue = &queue;
                s.spawn(move || {
                    let mut handle = queue.handle();
                    let base = (t * PER_THREAD) as u64;
                    for i in 0..PER_THREAD as u64 {
                        handle.push(base + i).unwrap();
                    }
                });
            }
        });

        let popped = AtomicUsize::new(0);
        let mut buckets: Vec<Vec<u64>> = Vec::new();
        scope(|s| {
            let mut workers = Vec::new();
            for _ in 0..threads {
                let queue = &queue;
                let popped = &popped;
                workers.push(s.spawn(move || {
                    let mut handle = queue.handle();
                    let mut local = Vec::new();
                    while popped.load(Ordering::Relaxed) < total {
                        if let Some(v) = handle.try_pop() {
                            popped.fetch_add(1, Ordering::Relaxed);
                            local.push(v);
                        }
                    }
                    local
                }));
            }
            for worker in workers {
                buckets.push(worker.join().unwrap());
            }
        });

        let mut all: Vec<u64> = buckets.into_iter().flatten().collect();
        assert_eq!(all.len(), total);
        all.sort_unstable();
        // No duplicates, no losses: exactly 0..total.
        assert!(all.iter().copied().eq(0..total as u64));
    }

    #[test]
    fn conservation_stick_random() {
        concurrent_conservation::<StickRandom>(8, false);
    }

    #[test]
    fn conservation_random() {
        concurrent_conservation::<Random>(4, false);
    }

    #[test]
    fn conservation_swap_assignment() {
        concurrent_conservation::<SwapAssignment>(4, false);
    }

    #[test]
    fn conservation_global_permutation() {
        concurrent_conservation::<GlobalPermutation>(4, false);
    }

    #[test]
    fn conservation_strict_mode() {
        concurrent_conservation::<StickRandom>(4, true);
    }

    #[test]
    fn interleaved_churn_conserves() {
        const THREADS: usize = 4;
        #[cfg(miri)]
        const OPS: usize = 500;
        #[cfg(not(miri))]
        const OPS: usize = 25_000;

        let queue = HeapQueue::<u64>::new(THREADS, config());
        let mut per_thread: Vec<(Vec<u64>, Vec<u64>)> = Vec::new();

        scope(|s| {
            let mut workers = Vec::new();
            for t in 0..THREADS {
                let queue = &queue;
                workers.push(s.spawn(move || {
                    let mut handle = queue.handle();
                    let mut rng = Pcg32::new(7, t as u64);
                    let mut pushed = Vec::new();
                    let mut popped = Vec::new();
                    for _ in 0..OPS {
                        // 60% pushes, 40% pops. Thread id in the upper bits
                        // keeps pushed values globally unique.
                        if rng.below(10) < 6 {
                            let v = ((t as u64) << 32) | u64::from(rng.next_u32());
                            handle.push(v).unwrap();
                            pushed.push(v);
                        } else if let Some(v) = handle.try_pop() {
                            popped.push(v);
                        }
                    }
                    (pushed, popped)
                }));
            }
            for worker in workers {
                per_thread.push(worker.join().unwrap());
            }
        });

        let mut pushed: Vec<u64> = Vec::new();
        let mut popped: Vec<u64> = Vec::new();
        for (pu, po) in per_thread {
            pushed.extend(pu);
            popped.extend(po);
        }

        // Quiescent now: drain the remainder single-threaded.
        let mut handle = queue.handle();
        let mut drained = Vec::new();
        while let Some(v) = handle.try_pop() {
            drained.push(v);
        }

        assert_eq!(pushed.len(), popped.len() + drained.len());
        popped.extend(drained);
        pushed.sort_unstable();
        popped.sort_unstable();
        assert_eq!(pushed, popped);
    }

    #[test]
    fn swap_assignment_trace_is_deterministic_and_permutation_safe() {
        let run = || {
            let queue =
                MultiQueue::<BufferedHeap<u64>, SwapAssignment>::new(1, config());
            let mut handle = queue.handle();
            let mut trace = Vec::new();
            for v in 0..5000u64 {
                handle.push(v).unwrap();
            }
            for _ in 0..5000 {
                trace.push(handle.try_pop().unwrap());
                let mut table = queue.selection_shared().snapshot();
                table.sort_unstable();
                assert!(table.into_iter().eq(0..queue.num_queues()));
            }
            trace
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn scan_finds_stragglers_when_disabled_pops_miss() {
        // With scanning disabled and pop_tries = 1, a single sticky pair
        // may legitimately miss the one loaded sub-queue.
        let queue = BufferedQueue::<u64>::new(
            1,
            Config {
                scan_on_failed_pop: false,
                ..config()
            },
        );
        let mut handle = queue.handle();
        handle.push(1).unwrap();
        let mut found = 0;
        for _ in 0..1000 {
            if let Some(v) = handle.try_pop() {
                assert_eq!(v, 1);
                found += 1;
            }
        }
        assert_eq!(found, 1);
    }

    #[test]
    fn stats_observe_contention_free_run() {
        let queue = BufferedQueue::<u64>::new(1, config());
        let mut handle = queue.handle();
        for v in 0..100 {
            handle.push(v).unwrap();
        }
        while handle.try_pop().is_some() {}
        let stats = handle.stats();
        assert_eq!(stats.locked_push, 0);
        assert_eq!(stats.locked_pop, 0);
        assert!(stats.empty_pop > 0);
        handle.reset_stats();
        assert_eq!(handle.stats(), crate::Counters::default());
    }

    #[test]
    fn handles_are_independent() {
        let queue = BufferedQueue::<u64>::new(2, config());
        let mut a = queue.handle();
        let mut b = queue.handle();
        a.push(1).unwrap();
        b.push(2).unwrap();
        let mut got = [a.try_pop().unwrap(), b.try_pop().unwrap()];
        got.sort_unstable();
        assert_eq!(got, [1, 2]);
    }

    #[test]
    #[should_panic(expected = "at least one thread")]
    fn zero_threads_panics() {
        let _ = HeapQueue::<u64, StickRandom>::new(0, config());
    }

    #[test]
    fn single_pop_candidate_degenerates_to_sticky_queue() {
        let queue = MultiQueue::<BufferedHeap<u64>, StickRandom<1>>::new(1, config());
        let mut handle = queue.handle();
        for v in 0..200 {
            handle.push(v).unwrap();
        }
        let mut got = Vec::new();
        while let Some(v) = handle.try_pop() {
            got.push(v);
        }
        got.sort_unstable();
        assert!(got.into_iter().eq(0..200));
    }

    #[test]
    fn dary_heap_container_works_too() {
        let queue = MultiQueue::<DaryHeap<u64>, StickRandom<4>>::new(1, config());
        let mut handle = queue.handle();
        for v in [5u64, 1, 4, 2, 3] {
            handle.push(v).unwrap();
        }
        for want in 1..=5 {
            assert_eq!(handle.try_pop(), Some(want));
        }
    }
}
