use alloc::sync::Arc;

use mq_os::atomic::{AtomicU64, Ordering::Relaxed};
use mq_seq::{Element, RingQueue};

use crate::config::Config;
use crate::counters::Counters;
use crate::handle::{Handle, PushError};
use crate::multiqueue::MultiQueue;
use crate::selection::{Selection, StickRandom};

// -----------------------------------------------------------------------------
// Stamped

/// A FIFO element: a payload with its insertion tick.
///
/// The tick is the sort key, so the multiqueue machinery that pops
/// "smallest key first" pops "oldest first" here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stamped<T> {
    /// Position in the global insertion order.
    pub tick: u64,
    /// The stored payload.
    pub item: T,
}

impl<T: Clone> Element for Stamped<T> {
    type Key = u64;

    #[inline]
    fn sort_key(&self) -> u64 {
        self.tick
    }
}

// -----------------------------------------------------------------------------
// MultiFifo

/// A relaxed concurrent FIFO: the multiqueue core over bounded rings,
/// ordered by insertion tick.
///
/// Ticks come from one shared counter, so "oldest first" is meaningful
/// across sub-queues; like the priority order of
/// [`MultiQueue`](crate::MultiQueue), it is approximate under concurrency.
/// Each sub-queue is a bounded ring; pushes into a full structure fail
/// with [`PushError`] after scanning all rings for room.
///
/// # Examples
///
/// ```
/// use mq_core::{Config, MultiFifo};
///
/// // One sub-queue: an exact FIFO. More sub-queues relax the order.
/// let config = Config {
///     queues_per_thread: 1,
///     ..Config::default()
/// };
/// let fifo = MultiFifo::<&str>::new(1, 64, config);
/// let mut handle = fifo.handle();
///
/// handle.push("first").unwrap();
/// handle.push("second").unwrap();
/// assert_eq!(handle.try_pop(), Some("first"));
/// ```
pub struct MultiFifo<T: Clone, S: Selection = StickRandom> {
    queue: MultiQueue<RingQueue<Stamped<T>>, S>,
    clock: Arc<AtomicU64>,
}

impl<T: Clone, S: Selection> MultiFifo<T, S> {
    /// Creates a FIFO sized for `num_threads` workers whose sub-queues
    /// hold `capacity_per_queue` elements each (rounded up to a power of
    /// two).
    ///
    /// # Panics
    ///
    /// Panics if `num_threads`, `config.queues_per_thread`, or
    /// `capacity_per_queue` is zero.
    pub fn new(num_threads: usize, capacity_per_queue: usize, config: Config) -> Self {
        let queue = MultiQueue::with_queues(num_threads, config, || {
            RingQueue::with_capacity(capacity_per_queue)
        });
        Self {
            queue,
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a fresh handle. Call once per worker thread.
    pub fn handle(&self) -> FifoHandle<T, S> {
        FifoHandle {
            inner: self.queue.handle(),
            clock: Arc::clone(&self.clock),
        }
    }

    /// The number of sub-queues.
    pub fn num_queues(&self) -> usize {
        self.queue.num_queues()
    }

    /// Empties every sub-queue. The tick clock keeps running.
    pub fn clear(&self) {
        self.queue.clear();
    }
}

// -----------------------------------------------------------------------------
// FifoHandle

/// A per-thread endpoint of a [`MultiFifo`].
pub struct FifoHandle<T: Clone, S: Selection> {
    inner: Handle<RingQueue<Stamped<T>>, S>,
    clock: Arc<AtomicU64>,
}

impl<T: Clone, S: Selection> FifoHandle<T, S> {
    /// Appends an item.
    ///
    /// Fails only when every sub-queue is at capacity; the item comes
    /// back in the error.
    pub fn push(&mut self, item: T) -> Result<(), PushError<T>> {
        let tick = self.clock.fetch_add(1, Relaxed);
        self.inner
            .push(Stamped { tick, item })
            .map_err(|PushError(stamped)| PushError(stamped.item))
    }

    /// Removes an approximately oldest item.
    pub fn try_pop(&mut self) -> Option<T> {
        self.inner.try_pop().map(|stamped| stamped.item)
    }

    /// This handle's operation statistics.
    pub fn stats(&self) -> Counters {
        self.inner.stats()
    }

    /// Resets the statistics to zero.
    pub fn reset_stats(&mut self) {
        self.inner.reset_stats();
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(all(test, feature = "std"))]
mod tests {
    use alloc::vec::Vec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::scope;

    use crate::{Config, MultiFifo, PushError};

    fn single_queue_config() -> Config {
        Config {
            queues_per_thread: 1,
            ..Config::default()
        }
    }

    #[test]
    fn single_sub_queue_is_strict_fifo() {
        let fifo = MultiFifo::<u64>::new(1, 128, single_queue_config());
        assert_eq!(fifo.num_queues(), 1);
        let mut handle = fifo.handle();
        for v in 0..100 {
            handle.push(v).unwrap();
        }
        for want in 0..100 {
            assert_eq!(handle.try_pop(), Some(want));
        }
        assert_eq!(handle.try_pop(), None);
    }

    #[test]
    fn capacity_one_alternates() {
        let fifo = MultiFifo::<u64>::new(1, 1, single_queue_config());
        let mut handle = fifo.handle();
        for v in 0..10 {
            handle.push(v).unwrap();
            assert_eq!(handle.push(v + 100), Err(PushError(v + 100)));
            assert_eq!(handle.try_pop(), Some(v));
        }
    }

    #[test]
    fn full_structure_rejects_then_recovers() {
        // 4 rings of capacity 1: exactly 4 items fit, wherever the policy
        // tries first, thanks to the push scan.
        let fifo = MultiFifo::<u64>::new(1, 1, Config::default());
        assert_eq!(fifo.num_queues(), 4);
        let mut handle = fifo.handle();
        for v in 0..4 {
            handle.push(v).unwrap();
        }
        assert_eq!(handle.push(99), Err(PushError(99)));

        let mut got: Vec<u64> = (0..4).map(|_| handle.try_pop().unwrap()).collect();
        assert_eq!(handle.try_pop(), None);
        got.sort_unstable();
        assert!(got.into_iter().eq(0..4));

        handle.push(99).unwrap();
        assert_eq!(handle.try_pop(), Some(99));
    }

    #[test]
    fn ticks_keep_popping_oldest_first_per_queue() {
        // One sub-queue: global FIFO. Interleave pushes and pops.
        let fifo = MultiFifo::<u64>::new(1, 8, single_queue_config());
        let mut handle = fifo.handle();
        handle.push(0).unwrap();
        handle.push(1).unwrap();
        assert_eq!(handle.try_pop(), Some(0));
        handle.push(2).unwrap();
        assert_eq!(handle.try_pop(), Some(1));
        assert_eq!(handle.try_pop(), Some(2));
    }

    #[test]
    fn clear_then_pop_is_none() {
        let fifo = MultiFifo::<u64>::new(1, 16, Config::default());
        let mut handle = fifo.handle();
        for v in 0..20 {
            handle.push(v).unwrap();
        }
        fifo.clear();
        assert_eq!(handle.try_pop(), None);
        // Ticks stay monotone across a clear.
        handle.push(7).unwrap();
        assert_eq!(handle.try_pop(), Some(7));
    }

    #[test]
    fn concurrent_conservation() {
        const THREADS: usize = 4;
        #[cfg(miri)]
        const PER_THREAD: usize = 100;
        #[cfg(not(miri))]
        const PER_THREAD: usize = 5_000;

        let fifo = MultiFifo::<u64>::new(THREADS, PER_THREAD.next_power_of_two(), Config::default());
        let total = THREADS * PER_THREAD;

        scope(|s| {
            for t in 0..THREADS {
                let fifo = &fifo;
                s.spawn(move || {
                    let mut handle = fifo.handle();
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
            for _ in 0..THREADS {
                let fifo = &fifo;
                let popped = &popped;
                workers.push(s.spawn(move || {
                    let mut handle = fifo.handle();
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
        all.sort_unstable();
        assert!(all.into_iter().eq(0..total as u64));
    }

    #[test]
    fn quiescent_pop_order_is_monotone_with_full_cover() {
        // With K = P the candidate set covers every ring, so a single
        // popper after quiescence extracts strictly by tick; payloads
        // encode (thread, sequence) to check it per source.
        const THREADS: usize = 2;
        const PER_THREAD: usize = 500;
        let fifo =
            MultiFifo::<u64, crate::StickRandom<8>>::new(THREADS, 1024, Config::default());
        assert_eq!(fifo.num_queues(), 8);

        scope(|s| {
            for t in 0..THREADS {
                let fifo = &fifo;
                s.spawn(move || {
                    let mut handle = fifo.handle();
                    for i in 0..PER_THREAD as u64 {
                        handle.push(((t as u64) << 32) | i).unwrap();
                    }
                });
            }
        });

        let mut handle = fifo.handle();
        let mut last_seen = [None::<u64>; THREADS];
        let mut count = 0;
        while let Some(v) = handle.try_pop() {
            let thread = (v >> 32) as usize;
            let seq = v & 0xFFFF_FFFF;
            if let Some(prev) = last_seen[thread] {
                assert!(seq > prev, "thread {thread}: {seq} after {prev}");
            }
            last_seen[thread] = Some(seq);
            count += 1;
        }
        assert_eq!(count, THREADS * PER_THREAD);
    }
}
