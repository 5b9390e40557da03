use alloc::sync::Arc;

use mq_seq::{Element, SeqQueue, SortKey};
use thiserror::Error;

use crate::counters::Counters;
use crate::guard::KeyOf;
use crate::multiqueue::Core;
use crate::selection::Selection;

/// How many times the fallback scan restarts after losing a race before
/// the pop reports empty. Single-threaded, one round always suffices.
const SCAN_ROUNDS: usize = 8;

// -----------------------------------------------------------------------------
// PushError

/// A push found every sub-queue at capacity.
///
/// Only bounded containers (the multi-FIFO rings) can produce this; the
/// rejected value is handed back.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("every sub-queue is at capacity")]
pub struct PushError<T>(pub T);

// -----------------------------------------------------------------------------
// Handle

/// A per-thread endpoint of a [`MultiQueue`](crate::MultiQueue).
///
/// A handle owns its selection-policy state and statistics and must not be
/// shared between threads; create one handle per thread instead. Dropping
/// a handle is trivial, and handles keep the shared structure alive.
pub struct Handle<Q: SeqQueue, S: Selection> {
    core: Arc<Core<Q, S>>,
    policy: S,
    counters: Counters,
}

/// Outcome of one best-of-k attempt.
enum Attempt<T> {
    Popped(T),
    /// All candidates showed the sentinel.
    Empty,
    /// Lost a lock race or the candidate went stale; retriable.
    Contended,
}

impl<Q: SeqQueue, S: Selection> Handle<Q, S> {
    pub(crate) fn new(core: Arc<Core<Q, S>>) -> Self {
        let policy = S::attach(&core.selection, core.guards.len(), &core.config);
        Self {
            core,
            policy,
            counters: Counters::default(),
        }
    }

    /// Inserts a value into some sub-queue.
    ///
    /// Retries on lock contention with freshly selected targets; a *full*
    /// target (bounded containers only) falls back to one scan over all
    /// sub-queues and surfaces [`PushError`] if none has room.
    ///
    /// The value's key must not be the sentinel.
    pub fn push(&mut self, value: Q::Elem) -> Result<(), PushError<Q::Elem>> {
        let mut value = value;
        loop {
            let index = self.policy.push_queue(&self.core.selection);
            let Some(mut locked) = self.core.guards[index].try_lock() else {
                self.counters.locked_push += 1;
                self.policy.reset_push_queue(&self.core.selection);
                continue;
            };
            match locked.push(value) {
                Ok(()) => {
                    drop(locked);
                    self.policy.use_push_queue(&self.core.selection);
                    return Ok(());
                }
                Err(rejected) => {
                    drop(locked);
                    self.policy.reset_push_queue(&self.core.selection);
                    value = rejected;
                    return self.scan_push(value);
                }
            }
        }
    }

    /// Removes an approximately smallest element.
    ///
    /// Runs up to [`Config::pop_tries`](crate::Config::pop_tries) best-of-k
    /// rounds, then (unless disabled) one bounded fallback scan over all
    /// sub-queues. `None` means every examined sub-queue looked empty; in a
    /// concurrent setting that observation may already be outdated, so
    /// callers that require quiescence should treat `None` as retriable.
    pub fn try_pop(&mut self) -> Option<Q::Elem> {
        for _ in 0..self.core.config.pop_tries {
            if let Some(value) = self.pop_best() {
                return Some(value);
            }
            self.policy.reset_pop_queues(&self.core.selection);
        }
        if self.core.config.scan_on_failed_pop {
            self.scan_pop()
        } else {
            None
        }
    }

    /// This handle's operation statistics.
    pub fn stats(&self) -> Counters {
        self.counters
    }

    /// Resets the statistics to zero.
    pub fn reset_stats(&mut self) {
        self.counters = Counters::default();
    }

    /// Best-of-k pop: loops until it pops or observes all candidates
    /// empty, reselecting after every lost race.
    fn pop_best(&mut self) -> Option<Q::Elem> {
        loop {
            let candidates = self.policy.pop_queues(&self.core.selection);
            match self.try_candidates(candidates.as_ref()) {
                Attempt::Popped(value) => {
                    self.policy.use_pop_queues(&self.core.selection);
                    return Some(value);
                }
                Attempt::Empty => return None,
                Attempt::Contended => {
                    self.policy.reset_pop_queues(&self.core.selection);
                }
            }
        }
    }

    /// One attempt over a fixed candidate set.
    fn try_candidates(&mut self, candidates: &[usize]) -> Attempt<Q::Elem> {
        debug_assert!(!candidates.is_empty());
        let mut best = candidates[0];
        let mut best_key = self.core.guards[best].top_key();
        for &index in &candidates[1..] {
            let key = self.core.guards[index].top_key();
            if key.before(best_key) {
                best = index;
                best_key = key;
            }
        }
        if best_key.is_sentinel() {
            self.counters.empty_pop += 1;
            return Attempt::Empty;
        }
        let Some(mut locked) = self.core.guards[best].try_lock() else {
            self.counters.locked_pop += 1;
            return Attempt::Contended;
        };
        let stale = locked.is_empty()
            || (self.core.config.strict_comparison
                && locked
                    .top()
                    .is_some_and(|top| top.sort_key().to_bits() != best_key.to_bits()));
        if stale {
            drop(locked);
            self.counters.stale_pop += 1;
            return Attempt::Contended;
        }
        match locked.pop() {
            Some(value) => Attempt::Popped(value),
            None => {
                // Emptied between the check and the pop is impossible under
                // the lock; defensive bookkeeping only.
                self.counters.stale_pop += 1;
                Attempt::Contended
            }
        }
    }

    /// Fallback: observe every guard, pop from the best.
    fn scan_pop(&mut self) -> Option<Q::Elem> {
        log::trace!(
            "best-of-k pop failed, scanning {} sub-queues",
            self.core.guards.len()
        );
        for _ in 0..SCAN_ROUNDS {
            let mut best: Option<(usize, KeyOf<Q>)> = None;
            for (index, guard) in self.core.guards.iter().enumerate() {
                let key = guard.top_key();
                if key.is_sentinel() {
                    continue;
                }
                match best {
                    Some((_, incumbent)) if !key.before(incumbent) => {}
                    _ => best = Some((index, key)),
                }
            }
            let Some((index, observed)) = best else {
                self.counters.empty_pop += 1;
                return None;
            };
            let Some(mut locked) = self.core.guards[index].try_lock() else {
                self.counters.locked_pop += 1;
                continue;
            };
            let stale = locked.is_empty()
                || (self.core.config.strict_comparison
                    && locked
                        .top()
                        .is_some_and(|top| top.sort_key().to_bits() != observed.to_bits()));
            if stale {
                drop(locked);
                self.counters.stale_pop += 1;
                continue;
            }
            if let Some(value) = locked.pop() {
                return Some(value);
            }
            self.counters.stale_pop += 1;
        }
        None
    }

    /// Fallback for a full push target: take any sub-queue with room.
    fn scan_push(&mut self, value: Q::Elem) -> Result<(), PushError<Q::Elem>> {
        log::trace!(
            "push target full, scanning {} sub-queues for room",
            self.core.guards.len()
        );
        let mut value = value;
        for guard in self.core.guards.iter() {
            let Some(mut locked) = guard.try_lock() else {
                self.counters.locked_push += 1;
                continue;
            };
            match locked.push(value) {
                Ok(()) => return Ok(()),
                Err(rejected) => value = rejected,
            }
        }
        Err(PushError(value))
    }
}
