//! Queue-selection policies.
//!
//! A policy decides which sub-queues a handle touches: one target for a
//! push, a small candidate set for a pop. The handle reports back through
//! the `use_*` hooks after every success and the `reset_*` hooks after a
//! failure (lock contention, stale top, full target), which is all a
//! policy sees of the outside world.
//!
//! Four policies share the contract:
//!
//! - [`Random`] : fresh uniform indices on every call, no state.
//! - [`StickRandom`] : sticky indices kept for a geometrically distributed
//!   number of operations (the default).
//! - [`SwapAssignment`] : sticky indices drawn from a shared permutation
//!   table mutated by atomic swaps, so no two handles share a sub-queue
//!   assignment.
//! - [`GlobalPermutation`] : all handles derive their sub-queues from one
//!   shared affine permutation word, refreshed by whoever's countdown
//!   expires first.

use mq_os::atomic::{AtomicU32, Ordering::Relaxed};

use crate::config::Config;

mod global_permutation;
mod random;
mod stick_random;
mod swap_assignment;

pub use global_permutation::{GlobalPermutation, PermutationShared};
pub use random::{Random, RandomShared};
pub use stick_random::{StickRandom, StickShared};
pub use swap_assignment::{SwapAssignment, SwapShared};

// -----------------------------------------------------------------------------
// Selection

/// A queue-selection policy, attached once per handle.
///
/// `Shared` is the policy's cross-handle state, owned by the multiqueue
/// root; everything else lives in the per-handle policy value, so no
/// method ever blocks on another thread.
pub trait Selection: Sized {
    /// State shared by all handles of one multiqueue.
    type Shared: Send + Sync;

    /// The pop candidate set, typically `[usize; 2]`.
    type Candidates: AsRef<[usize]>;

    /// Creates the shared state for a queue with `num_queues` sub-queues.
    fn shared(num_queues: usize) -> Self::Shared;

    /// Binds a new handle. Allocates the handle id and seeds its
    /// generator stream.
    fn attach(shared: &Self::Shared, num_queues: usize, config: &Config) -> Self;

    /// The sub-queue the next push should target.
    fn push_queue(&mut self, shared: &Self::Shared) -> usize;

    /// The push target was locked or full; select differently next time.
    fn reset_push_queue(&mut self, shared: &Self::Shared);

    /// A push through the current target succeeded.
    fn use_push_queue(&mut self, shared: &Self::Shared);

    /// The candidate sub-queues for the next pop.
    fn pop_queues(&mut self, shared: &Self::Shared) -> Self::Candidates;

    /// The pop attempt failed; select differently next time.
    fn reset_pop_queues(&mut self, shared: &Self::Shared);

    /// A pop through the current candidates succeeded.
    fn use_pop_queues(&mut self, shared: &Self::Shared);
}

// -----------------------------------------------------------------------------
// HandleIds

/// Monotone handle-id dispenser embedded in every policy's shared state.
#[derive(Debug, Default)]
pub(crate) struct HandleIds {
    next: AtomicU32,
}

impl HandleIds {
    pub(crate) const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    pub(crate) fn next(&self) -> u32 {
        self.next.fetch_add(1, Relaxed)
    }
}
