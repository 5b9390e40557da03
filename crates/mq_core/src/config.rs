// -----------------------------------------------------------------------------
// Config

/// Runtime parameters of a multiqueue.
///
/// The number of pop candidates, the heap arity, and the buffer sizes are
/// compile-time parameters of the policy and container types; everything
/// that can vary per instance lives here.
///
/// # Examples
///
/// ```
/// use mq_core::Config;
///
/// let config = Config {
///     stickiness: 4,
///     ..Config::default()
/// };
/// assert_eq!(config.queues_per_thread, 4);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Base seed for the per-handle generators. Two queues built with the
    /// same seed and driven by the same schedule make the same choices.
    pub seed: u64,

    /// Sub-queues per thread (`c`). The total sub-queue count is
    /// `c * num_threads`, rounded up to the next power of two.
    pub queues_per_thread: usize,

    /// Average number of operations a sticky policy keeps using the same
    /// sub-queue assignment.
    pub stickiness: u32,

    /// How many best-of-k rounds a pop attempts before it either gives up
    /// or falls back to the linear scan.
    pub pop_tries: u32,

    /// Whether a failed pop falls back to scanning every sub-queue before
    /// reporting the queue as empty.
    pub scan_on_failed_pop: bool,

    /// In strict mode a pop re-checks under the lock that the top key it
    /// observed is still the container's top key and retries elsewhere if
    /// not. Lenient mode (the default) pops whatever is there, trading a
    /// little ordering quality for throughput.
    pub strict_comparison: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 1,
            queues_per_thread: 4,
            stickiness: 16,
            pop_tries: 1,
            scan_on_failed_pop: true,
            strict_comparison: false,
        }
    }
}
