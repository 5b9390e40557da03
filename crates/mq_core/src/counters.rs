use core::ops::AddAssign;

// -----------------------------------------------------------------------------
// Counters

/// Per-handle operation statistics.
///
/// Counting is cheap (plain per-thread integers, no atomics), so the
/// counters are always maintained. Sum the counters of all handles for a
/// whole-queue picture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Counters {
    /// Push attempts that found the selected sub-queue locked.
    pub locked_push: u64,

    /// Pop attempts whose candidates all showed the empty sentinel.
    pub empty_pop: u64,

    /// Pop attempts that found the best candidate locked.
    pub locked_pop: u64,

    /// Pop attempts whose locked candidate turned out empty or, in strict
    /// mode, no longer held the observed top key.
    pub stale_pop: u64,
}

impl AddAssign for Counters {
    fn add_assign(&mut self, rhs: Self) {
        self.locked_push += rhs.locked_push;
        self.empty_pop += rhs.empty_pop;
        self.locked_pop += rhs.locked_pop;
        self.stale_pop += rhs.stale_pop;
    }
}

// -----------------------------------------------------------------------------
// Tests
