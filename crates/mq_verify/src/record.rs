// -----------------------------------------------------------------------------
// Op

/// The two logged operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// A successful push.
    Insert,
    /// A successful pop.
    Delete,
}

// -----------------------------------------------------------------------------
// Record

/// One logged queue operation.
///
/// An inserted element is identified by its inserting thread and that
/// thread's running insert count `(src_thread, seq)`; a delete names the
/// element it extracted through the same pair. Ticks come from any shared
/// monotone counter sampled before an insert and after a delete, so that
/// a delete's tick always exceeds its insert's.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    /// Operation kind.
    pub op: Op,
    /// The acting thread.
    pub thread: u32,
    /// Sample of the shared tick counter.
    pub tick: u64,
    /// The element's key.
    pub key: u64,
    /// The thread that inserted the element.
    pub src_thread: u32,
    /// The element's position in `src_thread`'s insert order.
    pub seq: u64,
}

impl Record {
    /// A push record. The inserting thread is the acting thread.
    pub fn insert(thread: u32, tick: u64, key: u64, seq: u64) -> Self {
        Self {
            op: Op::Insert,
            thread,
            tick,
            key,
            src_thread: thread,
            seq,
        }
    }

    /// A pop record naming the extracted element.
    pub fn delete(thread: u32, tick: u64, key: u64, src_thread: u32, seq: u64) -> Self {
        Self {
            op: Op::Delete,
            thread,
            tick,
            key,
            src_thread,
            seq,
        }
    }
}
