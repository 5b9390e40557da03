use alloc::vec::Vec;

use foldhash::fast::RandomState;
use hashbrown::HashMap;
use thiserror::Error;

use crate::record::{Op, Record};

// -----------------------------------------------------------------------------
// VerifyError

/// The first inconsistency found in a log.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum VerifyError {
    #[error("thread id {thread} out of range ({num_threads} threads declared)")]
    ThreadOutOfRange { thread: u32, num_threads: u32 },

    #[error("insert by thread {thread} names thread {src_thread} as source")]
    ForeignInsert { thread: u32, src_thread: u32 },

    #[error("thread {thread} inserted seq {found}, expected seq {expected}")]
    InsertOutOfOrder { thread: u32, expected: u64, found: u64 },

    #[error("delete references unknown insert ({src_thread}, {seq})")]
    UnknownInsert { src_thread: u32, seq: u64 },

    #[error("delete of ({src_thread}, {seq}) carries key {found}, inserted as {expected}")]
    KeyMismatch {
        src_thread: u32,
        seq: u64,
        expected: u64,
        found: u64,
    },

    #[error("delete of ({src_thread}, {seq}) at tick {delete_tick} precedes its insert at tick {insert_tick}")]
    TickOrder {
        src_thread: u32,
        seq: u64,
        insert_tick: u64,
        delete_tick: u64,
    },

    #[error("element ({src_thread}, {seq}) extracted twice")]
    DoubleDelete { src_thread: u32, seq: u64 },
}

// -----------------------------------------------------------------------------
// Summary

/// Totals of a successfully verified log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Number of insert records.
    pub inserts: u64,
    /// Number of delete records.
    pub deletes: u64,
    /// Inserted but never deleted elements.
    pub live: u64,
}

// -----------------------------------------------------------------------------
// verify

#[derive(Debug)]
struct Inserted {
    key: u64,
    tick: u64,
    deleted: bool,
}

/// Replays a log and checks it for consistency.
///
/// Records must arrive in a causally consistent order — any order in
/// which an element's insert precedes its delete, such as sorted by tick.
/// The checks: thread ids are in range, each thread's inserts carry its
/// own id and consecutive `seq` numbers, and every delete matches exactly
/// one prior insert by `(src_thread, seq)` with the same key and a tick
/// no smaller than the insert's.
///
/// Returns the totals on success, the first violation otherwise.
pub fn verify(
    num_threads: u32,
    records: impl IntoIterator<Item = Record>,
) -> Result<Summary, VerifyError> {
    let mut inserted: HashMap<(u32, u64), Inserted, RandomState> =
        HashMap::with_hasher(RandomState::default());
    let mut next_seq: Vec<u64> = alloc::vec![0; num_threads as usize];
    let mut summary = Summary::default();

    for record in records {
        for id in [record.thread, record.src_thread] {
            if id >= num_threads {
                return Err(VerifyError::ThreadOutOfRange {
                    thread: id,
                    num_threads,
                });
            }
        }
        match record.op {
            Op::Insert => {
                if record.thread != record.src_thread {
                    return Err(VerifyError::ForeignInsert {
                        thread: record.thread,
                        src_thread: record.src_thread,
                    });
                }
                let expected = next_seq[record.thread as usize];
                if record.seq != expected {
                    return Err(VerifyError::InsertOutOfOrder {
                        thread: record.thread,
                        expected,
                        found: record.seq,
                    });
                }
                next_seq[record.thread as usize] += 1;
                inserted.insert(
                    (record.src_thread, record.seq),
                    Inserted {
                        key: record.key,
                        tick: record.tick,
                        deleted: false,
                    },
                );
                summary.inserts += 1;
            }
            Op::Delete => {
                let slot = (record.src_thread, record.seq);
                let Some(entry) = inserted.get_mut(&slot) else {
                    return Err(VerifyError::UnknownInsert {
                        src_thread: record.src_thread,
                        seq: record.seq,
                    });
                };
                if entry.key != record.key {
                    return Err(VerifyError::KeyMismatch {
                        src_thread: record.src_thread,
                        seq: record.seq,
                        expected: entry.key,
                        found: record.key,
                    });
                }
                if record.tick < entry.tick {
                    return Err(VerifyError::TickOrder {
                        src_thread: record.src_thread,
                        seq: record.seq,
                        insert_tick: entry.tick,
                        delete_tick: record.tick,
                    });
                }
                if entry.deleted {
                    return Err(VerifyError::DoubleDelete {
                        src_thread: record.src_thread,
                        seq: record.seq,
                    });
                }
                entry.deleted = true;
                summary.deletes += 1;
            }
        }
    }

    summary.live = summary.inserts - summary.deletes;
    log::debug!(
        "log verified: {} inserts, {} deletes, {} live",
        summary.inserts,
        summary.deletes,
        summary.live
    );
    Ok(summary)
}

// -----------------------------------------------------------------------------
// Tests
