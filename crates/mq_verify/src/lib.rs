//! Replay verification for multiqueue operation logs.
//!
//! A relaxed queue promises very little ordering, which makes the few
//! promises it does make worth checking mechanically: every extracted
//! element was inserted, with the key it was inserted with, after it was
//! inserted, and only once. Workloads record one [`Record`] per operation
//! and feed the collected log to [`verify`].
//!
//! # Examples
//!
//! ```
//! use mq_verify::{verify, Record};
//!
//! let log = [
//!     Record::insert(0, 0, 42, 0),
//!     Record::delete(1, 1, 42, 0, 0),
//! ];
//! let summary = verify(2, log).unwrap();
//! assert_eq!(summary.inserts, 1);
//! assert_eq!(summary.live, 0);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod record;
mod verify;

// -----------------------------------------------------------------------------
// Exports

pub use record::{Op, Record};
pub use verify::{verify, Summary, VerifyError};
