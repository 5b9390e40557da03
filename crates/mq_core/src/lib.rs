//! A relaxed concurrent priority queue.
//!
//! A [`MultiQueue`] spreads its elements over many small sequential
//! sub-queues, each behind its own lock and a shared cache of its top key.
//! Threads operate through per-thread [`Handle`]s: a push locks one
//! sub-queue chosen by a [selection policy](selection), a pop samples a few
//! candidates, compares their cached top keys without locking, and extracts
//! from the best one. The result is *relaxed* priority order: every pop
//! returns some small element, not necessarily the smallest, in exchange
//! for near-linear scalability.
//!
//! The same core drives [`MultiFifo`], which orders elements by insertion
//! tick instead of key and stores them in bounded rings.
//!
//! # Examples
//!
//! ```
//! use mq_core::{BufferedQueue, Config};
//!
//! let queue = BufferedQueue::<u64>::new(1, Config::default());
//! let mut handle = queue.handle();
//!
//! handle.push(42).unwrap();
//! handle.push(7).unwrap();
//! assert!(handle.try_pop().is_some());
//! ```
//!
//! # Guarantees
//!
//! No strict ordering, no linearizability. What does hold: every popped
//! element was pushed, no element is popped twice, and elements pushed
//! before a quiescent point are eventually popped.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

pub mod selection;

mod config;
mod counters;
mod fifo;
mod guard;
mod handle;
mod multiqueue;

// -----------------------------------------------------------------------------
// Exports

pub use config::Config;
pub use counters::Counters;
pub use fifo::{FifoHandle, MultiFifo, Stamped};
pub use handle::{Handle, PushError};
pub use multiqueue::MultiQueue;
pub use selection::{GlobalPermutation, Random, Selection, StickRandom, SwapAssignment};

/// A multiqueue over buffered heaps, the default container choice.
pub type BufferedQueue<E, S = StickRandom> = MultiQueue<mq_seq::BufferedHeap<E>, S>;

/// A multiqueue over plain d-ary heaps.
pub type HeapQueue<E, S = StickRandom> = MultiQueue<mq_seq::DaryHeap<E>, S>;
