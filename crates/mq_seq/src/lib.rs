//! Sequential stores for the `multiq` workspace.
//!
//! One of these sits inside every guard of a concurrent multiqueue. They
//! are plain single-threaded containers; all synchronization lives in the
//! guard that owns them.
//!
//! ## Containers
//!
//! - [`DaryHeap`] : A d-ary min-heap (default arity 16) with full-down
//!   deletion.
//! - [`BufferedHeap`] : A [`DaryHeap`] behind an insertion buffer and a
//!   sorted deletion buffer, so the common push/pop traffic never touches
//!   the heap.
//! - [`RingQueue`] : A bounded power-of-two ring buffer for FIFO order.
//!
//! ## Ordering
//!
//! Containers order their elements through the [`Element`] and [`SortKey`]
//! traits. A key type designates a *sentinel*, a value that sorts after
//! every real key and stands for "empty" in the concurrent top-key caches.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod buffered;
mod dary_heap;
mod element;
mod key;
mod ring;

// -----------------------------------------------------------------------------
// Exports

pub use buffered::BufferedHeap;
pub use dary_heap::DaryHeap;
pub use element::{Element, Ranked};
pub use key::{Reversed, SortKey};
pub use ring::RingQueue;

// -----------------------------------------------------------------------------
// SeqQueue

/// A single-threaded store usable as the sub-queue of a multiqueue.
///
/// The concurrent core only ever touches a `SeqQueue` while holding the
/// owning guard's lock, and only through these operations.
pub trait SeqQueue {
    /// The stored element type.
    type Elem: Element;

    /// Inserts an element. Bounded implementations give the element back
    /// when they are at capacity.
    ///
    /// After a successful push, [`top`](Self::top) sees the new minimum
    /// (ordered stores) or the oldest element (FIFO stores).
    fn push(&mut self, value: Self::Elem) -> Result<(), Self::Elem>;

    /// Removes and returns the current top, or `None` when empty.
    fn pop(&mut self) -> Option<Self::Elem>;

    /// The current top, or `None` when empty.
    fn top(&self) -> Option<&Self::Elem>;

    /// Number of stored elements.
    fn len(&self) -> usize;

    /// Whether the store holds no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the store cannot accept another push. Unbounded stores are
    /// never full.
    #[inline]
    fn is_full(&self) -> bool {
        false
    }

    /// Removes all elements.
    fn clear(&mut self);
}
