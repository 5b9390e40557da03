use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::dary_heap::DaryHeap;
use crate::element::Element;
use crate::key::SortKey;
use crate::SeqQueue;

// -----------------------------------------------------------------------------
// BufferedHeap

/// A d-ary heap behind two small buffers.
///
/// The *deletion buffer* keeps the `DEL` smallest elements in ascending
/// order, so `top` and `pop` are array reads. The *insertion buffer*
/// absorbs up to `INS` pushes that do not belong among the current minima
/// and flushes them into the heap in one batch. Most operations therefore
/// never touch the heap at all.
///
/// Invariants:
///
/// - every element in the insertion buffer or the heap sorts no earlier
///   than the last element of the deletion buffer;
/// - the deletion buffer is empty iff the whole container is empty.
///
/// # Examples
///
/// ```
/// use mq_seq::{BufferedHeap, SeqQueue};
///
/// let mut pq = BufferedHeap::<u64>::new();
/// for v in [4, 1, 3, 2] {
///     pq.push(v).unwrap();
/// }
/// assert_eq!(pq.pop(), Some(1));
/// assert_eq!(pq.pop(), Some(2));
/// assert_eq!(pq.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct BufferedHeap<E, const INS: usize = 64, const DEL: usize = 64> {
    insertion: Vec<E>,
    deletion: VecDeque<E>,
    heap: DaryHeap<E>,
}

impl<E: Element, const INS: usize, const DEL: usize> BufferedHeap<E, INS, DEL> {
    /// Creates an empty container.
    pub fn new() -> Self {
        const {
            assert!(INS > 0 && DEL > 0, "buffer sizes must be non-zero");
        }
        Self {
            insertion: Vec::with_capacity(INS),
            deletion: VecDeque::with_capacity(DEL),
            heap: DaryHeap::new(),
        }
    }

    /// Moves every buffered insertion into the heap.
    fn flush_insertion(&mut self) {
        for value in self.insertion.drain(..) {
            // Heap pushes are infallible.
            let _ = self.heap.push(value);
        }
    }

    /// Routes an element that does not belong among the current minima.
    fn stash(&mut self, value: E) {
        if self.insertion.len() < INS {
            self.insertion.push(value);
        } else {
            self.flush_insertion();
            let _ = self.heap.push(value);
        }
    }

    /// Refills the deletion buffer from the heap. Only valid while the
    /// deletion buffer is empty.
    fn refresh(&mut self) {
        debug_assert!(self.deletion.is_empty());
        self.flush_insertion();
        while self.deletion.len() < DEL {
            match self.heap.pop() {
                Some(value) => self.deletion.push_back(value),
                None => break,
            }
        }
    }
}

impl<E: Element, const INS: usize, const DEL: usize> Default for BufferedHeap<E, INS, DEL> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Element, const INS: usize, const DEL: usize> SeqQueue for BufferedHeap<E, INS, DEL> {
    type Elem = E;

    fn push(&mut self, value: E) -> Result<(), E> {
        if self.deletion.is_empty() {
            self.deletion.push_back(value);
            return Ok(());
        }
        // Position among the buffered minima, scanning from the back.
        let key = value.sort_key();
        let mut pos = self.deletion.len();
        while pos > 0 && key.before(self.deletion[pos - 1].sort_key()) {
            pos -= 1;
        }
        if pos == self.deletion.len() {
            self.stash(value);
        } else {
            if self.deletion.len() == DEL {
                if let Some(last) = self.deletion.pop_back() {
                    self.stash(last);
                }
            }
            self.deletion.insert(pos, value);
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<E> {
        let value = self.deletion.pop_front()?;
        if self.deletion.is_empty() {
            self.refresh();
        }
        Some(value)
    }

    #[inline]
    fn top(&self) -> Option<&E> {
        self.deletion.front()
    }

    #[inline]
    fn len(&self) -> usize {
        self.insertion.len() + self.deletion.len() + self.heap.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.deletion.is_empty()
    }

    fn clear(&mut self) {
        self.insertion.clear();
        self.deletion.clear();
        self.heap.clear();
    }
}

// -----------------------------------------------------------------------------
// Tests
