#![expect(
    unsafe_code,
    reason = "the guarded container lives in an UnsafeCell behind the lock word"
)]

use core::cell::UnsafeCell;

use mq_os::atomic::Ordering::{Acquire, Relaxed, Release};
use mq_os::atomic::{AtomicU32, AtomicU64};
use mq_seq::{Element, SeqQueue, SortKey};

/// The key type a guarded container is ordered by.
pub(crate) type KeyOf<Q> = <<Q as SeqQueue>::Elem as Element>::Key;

/// Low bit of the lock word; the upper 31 bits hold the last-holder tag.
const LOCKED: u32 = 1;

// -----------------------------------------------------------------------------
// Guard

/// One sub-queue: a lock word, a cached top key, and the sequential
/// container itself.
///
/// The top-key cache lets poppers compare sub-queues without touching any
/// lock: while a guard is unlocked, the cache holds the bit pattern of the
/// container's top key, or the sentinel when the container is empty. The
/// cache is read and written with relaxed ordering; the lock's
/// release/acquire pair is what publishes container contents together with
/// the refreshed cache.
///
/// The container is only reachable through [`Guard::try_lock`] /
/// [`Guard::try_lock_mark`], whose [`LockedQueue`] view keeps the cache in
/// sync and releases the lock on drop.
pub(crate) struct Guard<Q: SeqQueue> {
    top_key: AtomicU64,
    lock: AtomicU32,
    queue: UnsafeCell<Q>,
}

unsafe impl<Q: SeqQueue + Send> Send for Guard<Q> {}
unsafe impl<Q: SeqQueue + Send> Sync for Guard<Q> {}

impl<Q: SeqQueue> Guard<Q> {
    pub(crate) fn new(queue: Q) -> Self {
        debug_assert!(queue.is_empty());
        Self {
            top_key: AtomicU64::new(KeyOf::<Q>::SENTINEL.to_bits()),
            lock: AtomicU32::new(0),
            queue: UnsafeCell::new(queue),
        }
    }

    /// The cached top key. Sentinel while the sub-queue is empty; may be
    /// stale while another thread holds the lock.
    #[inline]
    pub(crate) fn top_key(&self) -> KeyOf<Q> {
        KeyOf::<Q>::from_bits(self.top_key.load(Relaxed))
    }

    /// Whether the cached top key is the sentinel.
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.top_key().is_sentinel()
    }

    /// Attempts to take the lock.
    ///
    /// Tests the word before exchanging so a contended guard is not
    /// invalidated in every waiter's cache. Acquire on success; any stored
    /// holder tag is cleared on release.
    pub(crate) fn try_lock(&self) -> Option<LockedQueue<'_, Q>> {
        if self.lock.load(Relaxed) & LOCKED != 0 {
            return None;
        }
        if self.lock.swap(LOCKED, Acquire) & LOCKED != 0 {
            return None;
        }
        Some(LockedQueue {
            guard: self,
            release: 0,
        })
    }

    /// Attempts to take the lock on behalf of handle `mark`.
    ///
    /// Succeeds only if the guard is unlocked and either `force` is set,
    /// no handle has held it yet, or `mark` was the previous holder. On
    /// release the holder tag is kept, so a sticky handle can re-acquire
    /// its sub-queue while other non-forcing handles are turned away.
    pub(crate) fn try_lock_mark(&self, force: bool, mark: u32) -> Option<LockedQueue<'_, Q>> {
        let mut current = self.lock.load(Relaxed);
        loop {
            if current & LOCKED != 0 {
                return None;
            }
            let tag = current >> 1;
            if !force && tag != 0 && tag != mark + 1 {
                return None;
            }
            let held = ((mark + 1) << 1) | LOCKED;
            match self.lock.compare_exchange(current, held, Acquire, Relaxed) {
                Ok(_) => {
                    return Some(LockedQueue {
                        guard: self,
                        release: (mark + 1) << 1,
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }
}

// -----------------------------------------------------------------------------
// LockedQueue

/// Exclusive view of a guarded container.
///
/// Every mutation refreshes the guard's top-key cache, so the guard
/// invariant (cache equals top or sentinel) is re-established before the
/// drop releases the lock.
pub(crate) struct LockedQueue<'a, Q: SeqQueue> {
    guard: &'a Guard<Q>,
    /// Lock word stored on release: zero, or the holder tag for marked
    /// locks.
    release: u32,
}

impl<Q: SeqQueue> LockedQueue<'_, Q> {
    #[inline]
    fn queue(&self) -> &Q {
        unsafe { &*self.guard.queue.get() }
    }

    #[inline]
    fn queue_mut(&mut self) -> &mut Q {
        unsafe { &mut *self.guard.queue.get() }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    #[inline]
    pub(crate) fn top(&self) -> Option<&Q::Elem> {
        self.queue().top()
    }

    /// Pushes into the container and refreshes the cached top key.
    pub(crate) fn push(&mut self, value: Q::Elem) -> Result<(), Q::Elem> {
        debug_assert!(
            !value.sort_key().is_sentinel(),
            "the sentinel key cannot be stored"
        );
        self.queue_mut().push(value)?;
        if let Some(top) = self.queue().top() {
            let bits = top.sort_key().to_bits();
            if bits != self.guard.top_key.load(Relaxed) {
                self.guard.top_key.store(bits, Relaxed);
            }
        }
        Ok(())
    }

    /// Pops from the container and refreshes the cached top key.
    pub(crate) fn pop(&mut self) -> Option<Q::Elem> {
        let value = self.queue_mut().pop()?;
        let bits = match self.queue().top() {
            Some(top) => top.sort_key().to_bits(),
            None => KeyOf::<Q>::SENTINEL.to_bits(),
        };
        self.guard.top_key.store(bits, Relaxed);
        Some(value)
    }

    /// Empties the container and resets the cache to the sentinel.
    pub(crate) fn clear(&mut self) {
        self.queue_mut().clear();
        self.guard
            .top_key
            .store(KeyOf::<Q>::SENTINEL.to_bits(), Relaxed);
    }
}

impl<Q: SeqQueue> Drop for LockedQueue<'_, Q> {
    #[inline]
    fn drop(&mut self) {
        debug_assert!(self.guard.lock.load(Relaxed) & LOCKED != 0);
        self.guard.lock.store(self.release, Release);
    }
}

// -----------------------------------------------------------------------------
// Tests
