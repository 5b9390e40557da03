//! Stored elements and their key extraction.

use crate::key::SortKey;

/// Something a sequential store can hold and order.
///
/// An element is either a bare key (the priority-queue case) or a key
/// paired with a payload such as [`Ranked`]. The containers and the
/// concurrent core only look at elements through
/// [`sort_key`](Element::sort_key).
pub trait Element: Clone {
    /// The key this element is ordered by.
    type Key: SortKey;

    /// The ordering key of this element.
    fn sort_key(&self) -> Self::Key;
}

/// Every key orders itself.
impl<K: SortKey> Element for K {
    type Key = K;

    #[inline]
    fn sort_key(&self) -> K {
        *self
    }
}

/// A key with an attached payload.
///
/// # Examples
///
/// ```
/// use mq_seq::{Element, Ranked};
///
/// let job = Ranked { key: 3u64, item: "rebuild index" };
/// assert_eq!(job.sort_key(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ranked<K, T> {
    /// The priority of the payload.
    pub key: K,
    /// The payload itself.
    pub item: T,
}

impl<K: SortKey, T: Clone> Element for Ranked<K, T> {
    type Key = K;

    #[inline]
    fn sort_key(&self) -> K {
        self.key
    }
}
