//! Sort keys and their sentinels.

/// A key a multiqueue can order elements by.
///
/// Besides the strict weak ordering itself, a key type provides two things
/// the concurrent core depends on:
///
/// - a **sentinel**: a designated value that sorts after every real key
///   under [`before`](SortKey::before) and stands for "this sub-queue is
///   empty" in the shared top-key caches. Real keys must never equal the
///   sentinel; the core debug-asserts this on push.
/// - a **bit encoding**: keys travel through 64-bit atomics, so every key
///   must round-trip through a `u64` bit pattern.
///
/// # Examples
///
/// ```
/// use mq_seq::SortKey;
///
/// assert!(3u64.before(5));
/// assert!(!u64::SENTINEL.before(5));
/// assert!(5u64.before(u64::SENTINEL));
/// assert_eq!(u64::from_bits(7u64.to_bits()), 7);
/// ```
pub trait SortKey: Copy {
    /// The empty marker; sorts after every real key.
    const SENTINEL: Self;

    /// Strict weak ordering: `self` sorts before `other`.
    fn before(self, other: Self) -> bool;

    /// The key as a storable bit pattern.
    fn to_bits(self) -> u64;

    /// Recovers a key from [`to_bits`](SortKey::to_bits) output.
    fn from_bits(bits: u64) -> Self;

    /// Whether this key is the sentinel.
    #[inline]
    fn is_sentinel(self) -> bool {
        self.to_bits() == Self::SENTINEL.to_bits()
    }
}

macro_rules! impl_sort_key {
    ($($t:ty),*) => {$(
        impl SortKey for $t {
            const SENTINEL: Self = <$t>::MAX;

            #[inline]
            fn before(self, other: Self) -> bool {
                self < other
            }

            #[inline]
            fn to_bits(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_bits(bits: u64) -> Self {
                bits as $t
            }
        }
    )*};
}

impl_sort_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Reverses the order of an integer key, turning a min-queue into a
/// max-queue.
///
/// The sentinel flips to the type's minimum so it still sorts last.
///
/// # Examples
///
/// ```
/// use mq_seq::{Reversed, SortKey};
///
/// assert!(Reversed(9u32).before(Reversed(4)));
/// assert!(Reversed(4u32).before(Reversed::<u32>::SENTINEL));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Reversed<K>(pub K);

macro_rules! impl_reversed_key {
    ($($t:ty),*) => {$(
        impl SortKey for Reversed<$t> {
            const SENTINEL: Self = Reversed(<$t>::MIN);

            #[inline]
            fn before(self, other: Self) -> bool {
                self.0 > other.0
            }

            #[inline]
            fn to_bits(self) -> u64 {
                self.0 as u64
            }

            #[inline]
            fn from_bits(bits: u64) -> Self {
                Reversed(bits as $t)
            }
        }
    )*};
}

impl_reversed_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{Reversed, SortKey};

    #[test]
    fn sentinel_sorts_last() {
        assert!(0u32.before(u32::SENTINEL));
        assert!(!u32::SENTINEL.before(0));
        assert!(u32::SENTINEL.is_sentinel());
        assert!(!0u32.is_sentinel());
    }

    #[test]
    fn signed_bits_round_trip() {
        for k in [i64::MIN, -1, 0, 1, i64::MAX - 1] {
            assert_eq!(i64::from_bits(k.to_bits()), k);
        }
    }

    #[test]
    fn reversed_order() {
        assert!(Reversed(10u64).before(Reversed(3)));
        assert!(!Reversed(3u64).before(Reversed(10)));
        assert!(Reversed(u64::MAX).before(Reversed::<u64>::SENTINEL));
        assert!(Reversed::<u64>::SENTINEL.is_sentinel());
    }
}
