//! Atomic types used across the workspace.
//!
//! The queue cores cache their top keys and the global permutation word in
//! 64-bit atomics. Targets that lack native 64-bit atomic support get the
//! `portable_atomic` fallback instead; everything else comes straight from
//! `core::sync::atomic`.

pub use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize};
pub use core::sync::atomic::{Ordering, fence};

#[cfg(target_has_atomic = "64")]
pub use core::sync::atomic::{AtomicI64, AtomicU64};

#[cfg(not(target_has_atomic = "64"))]
pub use portable_atomic::{AtomicI64, AtomicU64};

#[cfg(not(target_has_atomic = "ptr"))]
compile_error!("Platforms without atomic pointers are currently not supported.");
