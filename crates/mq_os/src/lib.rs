//! Platform support for the `multiq` workspace.
//!
//! This crate bundles the low-level building blocks the concurrent queues
//! are made of:
//!
//! - [`atomic`] : Atomic types used across the workspace. On targets
//!   without native 64-bit atomics the 64-bit types fall back to
//!   `portable_atomic`.
//! - [`CachePadded`] : Pads and aligns a value to the length of a cache
//!   line, so that adjacent shared values do not false-share.
//! - [`Pcg32`] : A small deterministic PRNG with independent streams, one
//!   per queue handle.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

// -----------------------------------------------------------------------------
// Modules

pub mod atomic;

mod cache_padded;
mod rng;

// -----------------------------------------------------------------------------
// Exports

pub use cache_padded::CachePadded;
pub use rng::Pcg32;
