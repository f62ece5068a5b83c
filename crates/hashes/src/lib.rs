//! Cryptographic digests.
//!
//! This crate is `no_std` compatible. Its only library dependency outside the
//! workspace is `zeroize` (secret hygiene on drop). Dev-only dependencies are
//! used for oracle testing and benchmarking.
//!
//! # Modules
//!
//! - [`crypto`] - Cryptographic hash functions.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod crypto;

pub use traits::{Digest, HashError, Xof};
