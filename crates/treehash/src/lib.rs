//! BLAKE3 tree hashing with hardware acceleration.
//!
//! `treehash` provides the BLAKE3 hash and XOF with automatic CPU feature
//! detection and kernel selection. The chunk layer runs 4, 8, or 16 chunks
//! per SIMD pass where the CPU allows; every kernel produces byte-identical
//! output.
//!
//! # Quick Start
//!
//! ```
//! use treehash::{Blake3, Digest};
//!
//! // One-shot computation
//! let digest = Blake3::digest(b"hello world");
//!
//! // Streaming computation
//! let mut hasher = Blake3::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.finalize(), digest);
//! ```
//!
//! # Modes
//!
//! - [`Blake3::new`]: plain hashing
//! - [`Blake3::new_keyed`]: keyed hashing with a 32-byte key
//! - [`Blake3::new_derive_key`]: key derivation under a context string
//!
//! # Extendable output
//!
//! ```
//! use treehash::{Blake3, Digest, Xof};
//!
//! let mut hasher = Blake3::new();
//! hasher.update(b"some input");
//! let mut xof = hasher.finalize_xof();
//! let mut out = [0u8; 96];
//! xof.squeeze(&mut out);
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `std` | Yes | Runtime CPU detection for optimal dispatch |
//! | `alloc` | Yes (via `std`) | `finalize_bytes` and other buffered helpers |
#![cfg_attr(not(feature = "std"), no_std)]

pub use hashes::crypto::{Blake3, Blake3Xof};
pub use traits::{Digest, HashError, Xof};
