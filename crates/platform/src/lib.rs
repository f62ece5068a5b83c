//! CPU detection, capabilities, and tuning for the treehash workspace.
//!
//! This crate is the single source of truth for CPU feature detection and
//! kernel selection across the workspace.
//!
//! # Core Types
//!
//! - [`Caps`]: what instructions can run on this machine (capabilities)
//! - [`Tune`]: what strategies are optimal on this machine (tuning hints)
//! - [`Lazy`]: process-wide one-shot cache for dispatch tables
//!
//! # Design
//!
//! 1. **One API**: algorithms query [`get()`] instead of doing ad-hoc detection.
//! 2. **Capabilities vs tuning**: `Caps` says what's *possible*; `Tune` says
//!    what's *optimal*.
//! 3. **Cached**: runtime detection runs once and is cached (`OnceLock` with
//!    `std`, atomics without).
//! 4. **Miri-safe**: under Miri, detection always reports portable-only caps.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod caps;
mod detect;
pub mod lazy;
pub mod tune;

pub use caps::Caps;
pub use lazy::Lazy;
pub use tune::{Tune, TuneKind};

/// Get detected CPU capabilities and tuning hints.
///
/// This is the main entry point for capability-based dispatch.
#[inline]
#[must_use]
pub fn get() -> (Caps, Tune) {
  detect::get()
}

/// Get just the CPU capabilities.
#[inline]
#[must_use]
pub fn caps() -> Caps {
  detect::get().0
}

/// Get just the tuning hints.
#[inline]
#[must_use]
pub fn tune() -> Tune {
  detect::get().1
}

/// Install a capabilities override before the first call to [`get()`].
///
/// Useful for forcing the portable path in tests and for bare-metal targets
/// where the CPU is known at deployment. The override can be installed at most
/// once, and only takes effect if detection has not already run.
#[cfg(feature = "std")]
#[inline]
pub fn set_caps_override(value: (Caps, Tune)) {
  detect::set_caps_override(value);
}
