//! Process-wide one-shot caches for dispatch tables.
//!
//! [`Lazy`] stores a single `Copy` value with lazy initialization:
//!
//! - **std**: thin wrapper around `OnceLock`
//! - **no_std with atomics**: atomic state machine over `UnsafeCell`
//! - **no_std without atomics**: per-call computation (single-threaded targets)

#[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
use core::{cell::UnsafeCell, mem::MaybeUninit, sync::atomic::AtomicU8};

/// A lazy, process-wide cache for a single `Copy` value.
///
/// ```ignore
/// static ACTIVE: Lazy<Dispatch> = Lazy::new();
/// let d = ACTIVE.get_or_init(compute_dispatch);
/// ```
pub struct Lazy<T: Copy> {
  #[cfg(feature = "std")]
  inner: std::sync::OnceLock<T>,

  #[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
  state: AtomicU8,
  #[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
  value: UnsafeCell<MaybeUninit<T>>,

  // No-atomic targets are single-threaded; nothing is cached there.
  #[cfg(all(not(feature = "std"), not(target_has_atomic = "8")))]
  _marker: core::marker::PhantomData<*const T>,
}

#[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
// SAFETY: the UNINIT -> INITING -> READY state machine gives the initializing
// thread exclusive write access, and READY is published with Release ordering
// before any Acquire read of the value.
#[allow(unsafe_code)]
unsafe impl<T: Copy + Sync> Sync for Lazy<T> {}

#[cfg(all(not(feature = "std"), not(target_has_atomic = "8")))]
// SAFETY: targets without atomics are single-threaded; no concurrent access
// is possible.
#[allow(unsafe_code)]
unsafe impl<T: Copy + Sync> Sync for Lazy<T> {}

#[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
const UNINIT: u8 = 0;
#[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
const INITING: u8 = 1;
#[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
const READY: u8 = 2;

impl<T: Copy> Lazy<T> {
  /// Create a new empty cache.
  #[must_use]
  pub const fn new() -> Self {
    Self {
      #[cfg(feature = "std")]
      inner: std::sync::OnceLock::new(),

      #[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
      state: AtomicU8::new(UNINIT),
      #[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
      value: UnsafeCell::new(MaybeUninit::uninit()),

      #[cfg(all(not(feature = "std"), not(target_has_atomic = "8")))]
      _marker: core::marker::PhantomData,
    }
  }

  /// Get the cached value, initializing with `f` if not yet set.
  ///
  /// On targets with atomics the initializer runs at most once.
  #[inline]
  pub fn get_or_init(&self, f: impl FnOnce() -> T) -> T {
    #[cfg(feature = "std")]
    {
      *self.inner.get_or_init(f)
    }

    #[cfg(all(not(feature = "std"), target_has_atomic = "8"))]
    {
      use core::sync::atomic::Ordering;

      if self.state.load(Ordering::Acquire) == READY {
        // SAFETY: the value is fully written before READY is published.
        #[allow(unsafe_code)]
        return unsafe { (*self.value.get()).assume_init() };
      }

      if self
        .state
        .compare_exchange(UNINIT, INITING, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
      {
        let value = f();
        // SAFETY: winning the CAS gives exclusive write access until READY.
        #[allow(unsafe_code)]
        unsafe {
          (*self.value.get()).write(value);
        }
        self.state.store(READY, Ordering::Release);
        return value;
      }

      while self.state.load(Ordering::Acquire) != READY {
        core::hint::spin_loop();
      }
      // SAFETY: READY was observed with Acquire ordering.
      #[allow(unsafe_code)]
      unsafe {
        (*self.value.get()).assume_init()
      }
    }

    #[cfg(all(not(feature = "std"), not(target_has_atomic = "8")))]
    {
      f()
    }
  }
}

impl<T: Copy> Default for Lazy<T> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn initializes_once() {
    static CACHE: Lazy<u64> = Lazy::new();

    assert_eq!(CACHE.get_or_init(|| 42), 42);
    assert_eq!(CACHE.get_or_init(|| 99), 42);
  }

  #[cfg(feature = "std")]
  #[test]
  fn concurrent_init_runs_initializer_once() {
    use std::{
      sync::atomic::{AtomicUsize, Ordering},
      vec::Vec,
    };

    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static CACHE: Lazy<u64> = Lazy::new();

    let handles: Vec<_> = (0..8)
      .map(|_| {
        std::thread::spawn(|| {
          for _ in 0..100 {
            let v = CACHE.get_or_init(|| {
              CALLS.fetch_add(1, Ordering::SeqCst);
              7
            });
            assert_eq!(v, 7);
          }
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
  }
}
