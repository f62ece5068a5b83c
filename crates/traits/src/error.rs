//! Error types for hasher lifecycles.
//!
//! Hash functions here are total over byte sequences, so the only failures a
//! hasher can surface are caller bugs. These are reported immediately and
//! synchronously; there is no retry or recovery policy.

use core::fmt;

/// An API-misuse error from a checked hasher lifecycle.
///
/// # Examples
///
/// ```
/// use traits::HashError;
///
/// fn check_key(key: &[u8]) -> Result<(), HashError> {
///   if key.len() == 32 {
///     Ok(())
///   } else {
///     Err(HashError::InvalidKeyLength { expected: 32, actual: key.len() })
///   }
/// }
///
/// assert!(check_key(&[0u8; 32]).is_ok());
/// assert!(check_key(&[0u8; 16]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HashError {
  /// The hasher was updated after finalization without an intervening reset.
  InvalidState,
  /// A keyed hasher was constructed with a key of the wrong length.
  InvalidKeyLength {
    /// The key length the algorithm requires, in bytes.
    expected: usize,
    /// The key length the caller supplied, in bytes.
    actual: usize,
  },
  /// A finalize call requested more output than the per-call bound allows.
  InvalidOutputLength {
    /// The number of bytes the caller requested.
    requested: usize,
    /// The per-call output bound, in bytes.
    max: usize,
  },
}

impl fmt::Display for HashError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InvalidState => f.write_str("hasher already finalized; reset before updating"),
      Self::InvalidKeyLength { expected, actual } => {
        write!(f, "invalid key length: expected {expected} bytes, got {actual}")
      }
      Self::InvalidOutputLength { requested, max } => {
        write!(f, "invalid output length: requested {requested} bytes, bound is {max}")
      }
    }
  }
}

impl core::error::Error for HashError {}
