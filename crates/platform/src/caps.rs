//! CPU capability representation.
//!
//! [`Caps`] is a compact bitset answering: "what instructions can I legally
//! run on this machine?" Each bit corresponds to one ISA extension. The bits
//! are architecture-specific but the API is uniform: x86 features occupy the
//! low 64 bits, aarch64 features the next 64.

/// CPU capability bitset.
///
/// `Caps` is `Copy`, `Send`, and `Sync`, and can be freely shared across
/// threads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Caps(u128);

impl Caps {
  /// No capabilities (portable baseline).
  pub const NONE: Self = Self(0);

  #[inline]
  #[must_use]
  const fn from_bit(bit: u32) -> Self {
    Self(1u128 << bit)
  }

  /// Check if `self` has every capability in `required`.
  #[inline]
  #[must_use]
  pub const fn has(self, required: Self) -> bool {
    self.0 & required.0 == required.0
  }

  /// Union of two capability sets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Check if the set is empty.
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }
}

impl core::ops::BitOr for Caps {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self {
    self.union(rhs)
  }
}

impl core::ops::BitOrAssign for Caps {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

/// x86/x86_64 feature bits (bits 0-63).
pub mod x86 {
  use super::Caps;

  pub const SSE2: Caps = Caps::from_bit(0);
  pub const SSSE3: Caps = Caps::from_bit(1);
  pub const SSE41: Caps = Caps::from_bit(2);
  pub const SSE42: Caps = Caps::from_bit(3);
  pub const AVX: Caps = Caps::from_bit(4);
  pub const AVX2: Caps = Caps::from_bit(5);
  pub const AVX512F: Caps = Caps::from_bit(6);
  pub const AVX512VL: Caps = Caps::from_bit(7);
  pub const AVX512BW: Caps = Caps::from_bit(8);
  pub const AVX512DQ: Caps = Caps::from_bit(9);
}

/// aarch64 feature bits (bits 64-127).
pub mod aarch64 {
  use super::Caps;

  pub const NEON: Caps = Caps::from_bit(64);
  pub const AES: Caps = Caps::from_bit(65);
  pub const SHA2: Caps = Caps::from_bit(66);
  pub const SHA3: Caps = Caps::from_bit(67);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn none_is_empty() {
    assert!(Caps::NONE.is_empty());
    assert!(!x86::SSSE3.is_empty());
  }

  #[test]
  fn union_and_has() {
    let set = x86::SSSE3 | x86::SSE41;
    assert!(set.has(x86::SSSE3));
    assert!(set.has(x86::SSE41));
    assert!(set.has(x86::SSSE3 | x86::SSE41));
    assert!(!set.has(x86::AVX2));
    assert!(!x86::SSSE3.has(set));
  }

  #[test]
  fn arch_regions_do_not_overlap() {
    let all_x86 = x86::SSE2 | x86::SSSE3 | x86::SSE41 | x86::SSE42 | x86::AVX | x86::AVX2;
    assert!(!all_x86.has(aarch64::NEON));
    assert!(!aarch64::NEON.has(x86::SSE2));
  }

  #[test]
  fn every_set_has_none() {
    assert!(Caps::NONE.has(Caps::NONE));
    assert!(x86::AVX512F.has(Caps::NONE));
  }
}
