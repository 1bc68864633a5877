// SPDX-License-Identifier: Apache-2.0

//! Fixed-width boolean vectors used as the value of every slot in a
//! [`crate::value_buffer::ValueBuffer`].
//!
//! A single slot value is a 256-bit vector where bit *N* is the value of that
//! slot for truth-table row *N* of the current batch. All gate evaluation
//! therefore boils down to bit-wise operations on these vectors.

use std::ops::{BitAnd, BitXor, Not};

/// Number of 64-bit limbs in a [`Lanes`] value.
pub const LIMBS: usize = 4;

/// Number of independent boolean samples carried by one [`Lanes`] value.
pub const LANE_BITS: usize = LIMBS * 64;

/// A 256-wide boolean vector.
///
/// Laid out least significant limb first: sample *i* lives in bit *(i % 64)*
/// of `limbs[i / 64]`. The type is 32-byte aligned so a `Vec<Lanes>` is
/// always suitably aligned for full-width vector loads and stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(C, align(32))]
pub struct Lanes(pub [u64; LIMBS]);

impl Lanes {
    /// All samples false.
    pub const ZERO: Lanes = Lanes([0; LIMBS]);

    /// All samples true. NAND with this is a free NOT.
    pub const ONES: Lanes = Lanes([u64::MAX; LIMBS]);

    /// Packs up to 256 boolean samples; missing samples are false.
    pub fn from_samples(samples: &[bool]) -> Self {
        assert!(
            samples.len() <= LANE_BITS,
            "from_samples() accepts at most {} samples, got {}",
            LANE_BITS,
            samples.len()
        );
        let mut lanes = Self::ZERO;
        for (i, &bit) in samples.iter().enumerate() {
            lanes.set(i, bit);
        }
        lanes
    }

    /// Mask with the first `count` samples set.
    pub fn first_n(count: usize) -> Self {
        assert!(count <= LANE_BITS, "mask wider than {} samples", LANE_BITS);
        let mut limbs = [0u64; LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = i * 64;
            if count >= start + 64 {
                *limb = u64::MAX;
            } else if count > start {
                *limb = (1u64 << (count - start)) - 1;
            }
        }
        Self(limbs)
    }

    #[inline]
    pub fn get(&self, sample: usize) -> bool {
        (self.0[sample / 64] >> (sample % 64)) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, sample: usize, bit: bool) {
        let mask = 1u64 << (sample % 64);
        if bit {
            self.0[sample / 64] |= mask;
        } else {
            self.0[sample / 64] &= !mask;
        }
    }

    /// `!(self & rhs)` across the full vector width.
    #[inline(always)]
    pub fn nand(self, rhs: Self) -> Self {
        let a = self.0;
        let b = rhs.0;
        Self([!(a[0] & b[0]), !(a[1] & b[1]), !(a[2] & b[2]), !(a[3] & b[3])])
    }

    #[inline]
    pub fn count_ones(self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn to_array(self) -> [u64; LIMBS] {
        self.0
    }
}

impl Not for Lanes {
    type Output = Self;
    #[inline]
    fn not(self) -> Self::Output {
        let a = self.0;
        Self([!a[0], !a[1], !a[2], !a[3]])
    }
}

impl BitAnd for Lanes {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        let a = self.0;
        let b = rhs.0;
        Self([a[0] & b[0], a[1] & b[1], a[2] & b[2], a[3] & b[3]])
    }
}

impl BitXor for Lanes {
    type Output = Self;
    #[inline]
    fn bitxor(self, rhs: Self) -> Self::Output {
        let a = self.0;
        let b = rhs.0;
        Self([a[0] ^ b[0], a[1] ^ b[1], a[2] ^ b[2], a[3] ^ b[3]])
    }
}
