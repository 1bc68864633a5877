// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::lanes::Lanes;

/// A two-input NAND gate reading two slots of the value index space.
///
/// A gate at gate index `g` may only read slots `< static_result_size + g`;
/// that is what keeps every graph acyclic and evaluable in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NandOperator {
    pub left: usize,
    pub right: usize,
}

impl NandOperator {
    pub const fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// The highest slot this gate reads.
    #[inline]
    pub fn max_operand(&self) -> usize {
        self.left.max(self.right)
    }

    #[inline]
    pub fn reads(&self, slot: usize) -> bool {
        self.left == slot || self.right == slot
    }

    /// Returns a copy with every read of `from` redirected to `to`.
    #[must_use]
    pub fn redirect(&self, from: usize, to: usize) -> Self {
        Self {
            left: if self.left == from { to } else { self.left },
            right: if self.right == from { to } else { self.right },
        }
    }

    #[inline(always)]
    pub fn nand(&self, slots: &[Lanes]) -> Lanes {
        slots[self.left].nand(slots[self.right])
    }
}

impl fmt::Display for NandOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nand(%{}, %{})", self.left, self.right)
    }
}
