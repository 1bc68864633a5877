// SPDX-License-Identifier: Apache-2.0

//! Tracks which gates can influence an output.
//!
//! A gate is live iff it is one of the trailing output gates or it is read,
//! transitively, by a live gate. Because a gate only ever reads lower slots a
//! single high-to-low scan is enough: by the time the scan reaches a gate,
//! every gate that could mark it live has already been visited.

use crate::nand_operator::NandOperator;

// The first "true" marker cannot be 0: "false" is written as `true - 1`, and
// a zero marker would make 255 the false value, which later generations would
// reinterpret as true.
const FIRST_TRUE_MARKER: u8 = 1;

/// Per-gate liveness flags with an amortised O(1) [`LivenessBits::clear`].
///
/// Each flag is stored as a byte compared against a moving "true" marker;
/// clearing just bumps the marker. The storage is only wiped when the marker
/// would overflow, i.e. once every 254 clears.
#[derive(Debug, Clone)]
pub struct LivenessBits {
    values: Vec<u8>,
    true_marker: u8,
}

impl LivenessBits {
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0; len],
            true_marker: FIRST_TRUE_MARKER,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        self.values[index] == self.true_marker
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        self.values[index] = self.marker_for(value);
    }

    pub fn set_range(&mut self, start: usize, count: usize, value: bool) {
        let marker = self.marker_for(value);
        self.values[start..start + count].fill(marker);
    }

    pub fn clear(&mut self) {
        if self.true_marker == u8::MAX {
            self.values.fill(0);
            self.true_marker = FIRST_TRUE_MARKER;
            return;
        }
        self.true_marker += 1;
    }

    pub fn count_live(&self) -> usize {
        self.values
            .iter()
            .filter(|v| **v == self.true_marker)
            .count()
    }

    /// Overwrites `self` with `other`; both must have the same length.
    pub fn copy_from(&mut self, other: &LivenessBits) {
        debug_assert_eq!(self.values.len(), other.values.len());
        self.values.copy_from_slice(&other.values);
        self.true_marker = other.true_marker;
    }

    pub fn to_vec(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    #[inline]
    fn marker_for(&self, value: bool) -> u8 {
        if value {
            self.true_marker
        } else {
            self.true_marker - 1
        }
    }
}

impl PartialEq for LivenessBits {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && (0..self.len()).all(|i| self.get(i) == other.get(i))
    }
}

impl Eq for LivenessBits {}

/// Propagates liveness backwards from whatever is already marked in `live`.
///
/// `live` is expected to be seeded (usually with the output gates). Operands
/// below `static_result_size` are constants or parameters and are ignored.
/// Returns the total number of gates marked live once the scan completes.
pub fn recalculate_remaining_liveness(
    static_result_size: usize,
    operators: &[NandOperator],
    live: &mut LivenessBits,
) -> usize {
    debug_assert_eq!(operators.len(), live.len());
    let mut live_count = 0;
    for gate in (0..operators.len()).rev() {
        if !live.get(gate) {
            continue;
        }
        live_count += 1;

        let op = operators[gate];
        debug_assert!(
            op.max_operand() < static_result_size + gate,
            "gate {} reads forward slot {} (static_result_size = {})",
            gate,
            op.max_operand(),
            static_result_size
        );
        if op.left >= static_result_size {
            live.set(op.left - static_result_size, true);
        }
        if op.right >= static_result_size {
            live.set(op.right - static_result_size, true);
        }
    }
    live_count
}

/// Computes liveness from scratch with the trailing `output_size` gates as
/// roots.
pub fn compute_liveness(
    static_result_size: usize,
    operators: &[NandOperator],
    output_size: usize,
) -> (LivenessBits, usize) {
    let mut live = LivenessBits::new(operators.len());
    live.set_range(operators.len() - output_size, output_size, true);
    let live_count = recalculate_remaining_liveness(static_result_size, operators, &mut live);
    (live, live_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clear_resets_all_flags() {
        let mut bits = LivenessBits::new(5);
        bits.set(1, true);
        bits.set(3, true);
        assert_eq!(bits.count_live(), 2);
        bits.clear();
        assert_eq!(bits.count_live(), 0);
        assert_eq!(bits.to_vec(), vec![false; 5]);
    }

    #[test]
    fn test_clear_survives_marker_wraparound() {
        let mut bits = LivenessBits::new(4);
        for round in 0..1000 {
            bits.set(round % 4, true);
            assert!(bits.get(round % 4));
            assert_eq!(bits.count_live(), 1, "round {}", round);
            bits.clear();
            assert_eq!(bits.count_live(), 0, "round {}", round);
        }
    }

    #[test]
    fn test_false_written_after_clear_stays_false() {
        let mut bits = LivenessBits::new(3);
        bits.set_range(0, 3, true);
        bits.clear();
        bits.set(0, false);
        bits.set(2, true);
        assert_eq!(bits.to_vec(), vec![false, false, true]);
    }

    #[test]
    fn test_copy_from_is_independent() {
        let mut a = LivenessBits::new(3);
        a.set(2, true);
        let mut b = LivenessBits::new(3);
        b.clear();
        b.copy_from(&a);
        assert_eq!(a, b);
        b.set(0, true);
        assert!(!a.get(0));
    }

    // Slots: 0,1 constants, 2 parameter, gates start at 3.
    #[test]
    fn test_backward_scan_marks_transitive_operands() {
        let ops = [
            NandOperator::new(2, 2), // g0 = %3, dead
            NandOperator::new(2, 0), // g1 = %4, read by g2
            NandOperator::new(4, 1), // g2 = %5, read by g3
            NandOperator::new(5, 5), // g3 = %6, output
        ];
        let (live, count) = compute_liveness(3, &ops, 1);
        assert_eq!(live.to_vec(), vec![false, true, true, true]);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_recalculate_is_idempotent() {
        let ops = [
            NandOperator::new(0, 1),
            NandOperator::new(3, 2),
            NandOperator::new(2, 2),
            NandOperator::new(4, 3),
        ];
        let (mut live, first) = compute_liveness(3, &ops, 1);
        let snapshot = live.to_vec();
        let second = recalculate_remaining_liveness(3, &ops, &mut live);
        assert_eq!(first, second);
        assert_eq!(snapshot, live.to_vec());
    }
}
