// SPDX-License-Identifier: Apache-2.0

use std::fmt::Write;
use std::ops::Range;

use crate::eval::{self, UNROLL};
use crate::lanes::Lanes;
use crate::liveness::{self, LivenessBits};
use crate::nand_operator::NandOperator;
use crate::nandsynth_error::{NandsynthError, Result};
use crate::value_buffer::{ValueBuffer, CONSTANT_COUNT, FALSE_SLOT};

/// An ordered, fixed-length sequence of NAND gates plus per-gate liveness.
///
/// The last `output_size` gates are the circuit outputs. Liveness is only
/// kept current by the operations in this crate; callers that edit
/// [`GateGraph::operators_mut`] directly must call
/// [`GateGraph::recalculate_liveness`] afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateGraph {
    operators: Vec<NandOperator>,
    output_size: usize,
    live: LivenessBits,
    live_count: usize,
}

impl GateGraph {
    /// Creates a graph of `gate_count` gates that all read the false
    /// constant. Only the outputs are live.
    pub fn new(gate_count: usize, output_size: usize) -> Result<Self> {
        if gate_count == 0 || gate_count % UNROLL != 0 {
            return Err(NandsynthError::GateCountNotUnrolled {
                gate_count,
                unroll: UNROLL,
            });
        }
        if output_size == 0 || output_size > gate_count {
            return Err(NandsynthError::InvalidOutputSize {
                output_size,
                gate_count,
            });
        }
        let mut live = LivenessBits::new(gate_count);
        live.set_range(gate_count - output_size, output_size, true);
        Ok(Self {
            operators: vec![NandOperator::new(FALSE_SLOT, FALSE_SLOT); gate_count],
            output_size,
            live,
            live_count: output_size,
        })
    }

    /// Builds a graph from an explicit gate list of any length.
    ///
    /// The list is left-padded with dead `nand(%0, %0)` gates up to the next
    /// multiple of the unroll factor and gate references are rebased, so the
    /// given gates keep their meaning and the outputs stay trailing.
    ///
    /// Gate `i` of `operators` may only read slots below
    /// `static_result_size + i`; anything else is a
    /// [`NandsynthError::ForwardReference`].
    pub fn from_operators(
        static_result_size: usize,
        operators: &[NandOperator],
        output_size: usize,
    ) -> Result<Self> {
        if output_size == 0 || output_size > operators.len() {
            return Err(NandsynthError::InvalidOutputSize {
                output_size,
                gate_count: operators.len(),
            });
        }
        for (gate, op) in operators.iter().enumerate() {
            if op.max_operand() >= static_result_size + gate {
                return Err(NandsynthError::ForwardReference {
                    gate,
                    slot: op.max_operand(),
                });
            }
        }
        let padding = (UNROLL - operators.len() % UNROLL) % UNROLL;
        let mut graph = Self::new(operators.len() + padding, output_size)?;
        let rebase = |slot: usize| {
            if slot >= static_result_size {
                slot + padding
            } else {
                slot
            }
        };
        for (i, op) in operators.iter().enumerate() {
            graph.operators[padding + i] = NandOperator::new(rebase(op.left), rebase(op.right));
        }
        graph.check_invariants_with_debug_assert(static_result_size);
        graph.recalculate_liveness(static_result_size);
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Gate indices of the outputs.
    pub fn output_range(&self) -> Range<usize> {
        self.len() - self.output_size..self.len()
    }

    pub fn is_output(&self, gate: usize) -> bool {
        gate >= self.len() - self.output_size
    }

    pub fn operators(&self) -> &[NandOperator] {
        &self.operators
    }

    pub fn operators_mut(&mut self) -> &mut [NandOperator] {
        &mut self.operators
    }

    pub fn liveness(&self) -> &LivenessBits {
        &self.live
    }

    pub fn is_live(&self, gate: usize) -> bool {
        self.live.get(gate)
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [NandOperator], &mut LivenessBits) {
        (&mut self.operators, &mut self.live)
    }

    /// Resets liveness to "only outputs live" and propagates backwards.
    /// Returns the number of live gates.
    pub fn recalculate_liveness(&mut self, static_result_size: usize) -> usize {
        self.live.clear();
        let first_output = self.len() - self.output_size;
        self.live.set_range(first_output, self.output_size, true);
        self.live_count =
            liveness::recalculate_remaining_liveness(static_result_size, &self.operators, &mut self.live);
        self.live_count
    }

    /// Evaluates every gate; see [`eval::evaluate`].
    pub fn evaluate<'a>(&self, buffer: &'a mut ValueBuffer) -> Result<&'a [Lanes]> {
        eval::evaluate(self, buffer)
    }

    /// Evaluates only live gates; see [`eval::evaluate_live`].
    pub fn evaluate_live<'a>(&self, buffer: &'a mut ValueBuffer) -> Result<&'a [Lanes]> {
        eval::evaluate_live(self, buffer)
    }

    /// Deep copy; the result shares no storage with `self`.
    pub fn copy(&self) -> GateGraph {
        self.clone()
    }

    /// Overwrites gates and liveness with `other`'s. Both graphs must have the
    /// same gate count.
    pub fn copy_from(&mut self, other: &GateGraph) {
        debug_assert_eq!(self.len(), other.len());
        debug_assert_eq!(self.output_size, other.output_size);
        self.operators.copy_from_slice(&other.operators);
        self.live.copy_from(&other.live);
        self.live_count = other.live_count;
    }

    /// Renders the live gates, one per line, e.g. `g3 = nand(p0, g1)`.
    pub fn describe(&self, static_result_size: usize) -> String {
        let name = |slot: usize| -> String {
            if slot == FALSE_SLOT {
                "false".to_string()
            } else if slot < CONSTANT_COUNT {
                "true".to_string()
            } else if slot < static_result_size {
                format!("p{}", slot - CONSTANT_COUNT)
            } else {
                format!("g{}", slot - static_result_size)
            }
        };
        let mut out = String::new();
        for (gate, op) in self.operators.iter().enumerate() {
            if !self.live.get(gate) {
                continue;
            }
            let marker = if self.is_output(gate) { " (output)" } else { "" };
            let _ = writeln!(
                out,
                "g{} = nand({}, {}){}",
                gate,
                name(op.left),
                name(op.right),
                marker
            );
        }
        out
    }

    /// Panics if any gate reads a slot at or after its own. No-op in release
    /// builds.
    pub fn check_invariants_with_debug_assert(&self, static_result_size: usize) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (gate, op) in self.operators.iter().enumerate() {
            assert!(
                op.max_operand() < static_result_size + gate,
                "gate {} reads slot {} at or after its own slot {}",
                gate,
                op.max_operand(),
                static_result_size + gate
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 1; "no gates")]
    #[test_case(3, 1; "not a multiple of four")]
    #[test_case(10, 2; "ten gates")]
    fn test_new_rejects_non_unrolled_gate_count(gate_count: usize, output_size: usize) {
        assert_eq!(
            GateGraph::new(gate_count, output_size).unwrap_err(),
            NandsynthError::GateCountNotUnrolled {
                gate_count,
                unroll: UNROLL
            }
        );
    }

    #[test_case(4, 0; "zero outputs")]
    #[test_case(4, 5; "more outputs than gates")]
    fn test_new_rejects_bad_output_size(gate_count: usize, output_size: usize) {
        assert_eq!(
            GateGraph::new(gate_count, output_size).unwrap_err(),
            NandsynthError::InvalidOutputSize {
                output_size,
                gate_count
            }
        );
    }

    #[test]
    fn test_new_marks_only_outputs_live() {
        let graph = GateGraph::new(8, 3).unwrap();
        assert_eq!(
            graph.liveness().to_vec(),
            vec![false, false, false, false, false, true, true, true]
        );
        assert_eq!(graph.live_count(), 3);
        assert_eq!(graph.output_range(), 5..8);
    }

    #[test]
    fn test_from_operators_pads_and_rebases() {
        // One parameter, so gates start at slot 3.
        let graph = GateGraph::from_operators(
            3,
            &[NandOperator::new(2, 2), NandOperator::new(3, 3)],
            1,
        )
        .unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(
            graph.operators(),
            &[
                NandOperator::new(0, 0),
                NandOperator::new(0, 0),
                NandOperator::new(2, 2),
                NandOperator::new(5, 5),
            ]
        );
        assert_eq!(graph.liveness().to_vec(), vec![false, false, true, true]);
    }

    // One parameter, so gate i may read slots below 3 + i.
    #[test_case(&[NandOperator::new(5, 2), NandOperator::new(3, 3)], 0, 5; "reads later gate")]
    #[test_case(&[NandOperator::new(99, 3), NandOperator::new(3, 3)], 0, 99; "out of range")]
    #[test_case(&[NandOperator::new(2, 2), NandOperator::new(2, 4)], 1, 4; "reads itself")]
    fn test_from_operators_rejects_forward_reference(
        operators: &[NandOperator],
        gate: usize,
        slot: usize,
    ) {
        assert_eq!(
            GateGraph::from_operators(3, operators, 1).unwrap_err(),
            NandsynthError::ForwardReference { gate, slot }
        );
    }

    #[test]
    fn test_copy_is_independent() {
        let mut graph = GateGraph::new(4, 1).unwrap();
        graph.operators_mut()[3] = NandOperator::new(2, 2);
        graph.recalculate_liveness(3);
        let mut copy = graph.copy();
        copy.operators_mut()[3] = NandOperator::new(1, 1);
        copy.operators_mut()[2] = NandOperator::new(0, 1);
        copy.recalculate_liveness(3);
        assert_eq!(graph.operators()[3], NandOperator::new(2, 2));
        assert_eq!(graph.operators()[2], NandOperator::new(0, 0));
    }

    #[test]
    fn test_copy_from_overwrites_gates_and_liveness() {
        let mut source = GateGraph::new(4, 1).unwrap();
        source.operators_mut()[2] = NandOperator::new(2, 0);
        source.operators_mut()[3] = NandOperator::new(5, 5);
        source.recalculate_liveness(3);
        let mut target = GateGraph::new(4, 1).unwrap();
        target.copy_from(&source);
        assert_eq!(target, source);
        assert_eq!(target.live_count(), 2);
    }

    #[test]
    fn test_describe_lists_live_gates() {
        let graph = GateGraph::from_operators(
            4,
            &[NandOperator::new(2, 3), NandOperator::new(4, 4)],
            1,
        )
        .unwrap();
        assert_eq!(
            graph.describe(4),
            "g2 = nand(p0, p1)\ng3 = nand(g2, g2) (output)\n"
        );
    }
}
