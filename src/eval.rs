// SPDX-License-Identifier: Apache-2.0

//! Bit-parallel evaluation of a [`GateGraph`] over a [`ValueBuffer`].
//!
//! Every slot holds a 256-wide [`Lanes`] vector, so one pass over the gates
//! evaluates the circuit for a whole batch of truth-table rows. Gates are
//! processed in ascending order, in unrolled groups of [`UNROLL`]; within a
//! group the gates still run in order because a gate may read the result of
//! the gate just before it.

use crate::gate_graph::GateGraph;
use crate::lanes::Lanes;
use crate::nand_operator::NandOperator;
use crate::nandsynth_error::{NandsynthError, Result};
use crate::value_buffer::ValueBuffer;

/// Gates per unrolled group. Graph gate counts must be a multiple of this.
pub const UNROLL: usize = 4;

#[inline(always)]
fn nand_into(slots: &mut [Lanes], op: NandOperator, dest: usize) {
    debug_assert!(op.max_operand() < dest, "{} read from slot {}", op, dest);
    let value = op.nand(slots);
    slots[dest] = value;
}

fn check_shapes(graph: &GateGraph, buffer: &ValueBuffer) -> Result<()> {
    if graph.len() != buffer.gate_count() {
        return Err(NandsynthError::GateCountMismatch {
            graph: graph.len(),
            buffer: buffer.gate_count(),
        });
    }
    Ok(())
}

fn output_view<'a>(graph: &GateGraph, buffer: &'a ValueBuffer) -> &'a [Lanes] {
    let results = buffer.results();
    &results[results.len() - graph.output_size()..]
}

/// Computes every gate and returns the output slots.
///
/// The returned slice borrows the buffer; it is a view, not a copy.
pub fn evaluate<'a>(graph: &GateGraph, buffer: &'a mut ValueBuffer) -> Result<&'a [Lanes]> {
    check_shapes(graph, buffer)?;
    let static_result_size = buffer.static_result_size();
    let slots = buffer.slots_mut();
    for (group, ops) in graph.operators().chunks_exact(UNROLL).enumerate() {
        let base = static_result_size + group * UNROLL;
        nand_into(slots, ops[0], base);
        nand_into(slots, ops[1], base + 1);
        nand_into(slots, ops[2], base + 2);
        nand_into(slots, ops[3], base + 3);
    }
    let buffer: &'a ValueBuffer = buffer;
    Ok(output_view(graph, buffer))
}

/// Like [`evaluate`] but skips dead gates, whose slots are left stale.
///
/// Only valid while the graph's liveness is current.
pub fn evaluate_live<'a>(graph: &GateGraph, buffer: &'a mut ValueBuffer) -> Result<&'a [Lanes]> {
    check_shapes(graph, buffer)?;
    let static_result_size = buffer.static_result_size();

    #[cfg(debug_assertions)]
    {
        let (fresh, _) = crate::liveness::compute_liveness(
            static_result_size,
            graph.operators(),
            graph.output_size(),
        );
        assert!(
            fresh == *graph.liveness(),
            "evaluate_live() called with stale liveness"
        );
    }

    let live = graph.liveness();
    let slots = buffer.slots_mut();
    for (group, ops) in graph.operators().chunks_exact(UNROLL).enumerate() {
        let first_gate = group * UNROLL;
        let base = static_result_size + first_gate;
        for (offset, op) in ops.iter().enumerate() {
            if live.get(first_gate + offset) {
                nand_into(slots, *op, base + offset);
            }
        }
    }
    let buffer: &'a ValueBuffer = buffer;
    Ok(output_view(graph, buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two parameters: slots 2 and 3, gates from slot 4.
    fn and_graph() -> GateGraph {
        GateGraph::from_operators(
            4,
            &[NandOperator::new(2, 3), NandOperator::new(4, 4)],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_and() {
        let graph = and_graph();
        let mut buffer = ValueBuffer::new(2, graph.len());
        let a = Lanes([0b0011, 0, u64::MAX, 0]);
        let b = Lanes([0b0101, u64::MAX, u64::MAX, 0]);
        buffer.set_parameters(&[a, b]).unwrap();
        let out = graph.evaluate(&mut buffer).unwrap();
        assert_eq!(out, &[a & b]);
    }

    #[test]
    fn test_live_only_matches_full_on_outputs() {
        let graph = and_graph();
        let a = Lanes([0xf0f0, 1, 2, 3]);
        let b = Lanes([0xff00, 3, 2, 1]);
        let mut full = ValueBuffer::new(2, graph.len());
        full.set_parameters(&[a, b]).unwrap();
        let mut live = ValueBuffer::new(2, graph.len());
        live.set_parameters(&[a, b]).unwrap();
        assert_eq!(
            graph.evaluate(&mut full).unwrap(),
            graph.evaluate_live(&mut live).unwrap()
        );
        // The padding gates are dead and never written in live-only mode.
        assert_eq!(live.results()[0], Lanes::ZERO);
        assert_eq!(full.results()[0], Lanes::ONES);
    }

    #[test]
    fn test_constants_give_free_not() {
        // g0 = nand(true, true) = false; g1..g3 = nand(false, x) = true.
        let mut graph = GateGraph::new(4, 4).unwrap();
        graph.operators_mut().copy_from_slice(&[
            NandOperator::new(1, 1),
            NandOperator::new(0, 2),
            NandOperator::new(0, 0),
            NandOperator::new(1, 0),
        ]);
        graph.recalculate_liveness(2);
        let mut buffer = ValueBuffer::new(0, 4);
        let out = graph.evaluate(&mut buffer).unwrap();
        assert_eq!(out, &[Lanes::ZERO, Lanes::ONES, Lanes::ONES, Lanes::ONES]);
    }

    #[test]
    fn test_rejects_mismatched_buffer() {
        let graph = and_graph();
        let mut buffer = ValueBuffer::new(2, 8);
        assert_eq!(
            graph.evaluate(&mut buffer).unwrap_err(),
            NandsynthError::GateCountMismatch {
                graph: 4,
                buffer: 8
            }
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "stale liveness")]
    fn test_live_only_rejects_stale_liveness() {
        let mut graph = and_graph();
        graph.operators_mut()[3] = NandOperator::new(2, 3);
        let mut buffer = ValueBuffer::new(2, graph.len());
        let _ = graph.evaluate_live(&mut buffer);
    }
}
