// SPDX-License-Identifier: Apache-2.0

//! Graph crossover: builds a child whose outputs are each inherited, together
//! with their live fan-in, from one of two parents.
//!
//! Inherited front gates are packed at the start of the child in parent order
//! (parent A first) with gate references translated through an old-to-new
//! table. Output gates keep their trailing positions.
//!
//! If a parent output reads another output of the same parent, selecting the
//! first pulls the second in too, and whichever parent is copied last owns the
//! shared output slot. The child is still a valid graph; it just leans toward
//! that parent.

use rand::Rng;

use crate::gate_graph::GateGraph;
use crate::liveness::{recalculate_remaining_liveness, LivenessBits};
use crate::nand_operator::NandOperator;
use crate::nandsynth_error::{NandsynthError, Result};

/// Scratch space for [`GraphCombiner::combine`], sized for one graph shape.
#[derive(Debug, Clone)]
pub struct GraphCombiner {
    selected_a: LivenessBits,
    selected_b: LivenessBits,
    output_from_a: Vec<bool>,
    old_to_new: Vec<usize>,
}

impl GraphCombiner {
    pub fn new(gate_count: usize, output_count: usize) -> Self {
        Self {
            selected_a: LivenessBits::new(gate_count),
            selected_b: LivenessBits::new(gate_count),
            output_from_a: vec![false; output_count],
            old_to_new: vec![0; gate_count],
        }
    }

    /// Overwrites `child` with a crossover of `parent_a` and `parent_b`.
    ///
    /// Returns `Ok(false)` without touching `child` when the two chosen
    /// subgraphs do not fit in the child's non-output gates. Both parents must
    /// have current liveness; the child's is recomputed on success.
    pub fn combine<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        static_result_size: usize,
        parent_a: &GateGraph,
        parent_b: &GateGraph,
        child: &mut GateGraph,
    ) -> Result<bool> {
        let output_size = self.output_from_a.len();
        for graph in [parent_a, parent_b, &*child] {
            if graph.output_size() != output_size {
                return Err(NandsynthError::OutputSizeMismatch {
                    expected: output_size,
                    got: graph.output_size(),
                });
            }
            if graph.len() != self.old_to_new.len() {
                return Err(NandsynthError::GraphSizeMismatch {
                    expected: self.old_to_new.len(),
                    got: graph.len(),
                });
            }
        }

        for from_a in self.output_from_a.iter_mut() {
            *from_a = rng.gen();
        }

        let front_a = select_outputs(
            static_result_size,
            parent_a,
            &self.output_from_a,
            true,
            &mut self.selected_a,
        );
        let front_b = select_outputs(
            static_result_size,
            parent_b,
            &self.output_from_a,
            false,
            &mut self.selected_b,
        );
        let capacity = child.len() - output_size;
        if front_a + front_b > capacity {
            log::trace!(
                "combine: {} + {} inherited gates exceed capacity {}",
                front_a,
                front_b,
                capacity
            );
            return Ok(false);
        }

        let next = copy_selected(
            static_result_size,
            parent_a,
            &self.selected_a,
            &mut self.old_to_new,
            child,
            0,
        );
        let next = copy_selected(
            static_result_size,
            parent_b,
            &self.selected_b,
            &mut self.old_to_new,
            child,
            next,
        );
        debug_assert_eq!(next, front_a + front_b);

        child.recalculate_liveness(static_result_size);
        child.check_invariants_with_debug_assert(static_result_size);
        Ok(true)
    }
}

/// Marks the fan-in of the outputs whose coin matches `take` and returns how
/// many non-output gates were marked.
fn select_outputs(
    static_result_size: usize,
    parent: &GateGraph,
    output_from_a: &[bool],
    take: bool,
    selected: &mut LivenessBits,
) -> usize {
    selected.clear();
    let first_output = parent.len() - parent.output_size();
    for (i, from_a) in output_from_a.iter().enumerate() {
        if *from_a == take {
            selected.set(first_output + i, true);
        }
    }
    recalculate_remaining_liveness(static_result_size, parent.operators(), selected);
    (0..first_output).filter(|gate| selected.get(*gate)).count()
}

fn copy_selected(
    static_result_size: usize,
    parent: &GateGraph,
    selected: &LivenessBits,
    old_to_new: &mut [usize],
    child: &mut GateGraph,
    mut next: usize,
) -> usize {
    let first_output = parent.len() - parent.output_size();
    let remap = |old_to_new: &[usize], slot: usize| {
        if slot < static_result_size {
            slot
        } else {
            static_result_size + old_to_new[slot - static_result_size]
        }
    };
    let translate = |old_to_new: &[usize], op: NandOperator| {
        NandOperator::new(remap(old_to_new, op.left), remap(old_to_new, op.right))
    };

    let operators = parent.operators();
    for gate in 0..first_output {
        if !selected.get(gate) {
            continue;
        }
        child.operators_mut()[next] = translate(old_to_new, operators[gate]);
        old_to_new[gate] = next;
        next += 1;
    }
    for gate in first_output..parent.len() {
        if !selected.get(gate) {
            continue;
        }
        child.operators_mut()[gate] = translate(old_to_new, operators[gate]);
        old_to_new[gate] = gate;
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::Lanes;
    use crate::value_buffer::ValueBuffer;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    // Two parameters x = %2, y = %3; gate g lives in slot 4 + g.
    const STATIC: usize = 4;

    fn graph_with(ops: [NandOperator; 8]) -> GateGraph {
        let mut graph = GateGraph::new(8, 2).unwrap();
        graph.operators_mut().copy_from_slice(&ops);
        graph.recalculate_liveness(STATIC);
        graph
    }

    // Outputs: (x & y, !x).
    fn parent_a() -> GateGraph {
        let z = NandOperator::new(0, 0);
        graph_with([
            NandOperator::new(2, 3),
            z,
            z,
            z,
            z,
            z,
            NandOperator::new(4, 4),
            NandOperator::new(2, 2),
        ])
    }

    // Outputs: (x | y, !(x & y)).
    fn parent_b() -> GateGraph {
        let z = NandOperator::new(0, 0);
        graph_with([
            z,
            z,
            NandOperator::new(2, 2),
            NandOperator::new(3, 3),
            z,
            z,
            NandOperator::new(6, 7),
            NandOperator::new(2, 3),
        ])
    }

    fn outputs(graph: &GateGraph) -> Vec<Lanes> {
        let mut buffer = ValueBuffer::new(2, graph.len());
        buffer
            .set_parameters(&[Lanes([0b0011, 0, 0, 0]), Lanes([0b0101, 0, 0, 0])])
            .unwrap();
        graph.evaluate(&mut buffer).unwrap().to_vec()
    }

    #[test]
    fn test_child_outputs_come_from_one_parent_each() {
        let a = parent_a();
        let b = parent_b();
        let (out_a, out_b) = (outputs(&a), outputs(&b));
        let mut combiner = GraphCombiner::new(8, 2);
        let mut saw_mixed = false;
        for seed in 0..64 {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            let mut child = GateGraph::new(8, 2).unwrap();
            assert!(combiner.combine(&mut rng, STATIC, &a, &b, &mut child).unwrap());
            let out_child = outputs(&child);
            for i in 0..2 {
                assert!(
                    out_child[i] == out_a[i] || out_child[i] == out_b[i],
                    "seed {} output {}",
                    seed,
                    i
                );
            }
            saw_mixed |= out_child[0] == out_a[0] && out_child[1] == out_b[1];
        }
        assert!(saw_mixed);
    }

    #[test]
    fn test_inherited_gates_are_packed_at_front() {
        let a = parent_a();
        let b = parent_b();
        let mut combiner = GraphCombiner::new(8, 2);
        for seed in 0..32 {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            let mut child = GateGraph::new(8, 2).unwrap();
            combiner.combine(&mut rng, STATIC, &a, &b, &mut child).unwrap();
            let live_front = child.live_count() - 2;
            for gate in 0..live_front {
                assert!(child.is_live(gate), "seed {} gate {}", seed, gate);
            }
            child.check_invariants_with_debug_assert(STATIC);
        }
    }

    #[test]
    fn test_over_capacity_leaves_child_untouched() {
        // Both outputs read the same six-gate chain, filling the front.
        let chain = graph_with([
            NandOperator::new(2, 3),
            NandOperator::new(4, 2),
            NandOperator::new(5, 3),
            NandOperator::new(6, 4),
            NandOperator::new(7, 5),
            NandOperator::new(8, 7),
            NandOperator::new(9, 9),
            NandOperator::new(9, 2),
        ]);
        assert_eq!(chain.live_count(), 8);
        let mut combiner = GraphCombiner::new(8, 2);
        let (mut fits, mut rejected) = (0, 0);
        for seed in 0..64 {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            let mut child = GateGraph::new(8, 2).unwrap();
            let before = child.copy();
            if combiner
                .combine(&mut rng, STATIC, &chain, &chain, &mut child)
                .unwrap()
            {
                fits += 1;
                assert_eq!(outputs(&child), outputs(&chain));
            } else {
                rejected += 1;
                assert_eq!(child, before);
            }
        }
        assert!(fits > 0 && rejected > 0);
    }

    #[test]
    fn test_rejects_mismatched_output_size() {
        let a = parent_a();
        let b = GateGraph::new(8, 1).unwrap();
        let mut child = GateGraph::new(8, 2).unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        assert_eq!(
            GraphCombiner::new(8, 2)
                .combine(&mut rng, STATIC, &a, &b, &mut child)
                .unwrap_err(),
            NandsynthError::OutputSizeMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_rejects_mismatched_gate_count() {
        let a = parent_a();
        let b = parent_b();
        let mut child = GateGraph::new(12, 2).unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        assert_eq!(
            GraphCombiner::new(8, 2)
                .combine(&mut rng, STATIC, &a, &b, &mut child)
                .unwrap_err(),
            NandsynthError::GraphSizeMismatch {
                expected: 8,
                got: 12
            }
        );
    }
}
