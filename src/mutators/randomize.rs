// SPDX-License-Identifier: Apache-2.0

use rand::Rng;

use crate::gate_graph::GateGraph;
use crate::nand_operator::NandOperator;

/// Draws a gate for gate index `gate` with both operands uniform over every
/// slot it may legally read.
#[inline]
fn random_operator<R: Rng + ?Sized>(rng: &mut R, static_result_size: usize, gate: usize) -> NandOperator {
    let bound = static_result_size + gate;
    NandOperator::new(rng.gen_range(0..bound), rng.gen_range(0..bound))
}

/// Rewires every gate at random and recomputes liveness.
pub fn randomize<R: Rng + ?Sized>(rng: &mut R, graph: &mut GateGraph, static_result_size: usize) {
    for (gate, op) in graph.operators_mut().iter_mut().enumerate() {
        *op = random_operator(rng, static_result_size, gate);
    }
    graph.recalculate_liveness(static_result_size);
}

/// Rewires `gate_count_to_randomize` randomly chosen gates (with replacement).
///
/// Returns `false` if none of the touched gates was live, in which case the
/// outputs cannot have changed and liveness is still current. Otherwise
/// liveness is recomputed and `true` is returned.
pub fn randomize_some<R: Rng + ?Sized>(
    rng: &mut R,
    graph: &mut GateGraph,
    static_result_size: usize,
    gate_count_to_randomize: usize,
) -> bool {
    let gate_count = graph.len();
    let mut touched_live = false;
    for _ in 0..gate_count_to_randomize {
        let gate = rng.gen_range(0..gate_count);
        touched_live |= graph.is_live(gate);
        graph.operators_mut()[gate] = random_operator(rng, static_result_size, gate);
    }

    if !touched_live {
        log::trace!(
            "randomize_some: {} gates touched, none live",
            gate_count_to_randomize
        );
        return false;
    }
    graph.recalculate_liveness(static_result_size);
    true
}

/// Undo record for [`rewire_random_gate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewire {
    pub gate: usize,
    pub previous: NandOperator,
    pub was_live: bool,
}

/// Rewires one uniformly chosen gate and returns what is needed to undo it.
///
/// Liveness is recomputed only if the gate was live; rewiring a dead gate
/// cannot change the outputs.
pub fn rewire_random_gate<R: Rng + ?Sized>(
    rng: &mut R,
    graph: &mut GateGraph,
    static_result_size: usize,
) -> Rewire {
    let gate = rng.gen_range(0..graph.len());
    let rewire = Rewire {
        gate,
        previous: graph.operators()[gate],
        was_live: graph.is_live(gate),
    };
    graph.operators_mut()[gate] = random_operator(rng, static_result_size, gate);
    if rewire.was_live {
        graph.recalculate_liveness(static_result_size);
    }
    rewire
}

/// Restores the gate changed by `rewire`, leaving liveness current.
pub fn undo_rewire(graph: &mut GateGraph, static_result_size: usize, rewire: Rewire) {
    graph.operators_mut()[rewire.gate] = rewire.previous;
    if rewire.was_live {
        graph.recalculate_liveness(static_result_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn test_randomize_never_reads_forward() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        for static_result_size in [2, 3, 12] {
            let mut graph = GateGraph::new(32, 4).unwrap();
            for _ in 0..50 {
                randomize(&mut rng, &mut graph, static_result_size);
                for (gate, op) in graph.operators().iter().enumerate() {
                    assert!(op.left < static_result_size + gate);
                    assert!(op.right < static_result_size + gate);
                }
            }
        }
    }

    #[test]
    fn test_randomize_some_zero_gates_is_noop() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut graph = GateGraph::new(8, 2).unwrap();
        randomize(&mut rng, &mut graph, 4);
        let before = graph.copy();
        assert!(!randomize_some(&mut rng, &mut graph, 4, 0));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_undo_rewire_restores_gates_and_liveness() {
        let mut rng = Pcg64Mcg::seed_from_u64(17);
        let mut graph = GateGraph::new(16, 2).unwrap();
        randomize(&mut rng, &mut graph, 5);
        let before = graph.copy();
        for _ in 0..200 {
            let rewire = rewire_random_gate(&mut rng, &mut graph, 5);
            assert_eq!(rewire.was_live, before.is_live(rewire.gate));
            let op = graph.operators()[rewire.gate];
            assert!(op.max_operand() < 5 + rewire.gate);
            undo_rewire(&mut graph, 5, rewire);
            assert_eq!(graph, before);
            assert_eq!(graph.live_count(), before.live_count());
        }
    }

    #[test]
    fn test_rewire_of_dead_gate_keeps_liveness() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        // Only the output is live; gates 0..3 are dead.
        let mut graph = GateGraph::new(4, 1).unwrap();
        graph.recalculate_liveness(3);
        let live_before = graph.liveness().to_vec();
        for _ in 0..50 {
            let rewire = rewire_random_gate(&mut rng, &mut graph, 3);
            if !rewire.was_live {
                assert_eq!(graph.liveness().to_vec(), live_before);
            }
            undo_rewire(&mut graph, 3, rewire);
        }
    }

    #[test]
    fn test_randomize_some_reports_live_touch() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        // Every gate is an output, so any touch hits a live gate.
        let mut graph = GateGraph::new(4, 4).unwrap();
        randomize(&mut rng, &mut graph, 3);
        assert!(randomize_some(&mut rng, &mut graph, 3, 1));
    }
}
