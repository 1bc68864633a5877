// SPDX-License-Identifier: Apache-2.0

//! Relocates one live gate to a different free slot without changing what the
//! graph computes.
//!
//! A live gate at gate index `g` may sit anywhere strictly after the highest
//! slot it reads and strictly before the lowest live gate that reads it. Dead
//! gate positions inside that window are free; the gate's payload is copied
//! there, liveness follows it, and every later gate that read the old slot is
//! redirected to the new one.

use rand::Rng;

use crate::gate_graph::GateGraph;

#[derive(Debug, Clone, Copy)]
struct MoveWindow {
    /// Highest slot the gate reads.
    max_exclusive_lower: usize,
    /// Lowest slot of a live gate reading this gate.
    min_exclusive_upper: usize,
}

impl MoveWindow {
    const UNBOUNDED: MoveWindow = MoveWindow {
        max_exclusive_lower: 0,
        min_exclusive_upper: usize::MAX,
    };
}

/// A live gate with at least one free destination. Bounds are gate indices.
#[derive(Debug, Clone, Copy)]
struct MoveCandidate {
    gate: usize,
    first: usize,
    last: usize,
    free: usize,
}

/// Scratch space for [`GateMover::move_random_gate`], reused across calls.
#[derive(Debug, Clone, Default)]
pub struct GateMover {
    windows: Vec<MoveWindow>,
    live_prefix: Vec<usize>,
    candidates: Vec<MoveCandidate>,
}

impl GateMover {
    pub fn new(gate_count: usize) -> Self {
        Self {
            windows: Vec::with_capacity(gate_count),
            live_prefix: Vec::with_capacity(gate_count + 1),
            candidates: Vec::with_capacity(gate_count),
        }
    }

    /// Moves one uniformly chosen movable live gate to a uniformly chosen free
    /// slot in its window.
    ///
    /// Returns `false` when no live non-output gate has a free slot to move
    /// to; the graph is untouched in that case. Liveness must be current on
    /// entry and is current on exit.
    pub fn move_random_gate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        static_result_size: usize,
        graph: &mut GateGraph,
    ) -> bool {
        self.collect_candidates(static_result_size, graph);
        if self.candidates.is_empty() {
            log::trace!("move_random_gate: no movable gate");
            return false;
        }

        let candidate = self.candidates[rng.gen_range(0..self.candidates.len())];
        let mut nth_free = rng.gen_range(0..candidate.free);
        let mut dest = None;
        for gate in candidate.first..=candidate.last {
            if graph.is_live(gate) {
                continue;
            }
            if nth_free == 0 {
                dest = Some(gate);
                break;
            }
            nth_free -= 1;
        }
        debug_assert!(
            dest.is_some(),
            "window [{}, {}] of gate {} should hold {} free slots",
            candidate.first,
            candidate.last,
            candidate.gate,
            candidate.free
        );
        let Some(dest) = dest else {
            return false;
        };

        move_gate_primitive(static_result_size, graph, candidate.gate, dest);
        true
    }

    fn collect_candidates(&mut self, static_result_size: usize, graph: &GateGraph) {
        let operators = graph.operators();
        let gate_count = operators.len();

        self.windows.clear();
        self.windows.resize(gate_count, MoveWindow::UNBOUNDED);
        for gate in (0..gate_count).rev() {
            if !graph.is_live(gate) {
                continue;
            }
            let op = operators[gate];
            self.windows[gate].max_exclusive_lower = op.max_operand();
            let slot = static_result_size + gate;
            for operand in [op.left, op.right] {
                if operand >= static_result_size {
                    let window = &mut self.windows[operand - static_result_size];
                    window.min_exclusive_upper = window.min_exclusive_upper.min(slot);
                }
            }
        }

        self.live_prefix.clear();
        self.live_prefix.push(0);
        for gate in 0..gate_count {
            let prev = self.live_prefix[gate];
            self.live_prefix.push(prev + graph.is_live(gate) as usize);
        }

        self.candidates.clear();
        for gate in 0..gate_count - graph.output_size() {
            if !graph.is_live(gate) {
                continue;
            }
            let window = self.windows[gate];
            debug_assert!(
                window.min_exclusive_upper != usize::MAX,
                "live non-output gate {} has no live reader",
                gate
            );
            // Never into the constant/parameter region.
            let first_slot = (window.max_exclusive_lower + 1).max(static_result_size);
            let last_slot = window.min_exclusive_upper - 1;
            if last_slot < first_slot {
                continue;
            }
            let first = first_slot - static_result_size;
            let last = last_slot - static_result_size;
            let live_in_window = self.live_prefix[last + 1] - self.live_prefix[first];
            let free = last - first + 1 - live_in_window;
            if free > 0 {
                self.candidates.push(MoveCandidate {
                    gate,
                    first,
                    last,
                    free,
                });
            }
        }
    }
}

/// Moves the gate at `from` to the dead position `to` and redirects readers.
///
/// Only gates after `to` are redirected: every live reader sits after the
/// window, and a dead gate before `to` keeps reading the stale copy left at
/// `from`, so no gate ever reads forward.
pub fn move_gate_primitive(static_result_size: usize, graph: &mut GateGraph, from: usize, to: usize) {
    debug_assert!(graph.is_live(from) && !graph.is_live(to));
    debug_assert!(!graph.is_output(from));
    let (operators, live) = graph.parts_mut();
    operators[to] = operators[from];
    live.set(from, false);
    live.set(to, true);

    let from_slot = static_result_size + from;
    let to_slot = static_result_size + to;
    for op in operators[to + 1..].iter_mut() {
        if op.reads(from_slot) {
            *op = op.redirect(from_slot, to_slot);
        }
    }
    log::trace!("moved gate {} -> {}", from, to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nand_operator::NandOperator;
    use crate::value_buffer::ValueBuffer;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    // One parameter: %2. Gates start at slot 3.
    //   g0 %3 = dead
    //   g1 %4 = nand(p0, p0)          live, read by g3
    //   g2 %5 = dead
    //   g3 %6 = nand(%4, %4)          output
    fn sparse_graph() -> GateGraph {
        let mut graph = GateGraph::new(4, 1).unwrap();
        graph.operators_mut().copy_from_slice(&[
            NandOperator::new(0, 1),
            NandOperator::new(2, 2),
            NandOperator::new(1, 2),
            NandOperator::new(4, 4),
        ]);
        graph.recalculate_liveness(3);
        graph
    }

    #[test]
    fn test_move_has_exactly_two_destinations() {
        for seed in 0..32 {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            let mut graph = sparse_graph();
            let mut mover = GateMover::new(graph.len());
            assert!(mover.move_random_gate(&mut rng, 3, &mut graph));
            let moved_to = if graph.is_live(0) { 0 } else { 2 };
            assert!(!graph.is_live(1));
            assert_eq!(graph.operators()[moved_to], NandOperator::new(2, 2));
            let new_slot = 3 + moved_to;
            assert_eq!(graph.operators()[3], NandOperator::new(new_slot, new_slot));
            assert_eq!(graph.live_count(), 2);
        }
    }

    #[test]
    fn test_move_preserves_outputs() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let mut graph = sparse_graph();
        let mut buffer = ValueBuffer::new(1, 4);
        buffer.set_parameters(&[crate::lanes::Lanes([0b10, 7, 0, 1])]).unwrap();
        let before = graph.evaluate(&mut buffer).unwrap().to_vec();
        GateMover::new(4).move_random_gate(&mut rng, 3, &mut graph);
        assert_eq!(graph.evaluate(&mut buffer).unwrap(), &before[..]);
    }

    #[test]
    fn test_no_movable_gate_is_noop() {
        // Dense chain: every position is live, nothing can move.
        let mut graph = GateGraph::new(4, 1).unwrap();
        graph.operators_mut().copy_from_slice(&[
            NandOperator::new(2, 2),
            NandOperator::new(3, 3),
            NandOperator::new(4, 4),
            NandOperator::new(5, 5),
        ]);
        graph.recalculate_liveness(3);
        let before = graph.copy();
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        assert!(!GateMover::new(4).move_random_gate(&mut rng, 3, &mut graph));
        assert_eq!(graph, before);
    }

    #[test]
    fn test_only_outputs_live_is_noop() {
        let mut graph = GateGraph::new(8, 2).unwrap();
        graph.recalculate_liveness(2);
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        assert!(!GateMover::new(8).move_random_gate(&mut rng, 2, &mut graph));
    }

    #[test]
    fn test_dead_reader_before_destination_keeps_stale_slot() {
        // One parameter: %2. Gates start at slot 3.
        //   g0 %3 = nand(p0, p0)   live, read by g3
        //   g1 %4 = nand(%3, %3)   dead reader of g0
        //   g2 %5 = dead
        //   g3 %6 = nand(%3, p0)   output
        let mut graph = GateGraph::new(4, 1).unwrap();
        graph.operators_mut().copy_from_slice(&[
            NandOperator::new(2, 2),
            NandOperator::new(3, 3),
            NandOperator::new(0, 0),
            NandOperator::new(3, 2),
        ]);
        graph.recalculate_liveness(3);
        move_gate_primitive(3, &mut graph, 0, 2);
        assert_eq!(graph.operators()[1], NandOperator::new(3, 3));
        assert_eq!(graph.operators()[2], NandOperator::new(2, 2));
        assert_eq!(graph.operators()[3], NandOperator::new(5, 2));
        graph.check_invariants_with_debug_assert(3);
        assert_eq!(graph.liveness().to_vec(), vec![false, false, true, true]);
    }
}
