// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

use crate::gate_graph::GateGraph;

/// Every [`FullScore::metric`] of an exact score is below this, every other
/// one is at or above it.
pub const EXACT_METRIC_LIMIT: u64 = 1 << 32;

/// Cheap score: number of output bits that disagree with the examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SlimScore {
    pub wrong_bits: usize,
}

/// Score used to rank finished candidates.
///
/// Field order is the comparison order: correctness first, then size, then
/// the longest gate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FullScore {
    pub wrong_bits: usize,
    pub gate_count: usize,
    pub depth: usize,
}

impl SlimScore {
    pub fn new(wrong_bits: usize) -> Self {
        Self { wrong_bits }
    }

    pub fn is_exact(&self) -> bool {
        self.wrong_bits == 0
    }

    /// Adds the live gate count and depth of `graph`, whose liveness must be
    /// current.
    pub fn to_full(self, graph: &GateGraph, static_result_size: usize) -> FullScore {
        FullScore {
            wrong_bits: self.wrong_bits,
            gate_count: graph.live_count(),
            depth: live_depth(graph, static_result_size),
        }
    }
}

impl FullScore {
    pub const MAX: FullScore = FullScore {
        wrong_bits: usize::MAX,
        gate_count: usize::MAX,
        depth: usize::MAX,
    };

    /// Folds the score into one integer with the same ordering for any graph
    /// of up to 65535 gates.
    pub fn metric(&self) -> u64 {
        if *self == Self::MAX {
            return u64::MAX;
        }
        let gate_count = self.gate_count.min(0xffff) as u64;
        let depth = self.depth.min(0xffff) as u64;
        (self.wrong_bits as u64)
            .saturating_mul(EXACT_METRIC_LIMIT)
            .saturating_add(gate_count << 16)
            .saturating_add(depth)
    }
}

/// Length of the longest chain of live gates ending at an output.
///
/// A gate that only reads constants and parameters has depth 1.
pub fn live_depth(graph: &GateGraph, static_result_size: usize) -> usize {
    let mut depths = vec![0usize; graph.len()];
    let depth_of = |depths: &[usize], slot: usize| {
        if slot < static_result_size {
            0
        } else {
            depths[slot - static_result_size]
        }
    };
    for (gate, op) in graph.operators().iter().enumerate() {
        if !graph.is_live(gate) {
            continue;
        }
        depths[gate] = 1 + depth_of(&depths, op.left).max(depth_of(&depths, op.right));
    }
    graph
        .output_range()
        .map(|gate| depths[gate])
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nand_operator::NandOperator;

    #[test]
    fn test_full_score_orders_by_wrong_bits_then_size_then_depth() {
        let a = FullScore {
            wrong_bits: 0,
            gate_count: 9,
            depth: 9,
        };
        let b = FullScore {
            wrong_bits: 1,
            gate_count: 1,
            depth: 1,
        };
        let c = FullScore {
            wrong_bits: 0,
            gate_count: 9,
            depth: 3,
        };
        assert!(a < b);
        assert!(c < a);
        assert!(a.metric() < b.metric());
        assert!(c.metric() < a.metric());
        assert!(b.metric() < FullScore::MAX.metric());
        assert!(a.metric() < EXACT_METRIC_LIMIT);
        assert!(b.metric() >= EXACT_METRIC_LIMIT);
    }

    #[test]
    fn test_depth_counts_longest_live_chain() {
        // One parameter %2; gates from %3.
        //   g0 = nand(p0, p0)
        //   g1 = nand(g0, p0)
        //   g2 = nand(g1, g0)     depth 3
        //   g3 = nand(g2, p0)     output, depth 4
        let graph = GateGraph::from_operators(
            3,
            &[
                NandOperator::new(2, 2),
                NandOperator::new(3, 2),
                NandOperator::new(4, 3),
                NandOperator::new(5, 2),
            ],
            1,
        )
        .unwrap();
        let full = SlimScore::new(2).to_full(&graph, 3);
        assert_eq!(
            full,
            FullScore {
                wrong_bits: 2,
                gate_count: 4,
                depth: 4
            }
        );
    }

    #[test]
    fn test_output_reading_only_parameters_has_depth_one() {
        let graph = GateGraph::from_operators(3, &[NandOperator::new(2, 2)], 1).unwrap();
        assert_eq!(live_depth(&graph, 3), 1);
        assert_eq!(graph.live_count(), 1);
    }
}
