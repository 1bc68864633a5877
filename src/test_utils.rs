// SPDX-License-Identifier: Apache-2.0

//! Builders for random and hand-written problems, shared by unit tests,
//! integration tests and benchmarks.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::eval::UNROLL;
use crate::gate_graph::GateGraph;
use crate::mutators::randomize;
use crate::nand_operator::NandOperator;
use crate::problem::EquationProblem;
use crate::value_buffer::ValueBuffer;

/// A problem together with a graph and buffer shaped for it.
pub struct ProblemParts {
    pub graph: GateGraph,
    pub buffer: ValueBuffer,
    pub problem: EquationProblem,
}

impl ProblemParts {
    pub fn static_result_size(&self) -> usize {
        self.buffer.static_result_size()
    }
}

/// Random rows. Duplicate inputs with conflicting outputs are allowed; the
/// table only has to be well-formed, not solvable.
pub fn random_truth_table<R: Rng + ?Sized>(
    rng: &mut R,
    parameter_count: usize,
    output_count: usize,
    row_count: usize,
) -> Vec<(Vec<bool>, Vec<bool>)> {
    (0..row_count)
        .map(|_| {
            let inputs = (0..parameter_count).map(|_| rng.gen()).collect();
            let outputs = (0..output_count).map(|_| rng.gen()).collect();
            (inputs, outputs)
        })
        .collect()
}

/// A randomly shaped problem with a randomized graph and current liveness.
pub fn create_random_equation(seed: u64) -> ProblemParts {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    create_random_equation_with_rng(&mut rng)
}

pub fn create_random_equation_with_rng<R: Rng + ?Sized>(rng: &mut R) -> ProblemParts {
    let parameter_count = rng.gen_range(1..=10);
    let output_count = rng.gen_range(1..=10);
    let row_count = rng.gen_range(1..=1000);
    let gate_count = rng.gen_range(10..=100usize).next_multiple_of(UNROLL);

    let rows = random_truth_table(rng, parameter_count, output_count, row_count);
    let mut parts = create_unset_equation(&rows, gate_count);
    let static_result_size = parts.static_result_size();
    randomize(rng, &mut parts.graph, static_result_size);
    parts
}

/// A problem over `rows` with a graph built from `operators` (padded as in
/// [`GateGraph::from_operators`]).
pub fn create_equation_with_examples(
    rows: &[(Vec<bool>, Vec<bool>)],
    operators: &[NandOperator],
) -> ProblemParts {
    let problem = EquationProblem::from_truth_table(rows).unwrap();
    let graph = GateGraph::from_operators(
        problem.static_result_size(),
        operators,
        problem.output_count(),
    )
    .unwrap();
    let buffer = problem.new_buffer(graph.len());
    ProblemParts {
        graph,
        buffer,
        problem,
    }
}

/// A problem over `rows` with a fresh, unrandomized graph.
pub fn create_unset_equation(rows: &[(Vec<bool>, Vec<bool>)], gate_count: usize) -> ProblemParts {
    let problem = EquationProblem::from_truth_table(rows).unwrap();
    let graph = GateGraph::new(gate_count, problem.output_count()).unwrap();
    let buffer = problem.new_buffer(gate_count);
    ProblemParts {
        graph,
        buffer,
        problem,
    }
}

/// Seeds for fuzz-style tests, themselves drawn from a fixed seed.
pub fn fuzz_seeds(count: usize) -> Vec<u64> {
    let mut rng = Pcg64Mcg::seed_from_u64(1);
    (0..count).map(|_| rng.gen()).collect()
}
