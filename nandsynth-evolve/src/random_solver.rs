// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::AtomicBool;

use nandsynth::{randomize, EquationProblem, GateGraph};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::{should_continue, Progress, Solver};

/// Draws a fresh random graph every iteration and keeps the best one seen.
pub struct RandomSolver {
    gate_count: usize,
    rng: Pcg64Mcg,
}

impl RandomSolver {
    pub fn new(gate_count: usize, seed: u64) -> Self {
        Self {
            gate_count,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }
}

impl Solver for RandomSolver {
    fn name(&self) -> &'static str {
        "random"
    }

    fn solve(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
        running: &AtomicBool,
    ) -> anyhow::Result<()> {
        let mut graph = GateGraph::new(self.gate_count, problem.output_count())?;
        let mut buffer = problem.new_buffer(self.gate_count);
        let static_result_size = problem.static_result_size();
        log::debug!(
            "random solver: {} gates, {} parameters",
            self.gate_count,
            problem.parameter_count()
        );

        while should_continue(progress, running) {
            randomize(&mut self.rng, &mut graph, static_result_size);
            let score = problem.evaluate(&graph, &mut buffer)?;
            progress.add_iterations(1);
            progress.offer_slim(score, &graph, static_result_size);
        }
        Ok(())
    }

    fn fork(&self, seed: u64) -> Box<dyn Solver> {
        Box::new(RandomSolver::new(self.gate_count, seed))
    }
}
