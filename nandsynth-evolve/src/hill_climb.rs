// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::AtomicBool;

use anyhow::ensure;
use nandsynth::{randomize, rewire_random_gate, undo_rewire, EquationProblem, GateGraph};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::{should_continue, Progress, Solver};

#[derive(Clone, Debug)]
pub struct HillClimbOptions {
    pub gate_count: usize,
    /// Rewires without improvement before starting over from a random graph.
    pub stall_limit: u64,
}

impl Default for HillClimbOptions {
    fn default() -> Self {
        Self {
            gate_count: 64,
            stall_limit: 1_000_000,
        }
    }
}

/// Single-graph search: rewire one random gate, keep the change only if the
/// score strictly improves.
///
/// Rewires of dead gates cannot change the score and are kept without
/// evaluating. After `stall_limit` rewires without improvement the graph is
/// randomized from scratch.
pub struct HillClimbSolver {
    options: HillClimbOptions,
    rng: Pcg64Mcg,
}

impl HillClimbSolver {
    pub fn new(options: HillClimbOptions, seed: u64) -> anyhow::Result<Self> {
        ensure!(options.stall_limit > 0, "stall_limit must be positive");
        Ok(Self {
            options,
            rng: Pcg64Mcg::seed_from_u64(seed),
        })
    }
}

impl Solver for HillClimbSolver {
    fn name(&self) -> &'static str {
        "hill-climb"
    }

    fn solve(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
        running: &AtomicBool,
    ) -> anyhow::Result<()> {
        let gate_count = self.options.gate_count;
        let static_result_size = problem.static_result_size();
        let mut graph = GateGraph::new(gate_count, problem.output_count())?;
        let mut buffer = problem.new_buffer(gate_count);
        let mut restarts = 0u64;

        'restart: while should_continue(progress, running) {
            randomize(&mut self.rng, &mut graph, static_result_size);
            let mut score = problem.evaluate(&graph, &mut buffer)?;
            progress.add_iterations(1);
            progress.offer_slim(score, &graph, static_result_size);
            let mut stalled = 0u64;

            while should_continue(progress, running) {
                let rewire = rewire_random_gate(&mut self.rng, &mut graph, static_result_size);
                progress.add_iterations(1);
                if rewire.was_live {
                    let candidate = problem.evaluate(&graph, &mut buffer)?;
                    if candidate < score {
                        score = candidate;
                        stalled = 0;
                        progress.offer_slim(score, &graph, static_result_size);
                        continue;
                    }
                    undo_rewire(&mut graph, static_result_size, rewire);
                }
                stalled += 1;
                if stalled >= self.options.stall_limit {
                    restarts += 1;
                    log::debug!(
                        "hill climb stalled at wrong_bits={}, restart {}",
                        score.wrong_bits,
                        restarts
                    );
                    continue 'restart;
                }
            }
        }
        Ok(())
    }

    fn fork(&self, seed: u64) -> Box<dyn Solver> {
        Box::new(Self {
            options: self.options.clone(),
            rng: Pcg64Mcg::seed_from_u64(seed),
        })
    }
}
