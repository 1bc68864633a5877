// SPDX-License-Identifier: Apache-2.0

//! Island model: several evolution populations run side by side in lockstep
//! rounds, each island on its own thread.
//!
//! A round starts by evolving every candidate of an island once while keeping
//! a copy of the island's best, then runs `generations_per_round` ordinary
//! generations. Between rounds two random islands trade candidates: each
//! index is swapped with probability one half.

use std::sync::atomic::AtomicBool;
use std::thread;

use anyhow::{anyhow, ensure};
use nandsynth::EquationProblem;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::evolution::{pair_mut, EvolutionOptions, Population};
use crate::{should_continue, Progress, Solver};

#[derive(Clone, Debug)]
pub struct IslandOptions {
    pub island_count: usize,
    /// Generations each island runs between exchanges.
    pub generations_per_round: usize,
    pub evolution: EvolutionOptions,
}

impl Default for IslandOptions {
    fn default() -> Self {
        Self {
            island_count: 4,
            generations_per_round: 20,
            evolution: EvolutionOptions::default(),
        }
    }
}

impl IslandOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.island_count > 0, "island_count must be positive");
        ensure!(
            self.generations_per_round > 0,
            "generations_per_round must be positive"
        );
        self.evolution.validate()
    }
}

/// Runs its islands on scoped threads of its own, so one instance already
/// uses `island_count` cores.
pub struct IslandSolver {
    options: IslandOptions,
    seed: u64,
}

impl IslandSolver {
    pub fn new(options: IslandOptions, seed: u64) -> anyhow::Result<Self> {
        options.validate()?;
        Ok(Self { options, seed })
    }
}

fn run_round(
    island: &mut Population,
    problem: &EquationProblem,
    progress: &Progress,
    running: &AtomicBool,
    generations: usize,
) -> anyhow::Result<()> {
    progress.add_iterations(island.perturb_keeping_best(problem, progress)?);
    for _ in 0..generations {
        if !should_continue(progress, running) {
            break;
        }
        progress.add_iterations(island.generation(problem, progress)?);
    }
    Ok(())
}

/// Trades candidates between two distinct random islands.
fn exchange<R: Rng + ?Sized>(rng: &mut R, islands: &mut [Population]) {
    if islands.len() < 2 {
        return;
    }
    let a = rng.gen_range(0..islands.len());
    let b = rng.gen_range(0..islands.len());
    if a == b {
        return;
    }
    let (first, second) = pair_mut(islands, a, b);
    first.swap_candidates(second, rng);
}

impl Solver for IslandSolver {
    fn name(&self) -> &'static str {
        "islands"
    }

    fn solve(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
        running: &AtomicBool,
    ) -> anyhow::Result<()> {
        let mut rng = Pcg64Mcg::seed_from_u64(self.seed);
        let mut islands = Vec::with_capacity(self.options.island_count);
        for _ in 0..self.options.island_count {
            islands.push(Population::new(
                &self.options.evolution,
                problem,
                rng.gen(),
            )?);
        }
        log::debug!(
            "island solver: {} islands x {} candidates",
            islands.len(),
            self.options.evolution.candidate_count
        );

        let generations = self.options.generations_per_round;
        let mut round = 0u64;
        while should_continue(progress, running) {
            let results: Vec<anyhow::Result<()>> = thread::scope(|s| {
                let handles: Vec<_> = islands
                    .iter_mut()
                    .map(|island| {
                        s.spawn(move || run_round(island, problem, progress, running, generations))
                    })
                    .collect();
                handles
                    .into_iter()
                    .enumerate()
                    .map(|(island_no, handle)| {
                        handle
                            .join()
                            .map_err(|_| anyhow!("island {} panicked", island_no))
                            .and_then(|result| result)
                    })
                    .collect()
            });
            for result in results {
                result?;
            }
            exchange(&mut rng, &mut islands);
            round += 1;
            log::trace!("island round {} done", round);
        }
        Ok(())
    }

    fn fork(&self, seed: u64) -> Box<dyn Solver> {
        Box::new(Self {
            options: self.options.clone(),
            seed,
        })
    }
}
