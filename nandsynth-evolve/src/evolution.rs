// SPDX-License-Identifier: Apache-2.0

//! Population search with tournament replacement, mutation and crossover.
//!
//! One generation is three phases over a population of `N` graphs:
//!
//! - competitions: two random candidates are scored and the loser becomes an
//!   evolved copy of the winner;
//! - random evolutions: a random candidate is evolved in place;
//! - combining: three distinct candidates are ranked and the worst is replaced
//!   by a crossover of the other two.
//!
//! "Evolving" is either a semantics-preserving gate move, which keeps the
//! cached score, or a small rewire of a few random gates, which drops it only
//! if a live gate was touched.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;

use anyhow::ensure;
use nandsynth::{
    randomize, randomize_some, EquationProblem, GateGraph, GateMover, GraphCombiner, SlimScore,
    ValueBuffer,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::{should_continue, Progress, Solver};

#[derive(Clone, Debug)]
pub struct EvolutionOptions {
    pub gate_count: usize,
    pub candidate_count: usize,
    /// Competitions per generation, as a fraction of the population.
    pub competition_rate: f32,
    /// Fraction of the gates rewired by one small randomization.
    pub randomization_rate: f32,
    pub random_evolution_rate: f32,
    pub combining_rate: f32,
    /// Chance that an evolution is a gate move rather than a rewire.
    pub move_chance: f32,
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self {
            gate_count: 64,
            candidate_count: 200,
            competition_rate: 0.5,
            randomization_rate: 0.02,
            random_evolution_rate: 0.1,
            combining_rate: 0.05,
            move_chance: 0.3,
        }
    }
}

impl EvolutionOptions {
    fn per_generation(&self, rate: f32) -> usize {
        (self.candidate_count as f32 * rate) as usize
    }

    /// Gates rewired per small randomization; at least one.
    fn gates_to_randomize(&self) -> usize {
        ((self.gate_count as f32 * self.randomization_rate) as usize).max(1)
    }

    /// Rejects populations too small to combine and negative or NaN rates.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.candidate_count >= 3,
            "evolution needs at least 3 candidates, got {}",
            self.candidate_count
        );
        for (name, rate) in [
            ("competition_rate", self.competition_rate),
            ("randomization_rate", self.randomization_rate),
            ("random_evolution_rate", self.random_evolution_rate),
            ("combining_rate", self.combining_rate),
            ("move_chance", self.move_chance),
        ] {
            ensure!(
                rate.is_finite() && rate >= 0.0,
                "{} must be a non-negative number, got {}",
                name,
                rate
            );
        }
        Ok(())
    }

    /// Each combine consumes three distinct candidates for the generation.
    fn combines_per_generation(&self) -> usize {
        self.per_generation(self.combining_rate)
            .min(self.candidate_count / 3)
    }
}

struct ScoredGraph {
    graph: GateGraph,
    score: Option<SlimScore>,
}

fn ensure_scored(
    problem: &EquationProblem,
    buffer: &mut ValueBuffer,
    candidate: &mut ScoredGraph,
) -> anyhow::Result<SlimScore> {
    if let Some(score) = candidate.score {
        return Ok(score);
    }
    let score = problem.evaluate(&candidate.graph, buffer)?;
    candidate.score = Some(score);
    Ok(score)
}

/// Mutable references to two distinct elements.
pub(crate) fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b, "pair_mut() needs distinct indices");
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// One evolving population with its own random stream and scratch space.
///
/// [`EvolutionSolver`] runs a single population; the island solver runs
/// several side by side and swaps candidates between them.
pub(crate) struct Population {
    options: EvolutionOptions,
    rng: Pcg64Mcg,
    mover: GateMover,
    combiner: GraphCombiner,
    used: HashSet<usize>,
    buffer: ValueBuffer,
    child: GateGraph,
    candidates: Vec<ScoredGraph>,
}

impl Population {
    /// `candidate_count` freshly randomized graphs shaped for `problem`.
    pub(crate) fn new(
        options: &EvolutionOptions,
        problem: &EquationProblem,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let gate_count = options.gate_count;
        let output_count = problem.output_count();
        let static_result_size = problem.static_result_size();
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let mut candidates = Vec::with_capacity(options.candidate_count);
        for _ in 0..options.candidate_count {
            let mut graph = GateGraph::new(gate_count, output_count)?;
            randomize(&mut rng, &mut graph, static_result_size);
            candidates.push(ScoredGraph { graph, score: None });
        }
        Ok(Self {
            options: options.clone(),
            rng,
            mover: GateMover::new(gate_count),
            combiner: GraphCombiner::new(gate_count, output_count),
            used: HashSet::new(),
            buffer: problem.new_buffer(gate_count),
            child: GateGraph::new(gate_count, output_count)?,
            candidates,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Runs one generation and returns the number of iterations it counts
    /// for.
    pub(crate) fn generation(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
    ) -> anyhow::Result<u64> {
        let competitions = self.options.per_generation(self.options.competition_rate);
        let evolutions = self.options.per_generation(self.options.random_evolution_rate);
        let combines = self.options.combines_per_generation();
        let static_result_size = problem.static_result_size();

        for _ in 0..competitions {
            self.compete(problem, progress)?;
        }

        for _ in 0..evolutions {
            let index = self.rng.gen_range(0..self.candidates.len());
            evolve(
                &mut self.rng,
                &mut self.mover,
                &self.options,
                static_result_size,
                &mut self.candidates[index],
            );
        }

        self.used.clear();
        for _ in 0..combines {
            self.combine(problem)?;
        }

        Ok((competitions + evolutions + combines).max(1) as u64)
    }

    /// Index and score of the best candidate, scoring any stale ones.
    fn best(&mut self, problem: &EquationProblem) -> anyhow::Result<(usize, SlimScore)> {
        let mut best: Option<(usize, SlimScore)> = None;
        for index in 0..self.candidates.len() {
            let score = ensure_scored(problem, &mut self.buffer, &mut self.candidates[index])?;
            if best.map_or(true, |(_, best_score)| score < best_score) {
                best = Some((index, score));
            }
        }
        best.ok_or_else(|| anyhow::anyhow!("empty population"))
    }

    /// Evolves every candidate once, then puts a copy of the previous best
    /// back at a random index and offers it to `progress`. Returns the
    /// number of candidates touched.
    pub(crate) fn perturb_keeping_best(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
    ) -> anyhow::Result<u64> {
        let static_result_size = problem.static_result_size();
        let (best, score) = self.best(problem)?;
        self.child.copy_from(&self.candidates[best].graph);
        progress.offer_slim(score, &self.child, static_result_size);

        for candidate in self.candidates.iter_mut() {
            evolve(
                &mut self.rng,
                &mut self.mover,
                &self.options,
                static_result_size,
                candidate,
            );
        }

        let target = self.rng.gen_range(0..self.candidates.len());
        std::mem::swap(&mut self.candidates[target].graph, &mut self.child);
        self.candidates[target].score = Some(score);
        Ok(self.candidates.len() as u64)
    }

    /// Exchanges same-index candidates of `self` and `other`, each with
    /// probability one half.
    pub(crate) fn swap_candidates<R: Rng + ?Sized>(&mut self, other: &mut Population, rng: &mut R) {
        for (mine, theirs) in self.candidates.iter_mut().zip(other.candidates.iter_mut()) {
            if rng.gen::<bool>() {
                std::mem::swap(mine, theirs);
            }
        }
    }

    fn unused_candidate(&mut self) -> usize {
        loop {
            let index = self.rng.gen_range(0..self.options.candidate_count);
            if self.used.insert(index) {
                return index;
            }
        }
    }

    fn compete(&mut self, problem: &EquationProblem, progress: &Progress) -> anyhow::Result<()> {
        let first = self.rng.gen_range(0..self.candidates.len());
        let second = self.rng.gen_range(0..self.candidates.len());
        if first == second {
            return Ok(());
        }
        let first_score = ensure_scored(problem, &mut self.buffer, &mut self.candidates[first])?;
        let second_score = ensure_scored(problem, &mut self.buffer, &mut self.candidates[second])?;
        if first_score == second_score {
            return Ok(());
        }
        let (better, worse) = if first_score < second_score {
            (first, second)
        } else {
            (second, first)
        };

        let static_result_size = problem.static_result_size();
        let (winner, loser) = pair_mut(&mut self.candidates, better, worse);
        loser.graph.copy_from(&winner.graph);
        loser.score = winner.score;
        progress.offer_slim(
            first_score.min(second_score),
            &winner.graph,
            static_result_size,
        );
        evolve(
            &mut self.rng,
            &mut self.mover,
            &self.options,
            static_result_size,
            loser,
        );
        Ok(())
    }

    fn combine(&mut self, problem: &EquationProblem) -> anyhow::Result<()> {
        let mut family = [
            self.unused_candidate(),
            self.unused_candidate(),
            self.unused_candidate(),
        ];
        for index in family {
            ensure_scored(problem, &mut self.buffer, &mut self.candidates[index])?;
        }
        family.sort_by_key(|index| self.candidates[*index].score);
        let [best, second, worst] = family;

        let combined = self.combiner.combine(
            &mut self.rng,
            problem.static_result_size(),
            &self.candidates[best].graph,
            &self.candidates[second].graph,
            &mut self.child,
        )?;
        if !combined {
            log::debug!("combine rejected: children would not fit");
            return Ok(());
        }
        std::mem::swap(&mut self.candidates[worst].graph, &mut self.child);
        self.candidates[worst].score = None;
        Ok(())
    }
}

/// Either a semantics-preserving move, which keeps the cached score, or a
/// small rewire, which drops it if a live gate was touched.
fn evolve(
    rng: &mut Pcg64Mcg,
    mover: &mut GateMover,
    options: &EvolutionOptions,
    static_result_size: usize,
    candidate: &mut ScoredGraph,
) {
    if rng.gen::<f32>() < options.move_chance {
        mover.move_random_gate(rng, static_result_size, &mut candidate.graph);
    } else if randomize_some(
        rng,
        &mut candidate.graph,
        static_result_size,
        options.gates_to_randomize(),
    ) {
        candidate.score = None;
    }
}

pub struct EvolutionSolver {
    options: EvolutionOptions,
    seed: u64,
}

impl EvolutionSolver {
    pub fn new(options: EvolutionOptions, seed: u64) -> anyhow::Result<Self> {
        options.validate()?;
        Ok(Self { options, seed })
    }
}

impl Solver for EvolutionSolver {
    fn name(&self) -> &'static str {
        "evolution"
    }

    fn solve(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
        running: &AtomicBool,
    ) -> anyhow::Result<()> {
        let mut population = Population::new(&self.options, problem, self.seed)?;
        log::debug!(
            "evolution solver: {} candidates x {} gates",
            population.len(),
            self.options.gate_count
        );
        while should_continue(progress, running) {
            let iterations = population.generation(problem, progress)?;
            progress.add_iterations(iterations);
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
