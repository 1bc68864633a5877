// SPDX-License-Identifier: Apache-2.0

//! Search strategies that drive the `nandsynth` mutators toward a graph
//! matching an [`EquationProblem`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use nandsynth::score::EXACT_METRIC_LIMIT;
use nandsynth::{EquationProblem, FullScore, GateGraph, SlimScore};
use serde::Serialize;

pub mod evolution;
pub mod hill_climb;
pub mod islands;
pub mod parallel;
pub mod problems;
pub mod random_solver;
pub mod sample_average;

pub use evolution::{EvolutionOptions, EvolutionSolver};
pub use hill_climb::{HillClimbOptions, HillClimbSolver};
pub use islands::{IslandOptions, IslandSolver};
pub use random_solver::RandomSolver;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shared best-so-far candidate across threads.
pub struct Best<T> {
    pub cost: AtomicU64,
    pub value: Mutex<T>,
}

impl<T: Clone> Best<T> {
    pub fn new(initial_cost: u64, value: T) -> Self {
        Self {
            cost: AtomicU64::new(initial_cost),
            value: Mutex::new(value),
        }
    }

    /// Attempts to update the best-so-far candidate.
    ///
    /// Returns `true` if this call updated the global best, `false` otherwise.
    /// `cost` is only written while `value` is locked, and after it, so a
    /// reader that sees a cost always finds a value at least that good.
    pub fn try_update(&self, new_cost: u64, new_value: T) -> bool {
        if new_cost >= self.cost.load(Ordering::SeqCst) {
            return false;
        }
        let mut value = lock(&self.value);
        if new_cost >= self.cost.load(Ordering::SeqCst) {
            return false;
        }
        *value = new_value;
        self.cost.store(new_cost, Ordering::SeqCst);
        true
    }

    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// Cost and value read together.
    pub fn snapshot(&self) -> (u64, T) {
        let value = lock(&self.value);
        (self.cost.load(Ordering::SeqCst), value.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub score: FullScore,
    pub graph: GateGraph,
}

/// Snapshot of a run for display.
#[derive(Debug, Clone)]
pub struct SolverReport {
    pub iterations: u64,
    pub best: Candidate,
}

/// State shared by every worker of one run.
pub struct Progress {
    pub iterations: AtomicU64,
    pub best: Best<Option<Candidate>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    pub fn new() -> Self {
        Self {
            iterations: AtomicU64::new(0),
            best: Best::new(FullScore::MAX.metric(), None),
        }
    }

    pub fn add_iterations(&self, count: u64) {
        self.iterations.fetch_add(count, Ordering::Relaxed);
    }

    /// Whether a graph with this slim score could beat the current best.
    pub fn could_improve(&self, score: SlimScore) -> bool {
        let lower_bound = FullScore {
            wrong_bits: score.wrong_bits,
            gate_count: 0,
            depth: 0,
        };
        lower_bound.metric() < self.best.cost.load(Ordering::SeqCst)
    }

    /// Records `graph` as the new best if it beats the current one. The graph
    /// is only copied when it does.
    pub fn offer(&self, score: FullScore, graph: &GateGraph) -> bool {
        let cost = score.metric();
        if cost >= self.best.cost.load(Ordering::SeqCst) {
            return false;
        }
        let updated = self.best.try_update(
            cost,
            Some(Candidate {
                score,
                graph: graph.copy(),
            }),
        );
        if updated {
            log::info!(
                "new best: wrong_bits={} gates={} depth={}",
                score.wrong_bits,
                score.gate_count,
                score.depth
            );
        }
        updated
    }

    /// Scores `graph` fully and offers it, skipping the depth computation when
    /// the slim score already rules it out.
    pub fn offer_slim(&self, score: SlimScore, graph: &GateGraph, static_result_size: usize) -> bool {
        if !self.could_improve(score) {
            return false;
        }
        self.offer(score.to_full(graph, static_result_size), graph)
    }

    pub fn is_solved(&self) -> bool {
        self.best.cost.load(Ordering::SeqCst) < EXACT_METRIC_LIMIT
    }

    pub fn best_score(&self) -> Option<FullScore> {
        lock(&self.best.value).as_ref().map(|candidate| candidate.score)
    }

    pub fn report(&self) -> Option<SolverReport> {
        let best = self.best.get()?;
        Some(SolverReport {
            iterations: self.iterations.load(Ordering::Relaxed),
            best,
        })
    }
}

/// Summary printed by the driver; carries the winning gate list for display.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub problem: String,
    pub solver: String,
    pub threads: usize,
    pub iterations: u64,
    pub elapsed_secs: f64,
    pub interrupted: bool,
    pub best_score: Option<FullScore>,
    pub gates: Vec<String>,
}

impl RunSummary {
    pub fn gate_lines(graph: &GateGraph, static_result_size: usize) -> Vec<String> {
        graph
            .describe(static_result_size)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// A search strategy. One instance runs on one thread; [`Solver::fork`]
/// produces independent instances for parallel workers.
pub trait Solver: Send {
    fn name(&self) -> &'static str;

    /// Searches until `running` is cleared or `progress` holds an exact
    /// solution.
    fn solve(
        &mut self,
        problem: &EquationProblem,
        progress: &Progress,
        running: &AtomicBool,
    ) -> anyhow::Result<()>;

    /// A fresh solver with the same settings and its own random stream.
    fn fork(&self, seed: u64) -> Box<dyn Solver>;
}

pub(crate) fn should_continue(progress: &Progress, running: &AtomicBool) -> bool {
    running.load(Ordering::SeqCst) && !progress.is_solved()
}
