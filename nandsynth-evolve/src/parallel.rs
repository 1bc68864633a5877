// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::anyhow;
use nandsynth::EquationProblem;

use crate::{Progress, Solver};

pub type WorkerHandle = JoinHandle<anyhow::Result<()>>;

/// Starts `threads` forks of `prototype`, worker `i` seeded with `seed ^ i`.
///
/// Workers share only `progress` and `running`; each owns its population and
/// value buffer.
pub fn spawn_workers(
    prototype: &dyn Solver,
    threads: usize,
    seed: u64,
    problem: Arc<EquationProblem>,
    progress: Arc<Progress>,
    running: Arc<AtomicBool>,
) -> Vec<WorkerHandle> {
    let thread_count = threads.max(1);
    let mut handles = Vec::with_capacity(thread_count);
    for worker_no in 0..thread_count {
        let mut solver = prototype.fork(seed ^ worker_no as u64);
        let problem = problem.clone();
        let progress = progress.clone();
        let running = running.clone();
        handles.push(thread::spawn(move || {
            log::debug!("worker {} starting {} solver", worker_no, solver.name());
            let result = solver.solve(&problem, &progress, &running);
            if let Err(e) = &result {
                log::error!("worker {} failed: {:#}", worker_no, e);
                // One failed worker stops the run.
                running.store(false, Ordering::SeqCst);
            }
            result
        }));
    }
    handles
}

/// Waits for every worker and returns the first error, if any.
pub fn join_workers(handles: Vec<WorkerHandle>) -> anyhow::Result<()> {
    let mut first_error = None;
    for (worker_no, handle) in handles.into_iter().enumerate() {
        let result = handle
            .join()
            .map_err(|_| anyhow!("worker {} panicked", worker_no))
            .and_then(|result| result);
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs forks of `prototype` on `threads` threads until they all return.
pub fn run_parallel(
    prototype: &dyn Solver,
    threads: usize,
    seed: u64,
    problem: Arc<EquationProblem>,
    progress: Arc<Progress>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let handles = spawn_workers(prototype, threads, seed, problem, progress, running);
    join_workers(handles)
}
