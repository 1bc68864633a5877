// SPDX-License-Identifier: Apache-2.0

//! Truth table -> NAND circuit search, on all cores.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nandsynth_evolve::parallel::{join_workers, spawn_workers};
use nandsynth_evolve::problems::{build_problem, ProblemKind};
use nandsynth_evolve::sample_average::SampleAverage;
use nandsynth_evolve::{
    EvolutionOptions, EvolutionSolver, HillClimbOptions, HillClimbSolver, IslandOptions,
    IslandSolver, Progress, RandomSolver, RunSummary, Solver,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SolverKind {
    Random,
    Evolution,
    /// Evolution populations on every thread that trade candidates.
    Islands,
    HillClimb,
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct CliArgs {
    /// Truth table to synthesize.
    #[clap(long, value_enum, default_value_t = ProblemKind::Add)]
    problem: ProblemKind,

    /// Operand width for the arithmetic problems.
    #[clap(long, default_value_t = 4)]
    bits: usize,

    /// Number of sampled rows for the arithmetic problems.
    #[clap(long, default_value_t = 1000)]
    examples: usize,

    /// Gates per candidate graph; must be a multiple of 4.
    #[clap(long, default_value_t = 64)]
    gates: usize,

    #[clap(long, value_enum, default_value_t = SolverKind::Evolution)]
    solver: SolverKind,

    /// Worker threads. Defaults to the number of CPUs.
    #[clap(long)]
    threads: Option<usize>,

    /// Random seed; worker `i` uses `seed ^ i`.
    #[clap(short = 'S', long, default_value_t = 1)]
    seed: u64,

    /// Stop after this many seconds even if no exact circuit was found.
    #[clap(long)]
    max_seconds: Option<u64>,

    #[clap(long, default_value_t = 200)]
    candidates: usize,

    #[clap(long, default_value_t = 0.5)]
    competition_rate: f32,

    #[clap(long, default_value_t = 0.02)]
    randomization_rate: f32,

    #[clap(long, default_value_t = 0.1)]
    random_evolution_rate: f32,

    #[clap(long, default_value_t = 0.05)]
    combining_rate: f32,

    #[clap(long, default_value_t = 0.3)]
    move_chance: f32,

    /// Islands for `--solver islands`. Defaults to the thread count.
    #[clap(long)]
    islands: Option<usize>,

    #[clap(long, default_value_t = 20)]
    generations_per_round: usize,

    /// Non-improving rewires before `--solver hill-climb` restarts.
    #[clap(long, default_value_t = 1_000_000)]
    stall_limit: u64,

    /// Print the final summary as JSON instead of text.
    #[clap(long)]
    json: bool,
}

fn evolution_options(cli: &CliArgs) -> EvolutionOptions {
    EvolutionOptions {
        gate_count: cli.gates,
        candidate_count: cli.candidates,
        competition_rate: cli.competition_rate,
        randomization_rate: cli.randomization_rate,
        random_evolution_rate: cli.random_evolution_rate,
        combining_rate: cli.combining_rate,
        move_chance: cli.move_chance,
    }
}

fn make_solver(cli: &CliArgs, threads: usize) -> Result<Box<dyn Solver>> {
    Ok(match cli.solver {
        SolverKind::Random => Box::new(RandomSolver::new(cli.gates, cli.seed)),
        SolverKind::Evolution => Box::new(EvolutionSolver::new(evolution_options(cli), cli.seed)?),
        SolverKind::Islands => Box::new(IslandSolver::new(
            IslandOptions {
                island_count: cli.islands.unwrap_or(threads),
                generations_per_round: cli.generations_per_round,
                evolution: evolution_options(cli),
            },
            cli.seed,
        )?),
        SolverKind::HillClimb => Box::new(HillClimbSolver::new(
            HillClimbOptions {
                gate_count: cli.gates,
                stall_limit: cli.stall_limit,
            },
            cli.seed,
        )?),
    })
}

fn main() -> Result<()> {
    let _ = env_logger::try_init();

    let cli = CliArgs::parse();
    log::info!("nandsynth driver started with args: {:?}", cli);

    let problem = Arc::new(
        build_problem(cli.problem, cli.bits, cli.examples)
            .with_context(|| format!("building the {} problem", cli.problem))?,
    );
    let static_result_size = problem.static_result_size();
    // Validate the graph shape up front rather than in every worker.
    nandsynth::GateGraph::new(cli.gates, problem.output_count())
        .with_context(|| format!("--gates {} does not fit the problem", cli.gates))?;
    let threads = cli.threads.unwrap_or_else(num_cpus::get).max(1);
    let prototype = make_solver(&cli, threads)?;
    // The island solver spreads over its own threads.
    let workers = match cli.solver {
        SolverKind::Islands => 1,
        _ => threads,
    };
    println!(
        "[nandsynth] problem={} parameters={} outputs={} rows={} worst_wrong_bits={} solver={} threads={}",
        cli.problem,
        problem.parameter_count(),
        problem.output_count(),
        problem.example_count(),
        problem.output_bit_count(),
        prototype.name(),
        threads
    );

    let running = Arc::new(AtomicBool::new(true));
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let running = running.clone();
        let interrupted = interrupted.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
            interrupted.store(true, Ordering::SeqCst);
            println!("\nCtrl+C received, attempting to shut down gracefully...");
        })?;
    }

    let progress = Arc::new(Progress::new());
    let start = Instant::now();
    let handles = spawn_workers(
        prototype.as_ref(),
        workers,
        cli.seed,
        problem.clone(),
        progress.clone(),
        running.clone(),
    );

    let mut rate = SampleAverage::new(10);
    let mut last_iterations = 0;
    let mut last_tick = Instant::now();
    loop {
        thread::sleep(Duration::from_secs(1));
        let now = Instant::now();
        let iterations = progress.iterations.load(Ordering::Relaxed);
        let tick_secs = now.duration_since(last_tick).as_secs_f64();
        rate.add_sample((iterations - last_iterations) as f64 / tick_secs.max(1e-9));
        last_iterations = iterations;
        last_tick = now;

        match progress.best_score() {
            Some(best) => println!(
                "[nandsynth] iter {} | {:.0} it/s | Best: wrong_bits={} gates={} depth={}",
                iterations,
                rate.average().unwrap_or(0.0),
                best.wrong_bits,
                best.gate_count,
                best.depth
            ),
            None => println!("[nandsynth] iter {} | no candidate scored yet", iterations),
        }

        if progress.is_solved() || !running.load(Ordering::SeqCst) {
            break;
        }
        if let Some(limit) = cli.max_seconds {
            if start.elapsed() >= Duration::from_secs(limit) {
                log::info!("time limit of {}s reached", limit);
                break;
            }
        }
        if handles.iter().all(|handle| handle.is_finished()) {
            break;
        }
    }
    running.store(false, Ordering::SeqCst);
    join_workers(handles)?;

    let report = progress.report();
    let summary = RunSummary {
        problem: cli.problem.to_string(),
        solver: prototype.name().to_string(),
        threads,
        iterations: progress.iterations.load(Ordering::Relaxed),
        elapsed_secs: start.elapsed().as_secs_f64(),
        interrupted: interrupted.load(Ordering::SeqCst),
        best_score: report.as_ref().map(|report| report.best.score),
        gates: report
            .as_ref()
            .map(|report| RunSummary::gate_lines(&report.best.graph, static_result_size))
            .unwrap_or_default(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if summary.interrupted {
        println!("Search was interrupted.");
    }
    match summary.best_score {
        Some(best) => {
            println!(
                "Finished after {} iterations in {:.1}s. Best: wrong_bits={} gates={} depth={}",
                summary.iterations,
                summary.elapsed_secs,
                best.wrong_bits,
                best.gate_count,
                best.depth
            );
            for line in &summary.gates {
                println!("  {}", line);
            }
        }
        None => println!("Finished without scoring any candidate."),
    }
    Ok(())
}
