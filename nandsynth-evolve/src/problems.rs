// SPDX-License-Identifier: Apache-2.0

//! Built-in truth tables for the driver and tests.

use clap::ValueEnum;
use nandsynth::EquationProblem;

pub type TruthTable = Vec<(Vec<bool>, Vec<bool>)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProblemKind {
    Not,
    And,
    Or,
    Xor,
    HalfAdder,
    /// `bits`-wide addition, truncated to `bits` output bits.
    Add,
    /// `bits`-wide multiplication, truncated to `bits` output bits.
    Mul,
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProblemKind::Not => "not",
            ProblemKind::And => "and",
            ProblemKind::Or => "or",
            ProblemKind::Xor => "xor",
            ProblemKind::HalfAdder => "half-adder",
            ProblemKind::Add => "add",
            ProblemKind::Mul => "mul",
        };
        write!(f, "{}", name)
    }
}

fn bits_of(value: u64, bit_count: usize) -> impl Iterator<Item = bool> {
    (0..bit_count).map(move |bit| (value >> bit) & 1 == 1)
}

/// Samples `f(x, x + 1)` for `x` in `0..example_count`.
///
/// Inputs are the low `bit_count` bits of `x` followed by those of `x + 1`
/// (least significant first); outputs are the low `bit_count` bits of the
/// result.
pub fn bi_arg_operator(
    example_count: usize,
    bit_count: usize,
    f: impl Fn(u64, u64) -> u64,
) -> TruthTable {
    (0..example_count as u64)
        .map(|x| {
            let y = x + 1;
            let inputs = bits_of(x, bit_count).chain(bits_of(y, bit_count)).collect();
            let outputs = bits_of(f(x, y), bit_count).collect();
            (inputs, outputs)
        })
        .collect()
}

/// Every combination of two inputs, least significant row first.
pub fn two_input_table(f: impl Fn(bool, bool) -> Vec<bool>) -> TruthTable {
    let mut rows = Vec::with_capacity(4);
    for a in [false, true] {
        for b in [false, true] {
            rows.push((vec![a, b], f(a, b)));
        }
    }
    rows
}

pub fn truth_table(kind: ProblemKind, bit_count: usize, example_count: usize) -> TruthTable {
    match kind {
        ProblemKind::Not => vec![(vec![false], vec![true]), (vec![true], vec![false])],
        ProblemKind::And => two_input_table(|a, b| vec![a && b]),
        ProblemKind::Or => two_input_table(|a, b| vec![a || b]),
        ProblemKind::Xor => two_input_table(|a, b| vec![a ^ b]),
        ProblemKind::HalfAdder => two_input_table(|a, b| vec![a && b, a ^ b]),
        ProblemKind::Add => bi_arg_operator(example_count, bit_count, |x, y| x.wrapping_add(y)),
        ProblemKind::Mul => bi_arg_operator(example_count, bit_count, |x, y| x.wrapping_mul(y)),
    }
}

pub fn build_problem(
    kind: ProblemKind,
    bit_count: usize,
    example_count: usize,
) -> anyhow::Result<EquationProblem> {
    anyhow::ensure!(
        (1..=32).contains(&bit_count),
        "bit count must be in 1..=32, got {}",
        bit_count
    );
    let rows = truth_table(kind, bit_count, example_count);
    Ok(EquationProblem::from_truth_table(&rows)?)
}
