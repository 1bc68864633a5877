// SPDX-License-Identifier: Apache-2.0

//! Search primitives for NAND-only circuits.
//!
//! A [`GateGraph`] is a fixed-length, topologically ordered list of two-input
//! NAND gates whose trailing gates are the outputs. It is evaluated
//! bit-parallel over a [`ValueBuffer`], 256 truth-table rows at a time, and
//! edited in place by the [`mutators`].

pub mod eval;
pub mod gate_graph;
pub mod lanes;
pub mod liveness;
pub mod mutators;
pub mod nand_operator;
pub mod nandsynth_error;
pub mod problem;
pub mod score;
pub mod test_utils;
pub mod value_buffer;

pub use gate_graph::GateGraph;
pub use lanes::Lanes;
pub use liveness::LivenessBits;
pub use mutators::{
    randomize, randomize_some, rewire_random_gate, undo_rewire, GateMover, GraphCombiner, Rewire,
};
pub use nand_operator::NandOperator;
pub use nandsynth_error::{NandsynthError, Result};
pub use problem::{EquationProblem, ProblemExample};
pub use score::{FullScore, SlimScore};
pub use value_buffer::ValueBuffer;
