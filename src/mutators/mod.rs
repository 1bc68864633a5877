// SPDX-License-Identifier: Apache-2.0

//! Structural edits on a [`crate::gate_graph::GateGraph`].
//!
//! All mutators take the random source as `&mut R` so a caller can drive a
//! whole search from one seeded generator.

pub mod combine;
pub mod move_gate;
pub mod randomize;

pub use combine::GraphCombiner;
pub use move_gate::GateMover;
pub use randomize::{randomize, randomize_some, rewire_random_gate, undo_rewire, Rewire};
