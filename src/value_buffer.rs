// SPDX-License-Identifier: Apache-2.0

//! Flat storage for every value a gate can read.
//!
//! The slot index space is shared by three regions laid out back to back in a
//! single owned allocation:
//!
//! ```text
//! [0, 2)                 constants: all-false, all-true
//! [2, 2 + P)             input parameters, loaded once per batch
//! [2 + P, 2 + P + M)     gate results, overwritten by evaluation
//! ```

use crate::lanes::Lanes;
use crate::nandsynth_error::{NandsynthError, Result};

pub const CONSTANT_COUNT: usize = 2;
pub const FALSE_SLOT: usize = 0;
pub const TRUE_SLOT: usize = 1;

#[derive(Debug, Clone)]
pub struct ValueBuffer {
    values: Vec<Lanes>,
    parameter_count: usize,
    gate_count: usize,
}

impl ValueBuffer {
    pub fn new(parameter_count: usize, gate_count: usize) -> Self {
        let mut values = vec![Lanes::ZERO; CONSTANT_COUNT + parameter_count + gate_count];
        values[FALSE_SLOT] = Lanes::ZERO;
        values[TRUE_SLOT] = Lanes::ONES;
        Self {
            values,
            parameter_count,
            gate_count,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn gate_count(&self) -> usize {
        self.gate_count
    }

    /// Number of slots a gate can read without depending on another gate.
    pub fn static_result_size(&self) -> usize {
        CONSTANT_COUNT + self.parameter_count
    }

    /// Overwrites the parameter region; constants and gate results are left
    /// untouched.
    pub fn set_parameters(&mut self, parameters: &[Lanes]) -> Result<()> {
        if parameters.len() != self.parameter_count {
            return Err(NandsynthError::ParameterCountMismatch {
                expected: self.parameter_count,
                got: parameters.len(),
            });
        }
        let end = self.static_result_size();
        self.values[CONSTANT_COUNT..end].copy_from_slice(parameters);
        Ok(())
    }

    pub fn constants(&self) -> &[Lanes] {
        &self.values[..CONSTANT_COUNT]
    }

    pub fn parameters(&self) -> &[Lanes] {
        &self.values[CONSTANT_COUNT..self.static_result_size()]
    }

    pub fn results(&self) -> &[Lanes] {
        &self.values[self.static_result_size()..]
    }

    pub fn get(&self, slot: usize) -> Lanes {
        self.values[slot]
    }

    /// The whole slot index space, for the evaluator.
    pub(crate) fn slots_mut(&mut self) -> &mut [Lanes] {
        &mut self.values
    }
}
