// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Precondition failures at the boundary of the core API.
///
/// These are raised before any state is touched; a caller that gets one back
/// can assume the graph and buffer are exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NandsynthError {
    ParameterCountMismatch { expected: usize, got: usize },
    GateCountNotUnrolled { gate_count: usize, unroll: usize },
    InvalidOutputSize { output_size: usize, gate_count: usize },
    GateCountMismatch { graph: usize, buffer: usize },
    OutputSizeMismatch { expected: usize, got: usize },
    GraphSizeMismatch { expected: usize, got: usize },
    ForwardReference { gate: usize, slot: usize },
    EmptyExamples,
    RaggedExamples { row: usize, expected: usize, got: usize },
}

impl fmt::Display for NandsynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NandsynthError::ParameterCountMismatch { expected, got } => write!(
                f,
                "nandsynth error: expected {} parameter vectors, got {}",
                expected, got
            ),
            NandsynthError::GateCountNotUnrolled { gate_count, unroll } => write!(
                f,
                "nandsynth error: gate count {} is not a multiple of the unroll factor {}",
                gate_count, unroll
            ),
            NandsynthError::InvalidOutputSize {
                output_size,
                gate_count,
            } => write!(
                f,
                "nandsynth error: output size {} must be in 1..={}",
                output_size, gate_count
            ),
            NandsynthError::GateCountMismatch { graph, buffer } => write!(
                f,
                "nandsynth error: graph has {} gates but buffer has {} gate slots",
                graph, buffer
            ),
            NandsynthError::OutputSizeMismatch { expected, got } => write!(
                f,
                "nandsynth error: output size mismatch; expected {}, got {}",
                expected, got
            ),
            NandsynthError::GraphSizeMismatch { expected, got } => write!(
                f,
                "nandsynth error: graph size mismatch; expected {} gates, got {}",
                expected, got
            ),
            NandsynthError::ForwardReference { gate, slot } => write!(
                f,
                "nandsynth error: gate {} reads slot {}, which is not defined before it",
                gate, slot
            ),
            NandsynthError::EmptyExamples => write!(f, "nandsynth error: no examples given"),
            NandsynthError::RaggedExamples { row, expected, got } => write!(
                f,
                "nandsynth error: example row {} has width {}, expected {}",
                row, got, expected
            ),
        }
    }
}

impl std::error::Error for NandsynthError {}

pub type Result<T> = std::result::Result<T, NandsynthError>;
