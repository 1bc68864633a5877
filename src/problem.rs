// SPDX-License-Identifier: Apache-2.0

//! Truth-table problems a [`GateGraph`] is scored against.

use crate::gate_graph::GateGraph;
use crate::lanes::{Lanes, LANE_BITS};
use crate::nandsynth_error::{NandsynthError, Result};
use crate::score::SlimScore;
use crate::value_buffer::ValueBuffer;

/// One evaluation batch of up to [`LANE_BITS`] truth-table rows.
///
/// Row `r` of the batch is bit `r` of every vector; `mask` has a one bit for
/// each populated row so a short final batch is not scored on padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemExample {
    pub inputs: Vec<Lanes>,
    pub outputs: Vec<Lanes>,
    pub mask: Lanes,
}

impl ProblemExample {
    /// Packs `(inputs, outputs)` rows into batches.
    pub fn from_truth_table(rows: &[(Vec<bool>, Vec<bool>)]) -> Result<Vec<ProblemExample>> {
        let Some((first_inputs, first_outputs)) = rows.first() else {
            return Err(NandsynthError::EmptyExamples);
        };
        let (input_width, output_width) = (first_inputs.len(), first_outputs.len());
        for (row, (inputs, outputs)) in rows.iter().enumerate() {
            if inputs.len() != input_width {
                return Err(NandsynthError::RaggedExamples {
                    row,
                    expected: input_width,
                    got: inputs.len(),
                });
            }
            if outputs.len() != output_width {
                return Err(NandsynthError::RaggedExamples {
                    row,
                    expected: output_width,
                    got: outputs.len(),
                });
            }
        }

        let examples = rows
            .chunks(LANE_BITS)
            .map(|batch| {
                let mut inputs = vec![Lanes::ZERO; input_width];
                let mut outputs = vec![Lanes::ZERO; output_width];
                for (sample, (row_inputs, row_outputs)) in batch.iter().enumerate() {
                    for (lanes, bit) in inputs.iter_mut().zip(row_inputs) {
                        lanes.set(sample, *bit);
                    }
                    for (lanes, bit) in outputs.iter_mut().zip(row_outputs) {
                        lanes.set(sample, *bit);
                    }
                }
                ProblemExample {
                    inputs,
                    outputs,
                    mask: Lanes::first_n(batch.len()),
                }
            })
            .collect();
        Ok(examples)
    }

    pub fn row_count(&self) -> usize {
        self.mask.count_ones()
    }

    /// Number of populated output bits where `actual` disagrees.
    pub fn difference(&self, actual: &[Lanes]) -> usize {
        assert_eq!(
            actual.len(),
            self.outputs.len(),
            "difference() needs one vector per output"
        );
        self.outputs
            .iter()
            .zip(actual)
            .map(|(expected, actual)| ((*expected ^ *actual) & self.mask).count_ones())
            .sum()
    }
}

/// A full truth table, split into batches.
#[derive(Debug, Clone)]
pub struct EquationProblem {
    examples: Vec<ProblemExample>,
}

impl EquationProblem {
    pub fn new(examples: Vec<ProblemExample>) -> Result<Self> {
        let Some(first) = examples.first() else {
            return Err(NandsynthError::EmptyExamples);
        };
        let (input_width, output_width) = (first.inputs.len(), first.outputs.len());
        for (row, example) in examples.iter().enumerate() {
            if example.inputs.len() != input_width {
                return Err(NandsynthError::RaggedExamples {
                    row,
                    expected: input_width,
                    got: example.inputs.len(),
                });
            }
            if example.outputs.len() != output_width {
                return Err(NandsynthError::RaggedExamples {
                    row,
                    expected: output_width,
                    got: example.outputs.len(),
                });
            }
        }
        Ok(Self { examples })
    }

    pub fn from_truth_table(rows: &[(Vec<bool>, Vec<bool>)]) -> Result<Self> {
        Self::new(ProblemExample::from_truth_table(rows)?)
    }

    pub fn parameter_count(&self) -> usize {
        self.examples[0].inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.examples[0].outputs.len()
    }

    pub fn static_result_size(&self) -> usize {
        crate::value_buffer::CONSTANT_COUNT + self.parameter_count()
    }

    /// Number of truth-table rows across all batches.
    pub fn example_count(&self) -> usize {
        self.examples.iter().map(ProblemExample::row_count).sum()
    }

    /// Total output bits, i.e. the worst possible wrong-bit count.
    pub fn output_bit_count(&self) -> usize {
        self.example_count() * self.output_count()
    }

    pub fn examples(&self) -> &[ProblemExample] {
        &self.examples
    }

    /// A buffer shaped for this problem and a graph of `gate_count` gates.
    pub fn new_buffer(&self, gate_count: usize) -> ValueBuffer {
        ValueBuffer::new(self.parameter_count(), gate_count)
    }

    fn check_graph(&self, graph: &GateGraph) -> Result<()> {
        if graph.output_size() != self.output_count() {
            return Err(NandsynthError::OutputSizeMismatch {
                expected: self.output_count(),
                got: graph.output_size(),
            });
        }
        Ok(())
    }

    /// Counts wrong output bits over every batch, evaluating live gates only.
    pub fn evaluate(&self, graph: &GateGraph, buffer: &mut ValueBuffer) -> Result<SlimScore> {
        self.check_graph(graph)?;
        let mut wrong_bits = 0;
        for example in &self.examples {
            buffer.set_parameters(&example.inputs)?;
            let actual = graph.evaluate_live(buffer)?;
            wrong_bits += example.difference(actual);
        }
        Ok(SlimScore::new(wrong_bits))
    }

    /// Output vectors of every batch, concatenated batch by batch.
    pub fn results(&self, graph: &GateGraph, buffer: &mut ValueBuffer) -> Result<Vec<Lanes>> {
        self.check_graph(graph)?;
        let mut results = Vec::with_capacity(self.examples.len() * self.output_count());
        for example in &self.examples {
            buffer.set_parameters(&example.inputs)?;
            let actual = graph.evaluate_live(buffer)?;
            results.extend(actual.iter().map(|lanes| *lanes & example.mask));
        }
        Ok(results)
    }
}
