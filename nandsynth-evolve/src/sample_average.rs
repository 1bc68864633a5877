// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;

/// Mean of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct SampleAverage {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl SampleAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn add_sample(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// `None` until the first sample arrives.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_drops_oldest_samples() {
        let mut average = SampleAverage::new(3);
        assert_eq!(average.average(), None);
        average.add_sample(10.0);
        assert_eq!(average.average(), Some(10.0));
        for sample in [1.0, 2.0, 3.0] {
            average.add_sample(sample);
        }
        assert_eq!(average.average(), Some(2.0));
    }
}
