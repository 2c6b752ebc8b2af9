use std::collections::VecDeque;

/// How many transfer-rate samples are retained
pub const MAX_SPEED_HISTORY: usize = 10;

/// Bounded FIFO of recent transfer-rate samples in kB/s, oldest first.
/// Appending past capacity drops the oldest sample.
#[derive(Debug, Clone, Default)]
pub struct SpeedHistory {
    samples: VecDeque<f64>,
}

impl SpeedHistory {
    pub fn push(&mut self, sample: f64) {
        self.samples.push_back(sample);
        if self.samples.len() > MAX_SPEED_HISTORY {
            self.samples.pop_front();
        }
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut history = SpeedHistory::default();
        for i in 0..15 {
            history.push(i as f64);
        }
        assert_eq!(history.len(), MAX_SPEED_HISTORY);
        // Oldest first, the first five samples were evicted
        assert_eq!(
            history.samples(),
            vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0]
        );
    }

    #[test]
    fn test_starts_empty() {
        let history = SpeedHistory::default();
        assert!(history.is_empty());
        assert!(history.samples().is_empty());
    }
}
