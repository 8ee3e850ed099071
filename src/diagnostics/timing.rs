use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock time spent on one unit of work (a frame, a fitting pass).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }

    /// Time elapsed since `start`.
    pub fn since(label: impl Into<String>, start: Instant) -> Self {
        Self::new(label, elapsed_ms(start))
    }
}

/// Per-stage timings of a batch or fitting run plus the wall-clock total.
///
/// Stages run concurrently under a worker pool, so their sum may exceed
/// `total_ms`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn with_total(total_ms: f64) -> Self {
        Self {
            total_ms,
            stages: Vec::new(),
        }
    }

    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Sum of the stage timings (CPU time when stages ran in parallel).
    pub fn stage_sum_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

#[inline]
pub fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_camel_case() {
        let mut timing = TimingBreakdown::with_total(12.5);
        timing.push("frame 3", 4.0);
        timing.push("frame 4", 6.0);
        assert_eq!(timing.stage_sum_ms(), 10.0);
        let json = serde_json::to_string(&timing).unwrap();
        assert!(json.contains("\"totalMs\":12.5"));
        assert!(json.contains("\"elapsedMs\":4.0"));
    }
}
