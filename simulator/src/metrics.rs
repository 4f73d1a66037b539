//! Simulation metrics.

use std::collections::HashMap;

use serde::Serialize;

/// Counters and latency samples for one simulation run.
#[derive(Debug, Default)]
pub struct SimulationMetrics {
    /// Total operations attempted.
    pub total_ops: u64,
    /// Operations that committed.
    pub successes: u64,
    /// Operations rejected or faulted.
    pub failures: u64,
    /// Failure tally per error code.
    failures_by_code: HashMap<&'static str, u64>,
    /// Latency samples in microseconds.
    latency_samples: Vec<u64>,
}

impl SimulationMetrics {
    /// Create empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed operation.
    pub fn record_success(&mut self, latency_us: u64) {
        self.total_ops += 1;
        self.successes += 1;
        self.latency_samples.push(latency_us);
    }

    /// Record a rejected or faulted operation.
    pub fn record_failure(&mut self, code: &'static str) {
        self.total_ops += 1;
        self.failures += 1;
        *self.failures_by_code.entry(code).or_insert(0) += 1;
    }

    /// Fold another worker's metrics into this one.
    pub fn merge(&mut self, other: SimulationMetrics) {
        self.total_ops += other.total_ops;
        self.successes += other.successes;
        self.failures += other.failures;
        for (code, count) in other.failures_by_code {
            *self.failures_by_code.entry(code).or_insert(0) += count;
        }
        self.latency_samples.extend(other.latency_samples);
    }

    /// Average latency in microseconds.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }
        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    fn percentile(&self, p: f64) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }
        let mut sorted = self.latency_samples.clone();
        sorted.sort_unstable();
        let rank = ((sorted.len() - 1) as f64 * p).round() as usize;
        sorted[rank]
    }

    /// Median latency in microseconds.
    pub fn p50_latency_us(&self) -> u64 {
        self.percentile(0.50)
    }

    /// 99th percentile latency in microseconds.
    pub fn p99_latency_us(&self) -> u64 {
        self.percentile(0.99)
    }

    /// Failure tallies with owned keys, for reporting.
    pub fn failures_by_code(&self) -> HashMap<String, u64> {
        self.failures_by_code
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect()
    }
}

/// Final report printed after a run.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub total_ops: u64,
    pub successes: u64,
    pub failures: u64,
    pub failures_by_code: HashMap<String, u64>,
    pub average_latency_us: u64,
    pub p50_latency_us: u64,
    pub p99_latency_us: u64,
    pub opening_total: String,
    pub closing_total: String,
    pub journal_entries: usize,
    /// True when every account replays and conservation held where
    /// the workload requires it.
    pub consistent: bool,
}
