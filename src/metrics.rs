//! Scoring statistics for the lifetime of the process

use crate::types::prediction::ScoringSummary;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Metrics collector for scoring requests
pub struct ScoringMetrics {
    /// Uploads and samples scored successfully
    pub batches_scored: AtomicU64,
    /// Requests that ended in an error
    pub batches_failed: AtomicU64,
    /// Total rows scored
    pub rows_scored: AtomicU64,
    /// Rows the model flagged as fraud
    pub fraud_flagged: AtomicU64,
    /// Failures keyed by error kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Request latencies (in microseconds)
    latencies: RwLock<Vec<u64>>,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            batches_scored: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            rows_scored: AtomicU64::new(0),
            fraud_flagged: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(64)),
        }
    }

    /// Record a successfully scored batch
    pub fn record_batch(&self, elapsed: Duration, summary: &ScoringSummary) {
        self.batches_scored.fetch_add(1, Ordering::Relaxed);
        self.rows_scored
            .fetch_add(summary.total as u64, Ordering::Relaxed);
        self.fraud_flagged
            .fetch_add(summary.fraud_count as u64, Ordering::Relaxed);

        if let Ok(mut latencies) = self.latencies.write() {
            latencies.push(elapsed.as_micros() as u64);
            // Keep only last 10000
            if latencies.len() > 10000 {
                latencies.drain(0..5000);
            }
        }
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &str) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    pub fn failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Latency statistics over recorded batches
    pub fn latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(latencies) => latencies.clone(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let batches = self.batches_scored.load(Ordering::Relaxed);
        let failed = self.batches_failed.load(Ordering::Relaxed);
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let fraud = self.fraud_flagged.load(Ordering::Relaxed);
        let fraud_rate = if rows > 0 {
            (fraud as f64 / rows as f64) * 100.0
        } else {
            0.0
        };
        let latency = self.latency_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║                FRAUD BATCH SCORER - SUMMARY                  ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batches Scored: {:>8}  │  Failed: {:>8}                 ║",
            batches, failed
        );
        info!(
            "║ Rows Scored:    {:>8}  │  Flagged: {:>7} ({:>5.1}%)       ║",
            rows, fraud, fraud_rate
        );
        info!(
            "║ Latency (μs): mean={:>7} p50={:>7} p99={:>7} max={:>7} ║",
            latency.mean_us, latency.p50_us, latency.p99_us, latency.max_us
        );

        let failures = self.failures_by_kind();
        if !failures.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Failures by Kind:                                            ║");
            for (kind, count) in &failures {
                info!("║   {:20}: {:>6}                               ║", kind, count);
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Request latency statistics
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}
