//! Prometheus metrics for the reputation ledger
//!
//! Metrics are registered against a caller-supplied [`Registry`]; nothing is
//! global, so several ledgers (or tests) can coexist in one process.

use prometheus::{
    register_gauge_with_registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, Gauge, Histogram,
    HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
};
use trustmesh_core::PopVerdict;

/// Histogram buckets for reputation scores (0.0 to 1.0)
const SCORE_BUCKETS: &[f64] = &[0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

#[derive(Clone)]
pub struct LedgerMetrics {
    /// Ledger updates by verdict label
    pub verifications_total: IntCounterVec,

    /// Nodes with a reputation record
    pub tracked_nodes: IntGauge,

    /// Mean stored score across tracked nodes
    pub mean_score: Gauge,

    /// Score after each update
    pub score_distribution: Histogram,
}

impl LedgerMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let verifications_total = register_int_counter_vec_with_registry!(
            Opts::new(
                "trustmesh_reputation_verifications_total",
                "Proof-of-path verifications recorded, by verdict"
            ),
            &["verdict"],
            registry
        )?;

        let tracked_nodes = register_int_gauge_with_registry!(
            Opts::new("trustmesh_reputation_tracked_nodes", "Nodes with a reputation record"),
            registry
        )?;

        let mean_score = register_gauge_with_registry!(
            Opts::new("trustmesh_reputation_mean_score", "Mean stored reputation score"),
            registry
        )?;

        let score_distribution = register_histogram_with_registry!(
            HistogramOpts::new(
                "trustmesh_reputation_score_distribution",
                "Distribution of scores after each update"
            )
            .buckets(SCORE_BUCKETS.to_vec()),
            registry
        )?;

        Ok(Self {
            verifications_total,
            tracked_nodes,
            mean_score,
            score_distribution,
        })
    }

    pub(crate) fn record_update(&self, verdict: &PopVerdict, score: f64) {
        self.verifications_total
            .with_label_values(&[verdict.label()])
            .inc();
        self.score_distribution.observe(score);
    }

    pub(crate) fn record_totals(&self, tracked: usize, mean: f64) {
        self.tracked_nodes.set(tracked as i64);
        self.mean_score.set(mean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let registry = Registry::new();
        let metrics = LedgerMetrics::new(&registry).unwrap();

        metrics.record_update(&PopVerdict::Valid, 0.65);
        metrics.record_update(&PopVerdict::Replay, 0.4);
        metrics.record_totals(2, 0.525);

        assert_eq!(
            metrics
                .verifications_total
                .with_label_values(&["valid"])
                .get(),
            1
        );
        assert_eq!(metrics.tracked_nodes.get(), 2);
        assert_eq!(metrics.score_distribution.get_sample_count(), 2);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        assert!(LedgerMetrics::new(&registry).is_ok());
        assert!(LedgerMetrics::new(&registry).is_err());
    }
}
