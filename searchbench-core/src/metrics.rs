use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{PerProvider, ProviderResult};

/// Latency percentiles for one provider across a suite, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyMetrics {
    /// Completed calls recorded (failed and timed-out calls are excluded)
    pub samples: u64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
}

/// Tracks provider latencies over the queries of one suite
pub struct SuiteMetrics {
    histograms: PerProvider<Histogram<u64>>,
}

impl SuiteMetrics {
    /// Track latencies from 1ms up to `highest_ms` with 3 significant figures.
    ///
    /// Fails when `highest_ms` is below 2ms.
    pub fn new(highest_ms: u64) -> Result<Self> {
        let histogram = || {
            Histogram::new_with_bounds(1, highest_ms, 3)
                .map_err(|e| Error::Metrics(format!("failed to create latency histogram: {e}")))
        };
        Ok(Self {
            histograms: PerProvider {
                parallel: histogram()?,
                exa: histogram()?,
                openai: histogram()?,
            },
        })
    }

    /// Record the latency of every provider that completed
    pub fn record(&mut self, results: &PerProvider<ProviderResult>) {
        for (id, result) in results.iter() {
            if result.is_error() || result.latency_ms == 0 {
                continue;
            }
            self.histograms.get_mut(id).saturating_record(result.latency_ms);
        }
    }

    pub fn summary(&self) -> PerProvider<LatencyMetrics> {
        self.histograms.map(|_, histogram| compute_latency_metrics(histogram))
    }
}

fn compute_latency_metrics(histogram: &Histogram<u64>) -> LatencyMetrics {
    if histogram.is_empty() {
        return LatencyMetrics::default();
    }

    LatencyMetrics {
        samples: histogram.len(),
        min_ms: histogram.min(),
        max_ms: histogram.max(),
        mean_ms: histogram.mean(),
        p50_ms: histogram.value_at_quantile(0.50),
        p90_ms: histogram.value_at_quantile(0.90),
        p99_ms: histogram.value_at_quantile(0.99),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;

    fn triple(parallel: u64, exa: u64) -> PerProvider<ProviderResult> {
        PerProvider {
            parallel: ProviderResult::new(ProviderId::Parallel, parallel, 0.01, vec![]),
            exa: ProviderResult::new(ProviderId::Exa, exa, 0.0035, vec![]),
            openai: ProviderResult::failed(ProviderId::OpenAi, "Timeout after 20000ms"),
        }
    }

    #[test]
    fn ceiling_below_two_ms_is_rejected() {
        let err = SuiteMetrics::new(1).err().unwrap();
        assert!(matches!(err, Error::Metrics(_)));
    }

    #[test]
    fn records_completed_calls_only() {
        let mut metrics = SuiteMetrics::new(20_000).unwrap();
        metrics.record(&triple(200, 800));
        metrics.record(&triple(400, 600));
        metrics.record(&triple(300, 0));

        let summary = metrics.summary();
        assert_eq!(summary.parallel.samples, 3);
        assert_eq!(summary.parallel.min_ms, 200);
        assert_eq!(summary.parallel.max_ms, 400);
        assert!((summary.parallel.mean_ms - 300.0).abs() < 1.0);
        assert_eq!(summary.parallel.p50_ms, 300);

        assert_eq!(summary.exa.samples, 2);
        assert_eq!(summary.openai, LatencyMetrics::default());
    }
}
