use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ProviderId, ProviderResult, SearchParams};

/// How a provider bills a single search
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostModel {
    /// Same price regardless of result count
    Flat(f64),
    /// Base fee plus a surcharge per returned result
    PerResult { base: f64, per_result: f64 },
}

impl CostModel {
    pub fn estimate(&self, result_count: usize) -> f64 {
        match *self {
            Self::Flat(cost) => cost,
            Self::PerResult { base, per_result } => base + result_count as f64 * per_result,
        }
    }
}

/// Trait for web search providers
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Which provider this adapter talks to
    fn id(&self) -> ProviderId;

    /// Execute one search and normalize the response.
    ///
    /// Transport and API failures are returned as errors; the runner turns
    /// them into an error placeholder for this provider's slot.
    async fn search(&self, query: &str, params: &SearchParams) -> Result<ProviderResult>;
}
