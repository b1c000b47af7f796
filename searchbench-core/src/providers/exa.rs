use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{api_error, elapsed_ms, normalize_hit};
use crate::config::{ExaConfig, resolve_api_key};
use crate::error::Result;
use crate::provider::{CostModel, SearchProvider};
use crate::types::{ProviderId, ProviderResult, SearchParams};

const SEARCH_PATH: &str = "/search";
const API_KEY_VAR: &str = "EXA_API_KEY";
/// $0.0035 per search plus $0.001 per result with text
const COST: CostModel = CostModel::PerResult {
    base: 0.0035,
    per_result: 0.001,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    text: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    search_type: Option<String>,
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    highlights: Option<Vec<String>>,
}

impl RawResult {
    fn excerpt(&mut self) -> String {
        match self.text.take().filter(|t| !t.is_empty()) {
            Some(text) => text,
            None => self
                .highlights
                .take()
                .map(|h| h.join("\n\n"))
                .unwrap_or_default(),
        }
    }
}

/// Exa search API (index-backed)
pub struct ExaProvider {
    http: Client,
    config: ExaConfig,
}

impl ExaProvider {
    pub fn new(http: Client, config: ExaConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SearchProvider for ExaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Exa
    }

    async fn search(&self, query: &str, params: &SearchParams) -> Result<ProviderResult> {
        let api_key = resolve_api_key(self.config.api_key.as_deref(), API_KEY_VAR)?;
        let url = format!(
            "{}{SEARCH_PATH}",
            self.config.base_url.trim_end_matches('/')
        );

        let request = SearchRequest {
            query,
            num_results: params.num_results,
            text: true,
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .json(&request)
            .send()
            .await?;
        let latency_ms = elapsed_ms(start);

        if !response.status().is_success() {
            return Err(api_error(ProviderId::Exa, response).await);
        }

        let body: SearchResponse = response.json().await?;
        // billed on what the API returned, before URL filtering
        let cost = COST.estimate(body.results.len());

        let hits: Vec<_> = body
            .results
            .into_iter()
            .filter_map(|mut r| {
                let excerpt = r.excerpt();
                normalize_hit(r.title, r.url, r.published_date, excerpt)
            })
            .collect();

        debug!(
            latency_ms,
            hits = hits.len(),
            search_type = body.search_type.as_deref().unwrap_or("unknown"),
            "exa search complete"
        );

        Ok(ProviderResult::new(ProviderId::Exa, latency_ms, cost, hits)
            .with_request_id(body.request_id))
    }
}
