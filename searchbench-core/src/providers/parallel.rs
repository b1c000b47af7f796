use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{api_error, elapsed_ms, normalize_hit};
use crate::config::{ParallelConfig, resolve_api_key};
use crate::error::Result;
use crate::provider::{CostModel, SearchProvider};
use crate::types::{ProviderId, ProviderResult, SearchParams};

const SEARCH_PATH: &str = "/v1beta/search";
const BETA_HEADER: &str = "search-extract-2025-10-10";
const API_KEY_VAR: &str = "PARALLEL_API_KEY";
const MAX_CHARS_PER_RESULT: usize = 5000;
const COST: CostModel = CostModel::Flat(0.01);

#[derive(Serialize)]
struct SearchRequest<'a> {
    objective: &'a str,
    search_queries: [&'a str; 1],
    max_results: usize,
    excerpts: ExcerptSettings,
}

#[derive(Serialize)]
struct ExcerptSettings {
    max_chars_per_result: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search_id: Option<String>,
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    publish_date: Option<String>,
    #[serde(default)]
    excerpts: Option<Excerpts>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Excerpts {
    Many(Vec<String>),
    One(String),
}

impl Excerpts {
    fn join(self) -> String {
        match self {
            Self::Many(parts) => parts.join("\n\n"),
            Self::One(text) => text,
        }
    }
}

/// Parallel search API (index-backed)
pub struct ParallelProvider {
    http: Client,
    config: ParallelConfig,
}

impl ParallelProvider {
    pub fn new(http: Client, config: ParallelConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl SearchProvider for ParallelProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Parallel
    }

    async fn search(&self, query: &str, params: &SearchParams) -> Result<ProviderResult> {
        let api_key = resolve_api_key(self.config.api_key.as_deref(), API_KEY_VAR)?;
        let url = format!(
            "{}{SEARCH_PATH}",
            self.config.base_url.trim_end_matches('/')
        );

        let request = SearchRequest {
            objective: query,
            search_queries: [query],
            max_results: params.num_results,
            excerpts: ExcerptSettings {
                max_chars_per_result: MAX_CHARS_PER_RESULT,
            },
        };

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("parallel-beta", BETA_HEADER)
            .json(&request)
            .send()
            .await?;
        let latency_ms = elapsed_ms(start);

        if !response.status().is_success() {
            return Err(api_error(ProviderId::Parallel, response).await);
        }

        let body: SearchResponse = response.json().await?;
        let hits: Vec<_> = body
            .results
            .into_iter()
            .filter_map(|r| {
                let excerpt = r.excerpts.map(Excerpts::join).unwrap_or_default();
                normalize_hit(r.title, r.url, r.publish_date, excerpt)
            })
            .collect();

        debug!(latency_ms, hits = hits.len(), "parallel search complete");

        let cost = COST.estimate(hits.len());
        Ok(ProviderResult::new(ProviderId::Parallel, latency_ms, cost, hits)
            .with_request_id(body.search_id))
    }
}
