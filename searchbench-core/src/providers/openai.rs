use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{elapsed_ms, normalize_hit};
use crate::error::Result;
use crate::extract::{JsonShape, parse_lenient};
use crate::llm::{ChatRequest, LanguageModel};
use crate::provider::{CostModel, SearchProvider};
use crate::types::{ProviderId, ProviderResult, SearchHit, SearchParams};

const COST: CostModel = CostModel::Flat(0.04);
const PREVIEW_CHARS: usize = 500;

/// One entry of the model's JSON array; every field is optional
#[derive(Deserialize)]
struct GeneratedHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

/// Web search through a chat model with built-in browsing
pub struct OpenAiSearchProvider {
    model: Arc<dyn LanguageModel>,
    model_name: String,
}

impl OpenAiSearchProvider {
    pub fn new(model: Arc<dyn LanguageModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for OpenAiSearchProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn search(&self, query: &str, params: &SearchParams) -> Result<ProviderResult> {
        let request = ChatRequest::new(&self.model_name, search_prompt(query, params.num_results));

        let start = Instant::now();
        let content = self.model.complete(request).await?;
        let latency_ms = elapsed_ms(start);

        let hits = parse_generated_hits(&content, params.num_results);
        debug!(latency_ms, hits = hits.len(), "openai web search complete");

        Ok(ProviderResult::new(
            ProviderId::OpenAi,
            latency_ms,
            COST.estimate(hits.len()),
            hits,
        ))
    }
}

fn search_prompt(query: &str, num_results: usize) -> String {
    format!(
        r#"Search the web for: "{query}"

Return exactly {num_results} search results as a JSON array. Each result must have:
- title: the page title
- url: the full URL
- excerpt: a 1-2 sentence summary

IMPORTANT: Return ONLY the JSON array, no other text:
[{{"title":"...","url":"...","excerpt":"..."}},...]"#
    )
}

/// Normalize model output into at most `limit` hits with unique URLs.
///
/// Unparseable output yields no hits rather than an error.
pub fn parse_generated_hits(content: &str, limit: usize) -> Vec<SearchHit> {
    let raw: Vec<serde_json::Value> =
        match parse_lenient(content, JsonShape::Array, "generated search results") {
            Ok(raw) => raw,
            Err(e) => {
                let preview: String = content.chars().take(PREVIEW_CHARS).collect();
                warn!(error = %e, response = %preview, "discarding unparseable search response");
                return Vec::new();
            }
        };

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|value| serde_json::from_value::<GeneratedHit>(value).ok())
        .filter_map(|hit| {
            let excerpt = hit.excerpt.or(hit.summary).unwrap_or_default();
            normalize_hit(hit.title, hit.url, None, excerpt)
        })
        .filter(|hit| seen.insert(hit.url.clone()))
        .take(limit)
        .collect()
}
