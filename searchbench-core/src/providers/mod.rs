pub mod exa;
pub mod openai;
pub mod parallel;

pub use exa::ExaProvider;
pub use openai::OpenAiSearchProvider;
pub use parallel::ParallelProvider;

use std::sync::Arc;
use std::time::Instant;

use reqwest::Client;
use tracing::warn;

use crate::config::ProvidersConfig;
use crate::error::{Error, Result};
use crate::llm::OpenAiChat;
use crate::provider::SearchProvider;
use crate::types::{PerProvider, ProviderId, SearchHit, UNTITLED};

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Build all three adapters from configuration.
///
/// Credentials are resolved lazily, so a missing key fails that provider's
/// first search rather than construction.
pub fn from_config(config: &ProvidersConfig) -> Result<PerProvider<Box<dyn SearchProvider>>> {
    let http = Client::builder().user_agent(crate::USER_AGENT).build()?;
    let chat = Arc::new(OpenAiChat::new(
        config.openai.api_key.as_deref(),
        config.openai.base_url.as_deref(),
    ));

    Ok(PerProvider {
        parallel: Box::new(ParallelProvider::new(http.clone(), config.parallel.clone())),
        exa: Box::new(ExaProvider::new(http, config.exa.clone())),
        openai: Box::new(OpenAiSearchProvider::new(chat, config.openai.model.clone())),
    })
}

/// Milliseconds since `start`; a completed call never reports 0
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    (start.elapsed().as_millis() as u64).max(1)
}

/// Build a normalized hit, dropping entries without a usable URL
pub(crate) fn normalize_hit(
    title: Option<String>,
    url: Option<String>,
    published_date: Option<String>,
    excerpt: String,
) -> Option<SearchHit> {
    let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Some(SearchHit {
        title,
        url,
        published_date,
        excerpt,
    })
}

/// Convert a non-success HTTP response into an API error
pub(crate) async fn api_error(provider: ProviderId, response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    warn!(%provider, status, "search API returned an error");
    Error::Api {
        provider,
        status,
        body,
    }
}
