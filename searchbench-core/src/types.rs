use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Placeholder used when a provider omits a hit's title
pub const UNTITLED: &str = "Untitled";

/// Identifier of one of the compared search providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Parallel,
    Exa,
    OpenAi,
}

impl ProviderId {
    /// All providers, in the order used for stable ranking
    pub const ALL: [ProviderId; 3] = [Self::Parallel, Self::Exa, Self::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Exa => "exa",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parallel" => Ok(Self::Parallel),
            "exa" => Ok(Self::Exa),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::InvalidInput(format!("Unknown provider: {other}"))),
        }
    }
}

/// One value per provider, serialized as `{parallel, exa, openai}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerProvider<T> {
    pub parallel: T,
    pub exa: T,
    pub openai: T,
}

impl<T> PerProvider<T> {
    pub fn from_fn(mut f: impl FnMut(ProviderId) -> T) -> Self {
        Self {
            parallel: f(ProviderId::Parallel),
            exa: f(ProviderId::Exa),
            openai: f(ProviderId::OpenAi),
        }
    }

    pub fn get(&self, id: ProviderId) -> &T {
        match id {
            ProviderId::Parallel => &self.parallel,
            ProviderId::Exa => &self.exa,
            ProviderId::OpenAi => &self.openai,
        }
    }

    pub fn get_mut(&mut self, id: ProviderId) -> &mut T {
        match id {
            ProviderId::Parallel => &mut self.parallel,
            ProviderId::Exa => &mut self.exa,
            ProviderId::OpenAi => &mut self.openai,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(ProviderId, &T) -> U) -> PerProvider<U> {
        PerProvider::from_fn(|id| f(id, self.get(id)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProviderId, &T)> {
        ProviderId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }
}

/// A single normalized search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default)]
    pub excerpt: String,
}

/// Normalized output of one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    pub provider: ProviderId,
    /// Wall-clock time of the outbound call, 0 when it never completed
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Provider-assigned request or search id, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ProviderResult {
    pub fn new(
        provider: ProviderId,
        latency_ms: u64,
        estimated_cost: f64,
        results: Vec<SearchHit>,
    ) -> Self {
        Self {
            provider,
            latency_ms,
            estimated_cost,
            results,
            error: None,
            request_id: None,
        }
    }

    /// Placeholder for a call that failed or missed its deadline
    pub fn failed(provider: ProviderId, error: impl Into<String>) -> Self {
        Self {
            provider,
            latency_ms: 0,
            estimated_cost: 0.0,
            results: Vec::new(),
            error: Some(error.into()),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Results from all providers for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchComparison {
    pub query: String,
    #[serde(flatten)]
    pub results: PerProvider<ProviderResult>,
}

/// Input of a standalone judging step, built from previously obtained results
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JudgeRequest {
    #[serde(default)]
    pub query: String,
    pub parallel: Option<ProviderResult>,
    pub exa: Option<ProviderResult>,
    pub openai: Option<ProviderResult>,
}

impl JudgeRequest {
    /// Validate that the query and every result set are present
    pub fn into_comparison(self) -> Result<SearchComparison> {
        match (self.parallel, self.exa, self.openai) {
            (Some(parallel), Some(exa), Some(openai)) if !self.query.trim().is_empty() => {
                Ok(SearchComparison {
                    query: self.query,
                    results: PerProvider {
                        parallel,
                        exa,
                        openai,
                    },
                })
            }
            _ => Err(Error::InvalidInput(
                "query, parallel, exa, and openai results are required".into(),
            )),
        }
    }
}

/// Parameters for one provider search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of results to request
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_num_results() -> usize {
    10
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            num_results: default_num_results(),
        }
    }
}
