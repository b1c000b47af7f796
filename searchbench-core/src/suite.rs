use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::metrics::LatencyMetrics;
use crate::scoring::{Judgment, ProviderScore, Winner};
use crate::types::{PerProvider, ProviderId, ProviderResult, SearchComparison};

/// One provider's slice of a scored query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOutcome {
    pub result_count: usize,
    pub scores: ProviderScore,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Normalized comparison of one successfully judged query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    #[serde(flatten)]
    pub providers: PerProvider<ProviderOutcome>,
    pub winner: Winner,
    pub ranking: Vec<ProviderId>,
}

/// A query whose evaluation failed (judge parse failure, judge deadline, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedQuery {
    pub query: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Scored(QueryReport),
    Failed(FailedQuery),
}

impl QueryOutcome {
    pub fn scored(comparison: &SearchComparison, judgment: Judgment) -> Self {
        let Judgment {
            scores,
            winner,
            ranking,
        } = judgment;
        let PerProvider {
            parallel,
            exa,
            openai,
        } = scores;

        let outcome = |scores: ProviderScore, result: &ProviderResult| ProviderOutcome {
            result_count: result.results.len(),
            scores,
            error: result.error.clone(),
        };
        let results = &comparison.results;

        Self::Scored(QueryReport {
            query: comparison.query.clone(),
            providers: PerProvider {
                parallel: outcome(parallel, &results.parallel),
                exa: outcome(exa, &results.exa),
                openai: outcome(openai, &results.openai),
            },
            winner,
            ranking,
        })
    }

    pub fn failed(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed(FailedQuery {
            query: query.into(),
            error: error.into(),
        })
    }

    pub fn query(&self) -> &str {
        match self {
            Self::Scored(report) => &report.query,
            Self::Failed(failed) => &failed.query,
        }
    }

    pub fn winner(&self) -> Option<Winner> {
        match self {
            Self::Scored(report) => Some(report.winner),
            Self::Failed(_) => None,
        }
    }
}

/// Aggregate outcome of a suite, emitted with the `complete` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub total: usize,
    pub parallel_wins: usize,
    pub exa_wins: usize,
    pub openai_wins: usize,
    pub ties: usize,
    pub failed: usize,
    pub latency: PerProvider<LatencyMetrics>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// An ordered batch of queries with running tallies
#[derive(Debug)]
pub struct SuiteRun {
    queries: Vec<String>,
    outcomes: Vec<QueryOutcome>,
    wins: PerProvider<usize>,
    ties: usize,
    failed: usize,
    started_at: DateTime<Utc>,
}

impl SuiteRun {
    /// Validate and start a suite; an empty query list is rejected
    pub fn new(queries: Vec<String>) -> Result<Self> {
        if queries.is_empty() {
            return Err(Error::InvalidInput("Queries array is required".into()));
        }
        Ok(Self {
            outcomes: Vec::with_capacity(queries.len()),
            queries,
            wins: PerProvider::from_fn(|_| 0),
            ties: 0,
            failed: 0,
            started_at: Utc::now(),
        })
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Fold one query's outcome into the tallies
    pub fn record(&mut self, outcome: QueryOutcome) {
        match outcome.winner() {
            Some(Winner::Provider(id)) => *self.wins.get_mut(id) += 1,
            Some(Winner::Tie) => self.ties += 1,
            None => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Close the run, returning every outcome and the summary
    pub fn finish(self, latency: PerProvider<LatencyMetrics>) -> (Vec<QueryOutcome>, SuiteSummary) {
        let summary = SuiteSummary {
            total: self.queries.len(),
            parallel_wins: self.wins.parallel,
            exa_wins: self.wins.exa,
            openai_wins: self.wins.openai,
            ties: self.ties,
            failed: self.failed,
            latency,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };
        (self.outcomes, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{self, Verdict};

    fn comparison() -> SearchComparison {
        SearchComparison {
            query: "best hiking trails".into(),
            results: PerProvider {
                parallel: ProviderResult::new(ProviderId::Parallel, 200, 0.01, vec![]),
                exa: ProviderResult::new(ProviderId::Exa, 800, 0.0085, vec![]),
                openai: ProviderResult::failed(ProviderId::OpenAi, "Timeout after 20000ms"),
            },
        }
    }

    fn scored(parallel: u8, exa: u8) -> QueryOutcome {
        let comparison = comparison();
        let verdicts = PerProvider {
            parallel: Verdict {
                accuracy: parallel,
                reasoning: "p".into(),
            },
            exa: Verdict {
                accuracy: exa,
                reasoning: "e".into(),
            },
            openai: Verdict::missing(),
        };
        QueryOutcome::scored(&comparison, scoring::score(&comparison.results, &verdicts))
    }

    #[test]
    fn empty_suite_is_rejected() {
        let err = SuiteRun::new(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn scored_outcome_serializes_like_report() {
        let value = serde_json::to_value(scored(9, 2)).unwrap();
        assert_eq!(value["query"], "best hiking trails");
        assert_eq!(value["parallel"]["resultCount"], 0);
        assert_eq!(value["parallel"]["scores"]["latencyScore"], 10);
        assert_eq!(value["exa"]["scores"]["accuracy"], 2);
        assert_eq!(value["exa"]["scores"]["reasoning"], "e");
        assert_eq!(value["openai"]["error"], "Timeout after 20000ms");
        assert!(value["exa"].get("error").is_none());
        assert_eq!(value["winner"], "parallel");
        assert_eq!(value["ranking"][0], "parallel");
    }

    #[test]
    fn failed_outcome_round_trips_untagged() {
        let outcome = QueryOutcome::failed("q", "Failed to parse judge response: no JSON object found");
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(serde_json::from_str::<QueryOutcome>(&json).unwrap(), outcome);
    }

    #[test]
    fn tallies_wins_ties_and_failures() {
        let mut suite = SuiteRun::new(vec!["a".into(), "b".into(), "c".into(), "d".into()]).unwrap();
        suite.record(scored(9, 2));
        suite.record(scored(2, 9));
        // 7 vs 7 totals
        suite.record(scored(7, 8));
        suite.record(QueryOutcome::failed("d", "Timeout after 30000ms"));

        let (outcomes, summary) = suite.finish(PerProvider::from_fn(|_| LatencyMetrics::default()));
        assert_eq!(outcomes.len(), 4);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.parallel_wins, 1);
        assert_eq!(summary.exa_wins, 1);
        assert_eq!(summary.openai_wins, 0);
        assert_eq!(summary.ties, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.finished_at >= summary.started_at);

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["openaiWins"], 0);
        assert_eq!(value["parallelWins"], 1);
    }
}
