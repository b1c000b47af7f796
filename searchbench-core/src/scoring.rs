use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{PerProvider, ProviderId, ProviderResult};

/// Order in which equal totals are ranked
const TIE_ORDER: [ProviderId; 3] = [ProviderId::Parallel, ProviderId::OpenAi, ProviderId::Exa];

const BEST_SCORE: f64 = 10.0;
/// Distance between the best and worst relative scores
const SCORE_SPREAD: f64 = 7.0;
const LATENCY_WEIGHT: f64 = 0.25;
const COST_WEIGHT: f64 = 0.25;
const ACCURACY_WEIGHT: f64 = 0.5;
pub const MAX_ACCURACY: u8 = 10;
pub const NO_EVALUATION: &str = "No evaluation available";

/// The judge's opinion of one provider's results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub accuracy: u8,
    pub reasoning: String,
}

impl Verdict {
    /// Used when the judge did not rate a provider
    pub fn missing() -> Self {
        Self {
            accuracy: 0,
            reasoning: NO_EVALUATION.to_string(),
        }
    }
}

/// Final scores for one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderScore {
    pub latency: u64,
    pub latency_score: u8,
    pub cost: f64,
    pub cost_score: u8,
    pub accuracy: u8,
    pub reasoning: String,
    pub total: u8,
}

/// Winner designation of one query evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Winner {
    Provider(ProviderId),
    Tie,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(id) => f.write_str(id.as_str()),
            Self::Tie => f.write_str("tie"),
        }
    }
}

impl FromStr for Winner {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tie" => Ok(Self::Tie),
            other => other.parse().map(Self::Provider),
        }
    }
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        winner.to_string()
    }
}

impl TryFrom<String> for Winner {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Scored comparison of all providers for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    #[serde(flatten)]
    pub scores: PerProvider<ProviderScore>,
    pub winner: Winner,
    /// All providers, best first
    pub ranking: Vec<ProviderId>,
}

/// Score every provider and pick a winner.
///
/// Latency and cost are relative to the other providers of the same query.
/// Totals weight latency and cost at 25% each and accuracy at 50%.
pub fn score(
    results: &PerProvider<ProviderResult>,
    verdicts: &PerProvider<Verdict>,
) -> Judgment {
    let latencies: Vec<f64> = results.iter().map(|(_, r)| r.latency_ms as f64).collect();
    let costs: Vec<f64> = results.iter().map(|(_, r)| r.estimated_cost).collect();

    let scores = results.map(|id, result| {
        let verdict = verdicts.get(id);
        let latency_score = relative_score(result.latency_ms as f64, &latencies);
        let cost_score = relative_score(result.estimated_cost, &costs);
        let accuracy = verdict.accuracy.min(MAX_ACCURACY);

        ProviderScore {
            latency: result.latency_ms,
            latency_score,
            cost: result.estimated_cost,
            cost_score,
            accuracy,
            reasoning: verdict.reasoning.clone(),
            total: total_score(latency_score, cost_score, accuracy),
        }
    });

    let (winner, ranking) = rank(&scores);
    Judgment {
        scores,
        winner,
        ranking,
    }
}

/// Inverse linear mapping of `value` within the non-zero `observed` values.
///
/// Smallest maps to 10, largest to 3; zero means no data and scores 0.
pub fn relative_score(value: f64, observed: &[f64]) -> u8 {
    if value <= 0.0 {
        return 0;
    }

    let present = observed.iter().copied().filter(|v| *v > 0.0);
    let min = present.clone().fold(f64::INFINITY, f64::min);
    let max = present.fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || max <= min {
        return BEST_SCORE as u8;
    }

    let scaled = BEST_SCORE - ((value - min) / (max - min)) * SCORE_SPREAD;
    scaled.round().clamp(0.0, BEST_SCORE) as u8
}

/// Weighted total, always within 0..=10
pub fn total_score(latency_score: u8, cost_score: u8, accuracy: u8) -> u8 {
    let weighted = LATENCY_WEIGHT * f64::from(latency_score)
        + COST_WEIGHT * f64::from(cost_score)
        + ACCURACY_WEIGHT * f64::from(accuracy);
    weighted.round() as u8
}

/// Order providers by descending total and designate the winner.
///
/// Equal totals keep `TIE_ORDER`. A tie at the top, whether two-
/// or three-way, yields `Winner::Tie`; the ranking is emitted regardless.
#[allow(clippy::if_same_then_else)]
pub fn rank(scores: &PerProvider<ProviderScore>) -> (Winner, Vec<ProviderId>) {
    let mut ordered: Vec<(ProviderId, u8)> = TIE_ORDER
        .into_iter()
        .map(|id| (id, scores.get(id).total))
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let [(first, top), (_, second), (_, third)] = [ordered[0], ordered[1], ordered[2]];
    let winner = if top == second && second == third {
        Winner::Tie
    } else if top == second {
        Winner::Tie
    } else {
        Winner::Provider(first)
    };

    (winner, ordered.into_iter().map(|(id, _)| id).collect())
}
