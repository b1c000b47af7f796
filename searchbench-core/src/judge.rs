use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::JudgeConfig;
use crate::error::{Error, Result};
use crate::extract::{JsonShape, parse_lenient};
use crate::llm::{ChatRequest, LanguageModel};
use crate::scoring::{MAX_ACCURACY, NO_EVALUATION, Verdict};
use crate::types::{PerProvider, ProviderId, ProviderResult, SearchComparison};

/// Hits per provider embedded in the judging prompt
pub const JUDGED_HITS: usize = 5;

#[derive(Serialize)]
struct PromptHit<'a> {
    title: &'a str,
    url: &'a str,
    excerpt: &'a str,
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default)]
    accuracy: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Rates each provider's results for accuracy and synthesizes suite queries
pub struct Judge {
    model: Arc<dyn LanguageModel>,
    config: JudgeConfig,
}

impl Judge {
    pub fn new(model: Arc<dyn LanguageModel>, config: JudgeConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Ask the model to rate every provider's results for `comparison.query`.
    ///
    /// An unparseable response is an error; a provider the model skipped
    /// gets [`Verdict::missing`].
    pub async fn judge(&self, comparison: &SearchComparison) -> Result<PerProvider<Verdict>> {
        let prompt = judge_prompt(comparison, self.config.audience.as_deref())?;
        let request = ChatRequest::new(&self.config.model, prompt)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let content = self.model.complete(request).await?;
        let verdicts = parse_verdicts(&content).inspect_err(|e| {
            warn!(error = %e, query = %comparison.query, "judge response rejected");
        })?;

        debug!(
            query = %comparison.query,
            parallel = verdicts.parallel.accuracy,
            exa = verdicts.exa.accuracy,
            openai = verdicts.openai.accuracy,
            "judged accuracy"
        );
        Ok(verdicts)
    }

    /// Generate `count` search queries, optionally about `topic`
    pub async fn generate_queries(&self, count: usize, topic: Option<&str>) -> Result<Vec<String>> {
        if count == 0 {
            return Err(Error::InvalidInput("count must be at least 1".into()));
        }
        let topic = topic.map(str::trim).filter(|t| !t.is_empty());

        let prompt = generation_prompt(count, topic, self.config.audience.as_deref());
        let request = ChatRequest::new(&self.config.model, prompt)
            .with_temperature(self.config.generation_temperature)
            .with_max_tokens(self.config.max_tokens);

        let content = self.model.complete(request).await?;
        let generated: Vec<String> =
            parse_lenient(&content, JsonShape::Array, "generated queries")?;

        let queries: Vec<String> = generated
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(count)
            .collect();

        if queries.is_empty() {
            return Err(Error::parse("generated queries", "no non-empty queries"));
        }
        if queries.len() < count {
            warn!(
                requested = count,
                generated = queries.len(),
                "model returned fewer queries than requested"
            );
        }

        info!(
            count = queries.len(),
            topic = topic.unwrap_or("default"),
            "generated suite queries"
        );
        Ok(queries)
    }
}

fn provider_label(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Parallel => "PARALLEL",
        ProviderId::Exa => "EXA",
        ProviderId::OpenAi => "OPENAI WEB SEARCH",
    }
}

/// Rubric prompt embedding each provider's metrics and top hits
pub fn judge_prompt(comparison: &SearchComparison, audience: Option<&str>) -> Result<String> {
    let mut prompt = match audience {
        Some(audience) => {
            format!("You are evaluating search result ACCURACY for this query from {audience}:\n")
        }
        None => "You are evaluating search result ACCURACY for this query:\n".to_string(),
    };
    writeln!(prompt, "\nQuery: \"{}\"\n", comparison.query).ok();

    prompt.push_str(
        "Rate each provider's results on ACCURACY (1-10 scale):\n\
         - How relevant are the results to what the user actually needs?\n\
         - How helpful would these results be for answering the query well?\n\
         - How appropriate and trustworthy are the sources?\n",
    );

    for (id, result) in comparison.results.iter() {
        write_provider_section(&mut prompt, id, result)?;
    }

    prompt.push_str(
        "\nReturn ONLY valid JSON (no markdown, no code blocks) in this exact format:\n\
         {\n  \"parallel\": {\"accuracy\": X, \"reasoning\": \"1-2 sentence explanation\"},\n  \
         \"exa\": {\"accuracy\": X, \"reasoning\": \"1-2 sentence explanation\"},\n  \
         \"openai\": {\"accuracy\": X, \"reasoning\": \"1-2 sentence explanation\"}\n}",
    );

    Ok(prompt)
}

fn write_provider_section(
    prompt: &mut String,
    id: ProviderId,
    result: &ProviderResult,
) -> Result<()> {
    let hits: Vec<PromptHit<'_>> = result
        .results
        .iter()
        .take(JUDGED_HITS)
        .map(|hit| PromptHit {
            title: &hit.title,
            url: &hit.url,
            excerpt: &hit.excerpt,
        })
        .collect();

    let status = match &result.error {
        Some(error) => format!(", failed: {error}"),
        None => String::new(),
    };

    writeln!(
        prompt,
        "\n{} Results ({} results, {}ms, ${:.4}{status}):\n{}",
        provider_label(id),
        result.results.len(),
        result.latency_ms,
        result.estimated_cost,
        serde_json::to_string_pretty(&hits)?,
    )
    .ok();
    Ok(())
}

/// Parse the judge's JSON object into one verdict per provider
pub fn parse_verdicts(content: &str) -> Result<PerProvider<Verdict>> {
    let mut raw: HashMap<String, Value> =
        parse_lenient(content, JsonShape::Object, "judge response")?;

    Ok(PerProvider::from_fn(|id| {
        let Some(entry) = raw.remove(id.as_str()) else {
            return Verdict::missing();
        };
        match serde_json::from_value::<RawVerdict>(entry) {
            Ok(verdict) => Verdict {
                accuracy: verdict.accuracy.as_ref().map_or(0, accuracy_value),
                reasoning: verdict
                    .reasoning
                    .filter(|r| !r.trim().is_empty())
                    .unwrap_or_else(|| NO_EVALUATION.to_string()),
            },
            Err(e) => {
                warn!(provider = %id, error = %e, "malformed verdict entry");
                Verdict::missing()
            }
        }
    }))
}

/// Accept numbers or numeric strings, rounded and clamped to 0..=10
fn accuracy_value(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    raw.filter(|v| v.is_finite())
        .map_or(0, |v| v.round().clamp(0.0, f64::from(MAX_ACCURACY)) as u8)
}

fn generation_prompt(count: usize, topic: Option<&str>, audience: Option<&str>) -> String {
    let who = audience.unwrap_or("people using a web search assistant");

    match topic {
        Some(topic) => format!(
            r#"Generate {count} realistic search queries that {who} might ask when they want information about: "{topic}"

Include variations like:
- Emotional support queries (e.g., "how to deal with feeling anxious")
- Life advice (e.g., "should I change careers at 30")
- Self-improvement (e.g., "ways to build confidence")
- Curiosity questions (e.g., "why do people ghost")
- Practical help (e.g., "how to have difficult conversations")

Make them conversational and personal, the way someone would actually ask.

Return ONLY a valid JSON array of query strings (no markdown, no code blocks):
["query 1", "query 2", ...]"#
        ),
        None => format!(
            r#"Generate {count} questions that {who} would actually ask.

These are NOT polished search queries. They are how someone actually talks when asking for help.

Topics people care about:
- Relationships (romantic, family, friendships)
- Mental health and emotions
- Career and school stress
- Practical how-to problems
- Big life decisions
- Curiosity about the world

Make them sound real and personal: first person, conversational.

Return ONLY a valid JSON array of query strings (no markdown, no code blocks):
["query 1", "query 2", ...]"#
        ),
    }
}
