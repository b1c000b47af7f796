use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{BenchmarkConfig, Config};
use crate::error::{Error, Result};
use crate::judge::Judge;
use crate::llm::OpenAiChat;
use crate::metrics::SuiteMetrics;
use crate::progress::{ProgressSender, SuiteEvent};
use crate::provider::SearchProvider;
use crate::providers;
use crate::scoring::{self, Judgment};
use crate::suite::{QueryOutcome, SuiteRun};
use crate::types::{PerProvider, ProviderId, ProviderResult, SearchComparison, SearchParams};

/// Orchestrates provider dispatch, judging and suite execution
pub struct BenchmarkRunner {
    providers: PerProvider<Box<dyn SearchProvider>>,
    judge: Judge,
    deadlines: PerProvider<Duration>,
    config: BenchmarkConfig,
}

impl BenchmarkRunner {
    pub fn new(
        providers: PerProvider<Box<dyn SearchProvider>>,
        judge: Judge,
        deadlines: PerProvider<Duration>,
        config: BenchmarkConfig,
    ) -> Self {
        Self {
            providers,
            judge,
            deadlines,
            config,
        }
    }

    /// Wire up the real adapters and judge
    pub fn from_config(config: &Config) -> Result<Self> {
        let providers = providers::from_config(&config.providers)?;
        let model = Arc::new(OpenAiChat::new(
            config.judge.api_key.as_deref(),
            config.judge.base_url.as_deref(),
        ));
        let judge = Judge::new(model, config.judge.clone());
        Ok(Self::new(
            providers,
            judge,
            config.deadlines(),
            config.benchmark.clone(),
        ))
    }

    /// Default number of results requested per provider
    pub fn num_results(&self) -> usize {
        self.config.num_results
    }

    pub fn suite_size(&self) -> usize {
        self.config.suite_size
    }

    /// Query all three providers concurrently, without judging.
    ///
    /// Provider failures and deadline overruns become error placeholders;
    /// only invalid input fails the call.
    pub async fn search(&self, query: &str, num_results: usize) -> Result<SearchComparison> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("Query is required".into()));
        }
        if num_results == 0 {
            return Err(Error::InvalidInput("numResults must be at least 1".into()));
        }

        let params = SearchParams { num_results };
        let (parallel, exa, openai) = tokio::join!(
            self.dispatch(ProviderId::Parallel, query, &params),
            self.dispatch(ProviderId::Exa, query, &params),
            self.dispatch(ProviderId::OpenAi, query, &params),
        );

        debug!(
            query,
            parallel_hits = parallel.results.len(),
            exa_hits = exa.results.len(),
            openai_hits = openai.results.len(),
            "all providers resolved"
        );

        Ok(SearchComparison {
            query: query.to_string(),
            results: PerProvider {
                parallel,
                exa,
                openai,
            },
        })
    }

    /// Race one provider against its deadline
    async fn dispatch(&self, id: ProviderId, query: &str, params: &SearchParams) -> ProviderResult {
        let deadline = *self.deadlines.get(id);
        let search = self.providers.get(id).search(query, params);

        let error = match timeout(deadline, search).await {
            Ok(Ok(result)) => return result,
            Ok(Err(e)) => e,
            Err(_) => Error::Timeout(deadline.as_millis() as u64),
        };

        warn!(provider = %id, kind = ?error.kind(), error = %error, "provider search failed");
        ProviderResult::failed(id, error.to_string())
    }

    /// Judge a completed comparison and score it.
    ///
    /// Judge parse failures and the judge deadline are fatal.
    pub async fn judge(&self, comparison: &SearchComparison) -> Result<Judgment> {
        let deadline = self.judge.config().deadline();
        let verdicts = timeout(deadline, self.judge.judge(comparison))
            .await
            .map_err(|_| Error::Timeout(deadline.as_millis() as u64))??;

        let judgment = scoring::score(&comparison.results, &verdicts);
        info!(query = %comparison.query, winner = %judgment.winner, "query scored");
        Ok(judgment)
    }

    /// Search then judge one query
    pub async fn evaluate(&self, query: &str) -> Result<(SearchComparison, Judgment)> {
        let comparison = self.search(query, self.config.num_results).await?;
        let judgment = self.judge(&comparison).await?;
        Ok((comparison, judgment))
    }

    /// Have the judge model invent `count` test queries
    pub async fn generate_suite(&self, count: usize, topic: Option<&str>) -> Result<Vec<String>> {
        self.judge.generate_queries(count, topic).await
    }

    /// Evaluate every query of `suite` in order, streaming events to `progress`.
    ///
    /// Always ends with exactly one terminal event: `complete`, or `error`
    /// when the run cannot proceed at all.
    pub async fn run_suite(&self, suite: SuiteRun, progress: &ProgressSender) {
        let terminal = match self.drive_suite(suite, progress).await {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "suite aborted");
                SuiteEvent::Failed {
                    message: e.to_string(),
                }
            }
        };
        progress.emit(terminal).await;
    }

    async fn drive_suite(&self, mut suite: SuiteRun, progress: &ProgressSender) -> Result<SuiteEvent> {
        // no completed call can take longer than its deadline
        let ceiling_ms = self
            .deadlines
            .iter()
            .map(|(_, deadline)| deadline.as_millis() as u64)
            .fold(0, u64::max);
        let mut metrics = SuiteMetrics::new(ceiling_ms)?;

        let queries = suite.queries().to_vec();
        let total = queries.len();
        info!(total, "starting suite");

        for (index, query) in queries.into_iter().enumerate() {
            progress
                .emit(SuiteEvent::Progress {
                    current: index + 1,
                    total,
                    query: query.clone(),
                })
                .await;

            let outcome = match self.score_query(&query, &mut metrics).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(index, query = %query, kind = ?e.kind(), error = %e, "query failed");
                    QueryOutcome::failed(query, e.to_string())
                }
            };

            progress
                .emit(SuiteEvent::QueryResult {
                    index,
                    result: outcome.clone(),
                })
                .await;
            suite.record(outcome);
        }

        let (results, summary) = suite.finish(metrics.summary());
        info!(
            total = summary.total,
            parallel = summary.parallel_wins,
            exa = summary.exa_wins,
            openai = summary.openai_wins,
            ties = summary.ties,
            failed = summary.failed,
            "suite complete"
        );
        Ok(SuiteEvent::Complete { results, summary })
    }

    async fn score_query(&self, query: &str, metrics: &mut SuiteMetrics) -> Result<QueryOutcome> {
        let comparison = self.search(query, self.config.num_results).await?;
        metrics.record(&comparison.results);
        let judgment = self.judge(&comparison).await?;
        Ok(QueryOutcome::scored(&comparison, judgment))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;
    use crate::config::JudgeConfig;
    use crate::llm::{ChatRequest, LanguageModel};
    use crate::progress;
    use crate::scoring::Winner;
    use crate::types::SearchHit;

    /// Fake provider that answers after `delay`
    struct FakeProvider {
        id: ProviderId,
        delay: Duration,
        latency_ms: u64,
        cost: f64,
        hits: usize,
        fail: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(id: ProviderId, latency_ms: u64, cost: f64, hits: usize) -> Self {
            Self {
                id,
                delay: Duration::from_millis(latency_ms),
                latency_ms,
                cost,
                hits,
                fail: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn stalled(id: ProviderId, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::new(id, 1, 0.04, 3)
            }
        }

        fn failing(id: ProviderId, message: &'static str) -> Self {
            Self {
                fail: Some(message),
                ..Self::new(id, 1, 0.01, 0)
            }
        }
    }

    #[async_trait]
    impl SearchProvider for FakeProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn search(&self, query: &str, params: &SearchParams) -> Result<ProviderResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if let Some(message) = self.fail {
                return Err(Error::Api {
                    provider: self.id,
                    status: 500,
                    body: message.into(),
                });
            }
            let hits = (0..self.hits.min(params.num_results))
                .map(|i| SearchHit {
                    title: format!("{query} {i}"),
                    url: format!("https://{}.example/{i}", self.id),
                    published_date: None,
                    excerpt: String::new(),
                })
                .collect();
            Ok(ProviderResult::new(self.id, self.latency_ms, self.cost, hits))
        }
    }

    /// Fake judge model replaying scripted responses, repeating the last one
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        delay: Duration,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                delay: Duration::ZERO,
            })
        }

        fn slow(reply: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(VecDeque::from([reply.to_string()])),
                delay,
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            };
            Ok(reply.unwrap_or_default())
        }
    }

    const VERDICTS: &str = r#"{"parallel": {"accuracy": 7, "reasoning": "solid"}, "exa": {"accuracy": 8, "reasoning": "detailed"}, "openai": {"accuracy": 10, "reasoning": "n/a"}}"#;

    fn deadlines() -> PerProvider<Duration> {
        PerProvider {
            parallel: Duration::from_secs(15),
            exa: Duration::from_secs(15),
            openai: Duration::from_secs(20),
        }
    }

    fn runner_with(
        providers: PerProvider<FakeProvider>,
        model: Arc<dyn LanguageModel>,
    ) -> BenchmarkRunner {
        let PerProvider {
            parallel,
            exa,
            openai,
        } = providers;
        BenchmarkRunner::new(
            PerProvider {
                parallel: Box::new(parallel),
                exa: Box::new(exa),
                openai: Box::new(openai),
            },
            Judge::new(model, JudgeConfig::default()),
            deadlines(),
            BenchmarkConfig::default(),
        )
    }

    fn hiking_providers() -> PerProvider<FakeProvider> {
        PerProvider {
            parallel: FakeProvider::new(ProviderId::Parallel, 200, 0.01, 3),
            exa: FakeProvider::new(ProviderId::Exa, 800, 0.0085, 5),
            openai: FakeProvider::stalled(ProviderId::OpenAi, Duration::from_secs(60)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_becomes_timeout_placeholder() {
        let runner = runner_with(hiking_providers(), ScriptedModel::new(&[VERDICTS]));

        let comparison = runner.search("best hiking trails", 10).await.unwrap();
        let openai = &comparison.results.openai;
        assert!(openai.results.is_empty());
        assert_eq!(openai.error.as_deref(), Some("Timeout after 20000ms"));
        assert_eq!(openai.latency_ms, 0);
        assert_eq!(comparison.results.parallel.results.len(), 3);
        assert_eq!(comparison.results.exa.results.len(), 5);

        let judgment = runner.judge(&comparison).await.unwrap();
        assert_eq!(judgment.scores.openai.latency_score, 0);
        assert_eq!(judgment.scores.openai.total, 5);
        assert_eq!(judgment.scores.parallel.latency_score, 10);
        assert_eq!(judgment.winner, Winner::Tie);
    }

    #[tokio::test]
    async fn provider_error_is_absorbed() {
        let providers = PerProvider {
            parallel: FakeProvider::new(ProviderId::Parallel, 200, 0.01, 3),
            exa: FakeProvider::failing(ProviderId::Exa, "upstream exploded"),
            openai: FakeProvider::new(ProviderId::OpenAi, 300, 0.04, 2),
        };
        let runner = runner_with(providers, ScriptedModel::new(&[VERDICTS]));

        let comparison = runner.search("q", 10).await.unwrap();
        let exa = &comparison.results.exa;
        assert!(exa.is_error());
        assert!(exa.error.as_deref().unwrap().contains("upstream exploded"));
        assert_eq!(exa.estimated_cost, 0.0);
        assert_eq!(comparison.results.openai.results.len(), 2);
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_dispatch() {
        let providers = hiking_providers();
        let calls = [
            providers.parallel.calls.clone(),
            providers.exa.calls.clone(),
            providers.openai.calls.clone(),
        ];
        let runner = runner_with(providers, ScriptedModel::new(&[VERDICTS]));

        let err = runner.search("   ", 10).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = runner.search("q", 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(calls.iter().all(|c| c.load(Ordering::SeqCst) == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn judge_deadline_is_fatal() {
        let model = ScriptedModel::slow(VERDICTS, Duration::from_secs(45));
        let runner = runner_with(hiking_providers(), model);

        let err = runner.evaluate("best hiking trails").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(30_000)));
    }

    #[tokio::test]
    async fn judge_parse_failure_is_fatal_for_single_query() {
        let providers = PerProvider {
            parallel: FakeProvider::new(ProviderId::Parallel, 1, 0.01, 1),
            exa: FakeProvider::new(ProviderId::Exa, 1, 0.0045, 1),
            openai: FakeProvider::new(ProviderId::OpenAi, 1, 0.04, 1),
        };
        let runner = runner_with(providers, ScriptedModel::new(&["no json here"]));
        let err = runner.evaluate("q").await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn suite_streams_progress_results_then_complete() {
        let runner = runner_with(
            hiking_providers(),
            ScriptedModel::new(&[VERDICTS, "I refuse to answer in JSON", VERDICTS]),
        );
        let suite = SuiteRun::new(vec!["one".into(), "two".into(), "three".into()]).unwrap();
        let (tx, rx) = progress::channel(4);

        let producer = async move { runner.run_suite(suite, &tx).await };
        let ((), events) = tokio::join!(producer, rx.into_stream().collect::<Vec<_>>());

        let tags: Vec<&str> = events
            .iter()
            .map(|e| match e {
                SuiteEvent::Progress { .. } => "progress",
                SuiteEvent::QueryResult { .. } => "result",
                SuiteEvent::Complete { .. } => "complete",
                SuiteEvent::Failed { .. } => "error",
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                "progress", "result", "progress", "result", "progress", "result", "complete"
            ]
        );

        match &events[1] {
            SuiteEvent::QueryResult { index, result } => {
                assert_eq!(*index, 0);
                assert_eq!(result.winner(), Some(Winner::Tie));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[3] {
            SuiteEvent::QueryResult { index, result } => {
                assert_eq!(*index, 1);
                assert_eq!(result.query(), "two");
                assert!(matches!(result, QueryOutcome::Failed(_)));
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[6] {
            SuiteEvent::Complete { results, summary } => {
                assert_eq!(results.len(), 3);
                assert_eq!(summary.total, 3);
                assert_eq!(summary.ties, 2);
                assert_eq!(summary.failed, 1);
                assert_eq!(summary.latency.parallel.samples, 3);
                assert_eq!(summary.latency.openai.samples, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn untrackable_deadlines_abort_with_single_error_event() {
        let providers = hiking_providers();
        let calls = providers.parallel.calls.clone();
        let mut runner = runner_with(providers, ScriptedModel::new(&[VERDICTS]));
        runner.deadlines = PerProvider::from_fn(|_| Duration::from_millis(1));

        let suite = SuiteRun::new(vec!["a".into(), "b".into()]).unwrap();
        let (tx, rx) = progress::channel(4);
        let producer = async move { runner.run_suite(suite, &tx).await };
        let ((), events) = tokio::join!(producer, rx.into_stream().collect::<Vec<_>>());

        assert_eq!(events.len(), 1);
        match &events[0] {
            SuiteEvent::Failed { message } => assert!(message.contains("latency histogram")),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn suite_keeps_running_without_consumer() {
        let providers = PerProvider {
            parallel: FakeProvider::new(ProviderId::Parallel, 1, 0.01, 1),
            exa: FakeProvider::new(ProviderId::Exa, 1, 0.0045, 1),
            openai: FakeProvider::new(ProviderId::OpenAi, 1, 0.04, 1),
        };
        let calls = providers.exa.calls.clone();
        let runner = runner_with(providers, ScriptedModel::new(&[VERDICTS]));
        let suite = SuiteRun::new(vec!["a".into(), "b".into()]).unwrap();

        let (tx, rx) = progress::channel(1);
        drop(rx);
        runner.run_suite(suite, &tx).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
