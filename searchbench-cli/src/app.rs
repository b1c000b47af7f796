use std::path::Path;

use anyhow::{Result, anyhow};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use searchbench_core::{
    BenchmarkRunner, Config, FrameWriter, JudgeRequest, Judgment, QueryFile, SearchComparison,
    SuiteEvent, SuiteRun, SuiteSummary, progress,
};

/// Application state
pub struct App {
    pub config: Config,
    runner: BenchmarkRunner,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let runner = BenchmarkRunner::from_config(&config)?;
        Ok(Self { config, runner })
    }

    pub async fn search(&self, query: &str, num_results: Option<usize>) -> Result<SearchComparison> {
        let num_results = num_results.unwrap_or_else(|| self.runner.num_results());
        Ok(self.runner.search(query, num_results).await?)
    }

    /// Judge a previously captured comparison read from a JSON file
    pub async fn judge_file(&self, path: &Path) -> Result<Judgment> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
        let request: JudgeRequest = serde_json::from_str(&contents)?;
        let comparison = request.into_comparison()?;
        Ok(self.runner.judge(&comparison).await?)
    }

    pub async fn generate(&self, count: Option<usize>, topic: Option<&str>) -> Result<Vec<String>> {
        let count = count.unwrap_or_else(|| self.runner.suite_size());
        Ok(self.runner.generate_suite(count, topic).await?)
    }

    /// Resolve suite queries: a query file, inline queries, or freshly generated ones
    pub async fn suite_queries(&self, file: Option<&Path>, inline: Vec<String>) -> Result<Vec<String>> {
        let mut queries = match file {
            Some(path) => QueryFile::from_file(path)?.into_queries(),
            None => Vec::new(),
        };
        queries.extend(inline);

        if queries.is_empty() && file.is_none() {
            eprintln!("No queries given, generating {}...", self.runner.suite_size());
            queries = self.generate(None, None).await?;
        }
        Ok(queries)
    }

    /// Run a suite, streaming NDJSON frames to stdout with a progress bar on stderr
    pub async fn run_suite(&self, queries: Vec<String>) -> Result<SuiteSummary> {
        let suite = SuiteRun::new(queries)?;
        let bar = ProgressBar::new(suite.queries().len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")?
                .progress_chars("=> "),
        );

        let (tx, rx) = progress::channel(self.config.benchmark.channel_capacity);
        let runner = &self.runner;

        let producer = async move { runner.run_suite(suite, &tx).await };
        // Owns the receiver so a failed write unblocks the producer
        let consumer = async move {
            let mut events = Box::pin(rx.into_stream());
            let mut writer = FrameWriter::new(tokio::io::stdout());
            let mut terminal = None;
            while let Some(event) = events.next().await {
                match &event {
                    SuiteEvent::Progress { query, .. } => bar.set_message(query.clone()),
                    SuiteEvent::QueryResult { .. } => bar.inc(1),
                    SuiteEvent::Complete { .. } => bar.finish_with_message("done"),
                    SuiteEvent::Failed { message } => bar.abandon_with_message(message.clone()),
                }
                writer.write(&event).await?;
                if event.is_terminal() {
                    terminal = Some(event);
                }
            }
            Ok::<_, anyhow::Error>(terminal)
        };

        let ((), terminal) = tokio::join!(producer, consumer);
        match terminal? {
            Some(SuiteEvent::Complete { summary, .. }) => Ok(summary),
            Some(SuiteEvent::Failed { message }) => Err(anyhow!("Suite aborted: {message}")),
            _ => Err(anyhow!("Suite ended without a terminal event")),
        }
    }
}
