pub mod config;
pub mod error;
pub mod extract;
pub mod judge;
pub mod llm;
pub mod metrics;
pub mod progress;
pub mod provider;
pub mod providers;
pub mod queries;
pub mod runner;
pub mod scoring;
pub mod suite;
pub mod types;

// re-exports
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use judge::Judge;
pub use llm::{ChatRequest, LanguageModel, OpenAiChat};
pub use metrics::{LatencyMetrics, SuiteMetrics};
pub use progress::{FrameWriter, ProgressReceiver, ProgressSender, SuiteEvent};
pub use provider::{CostModel, SearchProvider};
pub use queries::QueryFile;
pub use runner::BenchmarkRunner;
pub use scoring::{Judgment, ProviderScore, Verdict, Winner};
pub use suite::{QueryOutcome, SuiteRun, SuiteSummary};
pub use types::{
    JudgeRequest, PerProvider, ProviderId, ProviderResult, SearchComparison, SearchHit,
    SearchParams,
};

/// User agent sent with every outbound HTTP request
pub const USER_AGENT: &str = concat!("searchbench/", env!("CARGO_PKG_VERSION"));
