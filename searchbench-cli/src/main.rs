mod app;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use searchbench_core::QueryFile;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "searchbench")]
#[command(about = "Compare web search providers on latency, cost and judged accuracy", long_about = None)]
struct Cli {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Query all providers and print the comparison without judging
    Search {
        query: String,

        /// Results requested from each provider
        #[arg(short = 'n', long)]
        num_results: Option<usize>,
    },

    /// Judge a saved comparison (JSON with query, parallel, exa, openai)
    Judge {
        #[arg(long)]
        results: PathBuf,
    },

    /// Generate test queries with the judge model
    Generate {
        #[arg(long)]
        count: Option<usize>,

        /// Subject the queries should be about
        #[arg(long)]
        topic: Option<String>,

        /// Write a query file instead of printing JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a suite, streaming NDJSON events to stdout
    Run {
        /// YAML query file
        #[arg(short, long)]
        queries: Option<PathBuf>,

        /// Inline queries, appended after the query file
        #[arg(value_name = "QUERY")]
        inline: Vec<String>,
    },
}

#[derive(Serialize)]
struct GeneratedQueries<'a> {
    queries: &'a [String],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON output only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => searchbench_core::Config::from_file(path)?,
        None => searchbench_core::Config::default(),
    };
    let app = app::App::new(config)?;

    match cli.command {
        Command::Search { query, num_results } => {
            let comparison = app.search(&query, num_results).await?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Command::Judge { results } => {
            let judgment = app.judge_file(&results).await?;
            println!("{}", serde_json::to_string_pretty(&judgment)?);
        }
        Command::Generate {
            count,
            topic,
            output,
        } => {
            let queries = app.generate(count, topic.as_deref()).await?;
            match output {
                Some(path) => {
                    QueryFile::new(queries).write_to(&path)?;
                    eprintln!("Wrote {}", path.display());
                }
                None => {
                    let body = GeneratedQueries { queries: &queries };
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
            }
        }
        Command::Run { queries, inline } => {
            let queries = app.suite_queries(queries.as_deref(), inline).await?;
            let summary = app.run_suite(queries).await?;
            eprintln!(
                "{} queries: parallel {} / exa {} / openai {} wins, {} ties, {} failed",
                summary.total,
                summary.parallel_wins,
                summary.exa_wins,
                summary.openai_wins,
                summary.ties,
                summary.failed,
            );
        }
    }

    Ok(())
}
