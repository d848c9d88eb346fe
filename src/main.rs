use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use plotverdict::agent::Engine;
use plotverdict::llm::openai::LlmClient;
use plotverdict::serper::Serper;
use plotverdict::server::{run_server, AppState};

#[derive(Parser)]
#[command(name = "plotverdict", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    /// Chat model id
    #[arg(long, default_value = "gpt-4.1-mini")]
    model: String,
    /// OpenAI-compatible base URL override
    #[arg(long)]
    base_url: Option<String>,
    /// Completion token cap per engine call
    #[arg(long, default_value_t = 300)]
    max_tokens: u32,
    /// Deadline for each engine call
    #[arg(long, default_value_t = 30_000)]
    llm_timeout_ms: u64,
    /// Results fetched per search query
    #[arg(long, default_value_t = 3)]
    search_top_k: usize,
    /// Search provider rate limit
    #[arg(long, default_value_t = 5)]
    search_qps: u32,
    /// Concurrent retrievals per evaluation
    #[arg(long, default_value_t = 5)]
    search_concurrency: usize,
    #[arg(long, default_value_t = 10_000)]
    search_timeout_ms: u64,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        addr: String,
        /// JSONL file user feedback is appended to
        #[arg(long, default_value = "./feedback.jsonl")]
        feedback_file: String,
    },
    /// Evaluate one guess from the command line
    Evaluate {
        #[arg(long)]
        show: String,
        #[arg(long)]
        guess: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let serper_key = std::env::var("SERPER_API_KEY").unwrap_or_default();
    if serper_key.is_empty() {
        tracing::warn!("SERPER_API_KEY not set, web searches will fail");
    }

    let engine = Engine {
        llm: Arc::new(LlmClient::new(
            cli.model.clone(),
            cli.base_url.clone(),
            std::env::var("OPENAI_API_KEY").ok(),
            cli.max_tokens,
            cli.llm_timeout_ms,
        )),
        search: Arc::new(Serper::new(
            serper_key,
            cli.search_qps,
            cli.search_top_k,
            false, // safe search off, per the evaluation contract
            cli.search_timeout_ms,
        )),
        search_concurrency: cli.search_concurrency,
    };

    match cli.cmd {
        Cmd::Serve { addr, feedback_file } => {
            run_server(AppState { engine, feedback_path: feedback_file.into() }, &addr).await
        }
        Cmd::Evaluate { show, guess } => {
            let verdict = engine.evaluate(&show, &guess).await;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_exposes_engine_tuning_flags() {
        let cli = Cli::try_parse_from([
            "plotverdict",
            "--max-tokens",
            "200",
            "--llm-timeout-ms",
            "5000",
            "evaluate",
            "--show",
            "House",
            "--guess",
            "g",
        ])
        .unwrap();
        assert_eq!(cli.max_tokens, 200);
        assert_eq!(cli.llm_timeout_ms, 5000);
    }

    #[test]
    fn cli_defaults_match_documented_limits() {
        let cli = Cli::try_parse_from(["plotverdict", "evaluate", "--show", "s", "--guess", "g"])
            .unwrap();
        assert_eq!(cli.max_tokens, 300);
        assert_eq!(cli.llm_timeout_ms, 30_000);
    }
}
