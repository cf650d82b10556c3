use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use care_agent::config::AppConfig;
use care_agent::eval;
use care_agent::llm::factory::provider_or_unavailable;
use care_agent::models::records::UsageSource;
use care_agent::orchestration::pipeline::{TurnPipeline, TurnStatus};
use care_agent::server;
use care_agent::state::{build_pipeline, AppState, APP_NAME};
use care_agent::store::sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "care-agent")]
#[command(about = "Guardrailed healthcare assistant over clinical lookup tools", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "CARE_AGENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API (chat, feedback, SMS webhook)
    Serve {
        /// Listen address, overrides config
        #[arg(long)]
        bind: Option<String>,
    },

    /// Answer one question and exit
    Ask {
        query: String,
    },

    /// Replay eval cases through the pipeline
    Eval {
        /// Case file; the bundled cases are used when omitted
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Results file; defaults to eval_results/eval_<timestamp>.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("care_agent=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let state = AppState::init(&config).context("initializing application state")?;
            server::run(state, &bind).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Ask { query } => {
            if query.trim().is_empty() {
                bail!("query must not be empty");
            }
            let pipeline = cli_pipeline(&config);
            let outcome = pipeline.run_turn(&query, &[], UsageSource::Cli).await;
            if outcome.status == TurnStatus::Failed {
                bail!(
                    "assistant failed: {}",
                    outcome.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            println!("{}", outcome.output);
            for tool in &outcome.tools_used {
                let status = if tool.result.success() { "ok" } else { "error" };
                eprintln!("  tool {} ({status})", tool.call.name);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Eval { cases, out } => {
            let cases = eval::load_cases(cases.as_deref()).context("loading eval cases")?;
            let pipeline = cli_pipeline(&config);
            println!("Running {} eval cases ...", cases.len());
            let report = eval::run_eval(&pipeline, &cases).await;
            print!("{}", report.render_summary());

            let cwd = std::env::current_dir().context("resolving working directory")?;
            let out = out.unwrap_or_else(|| report.default_output_path(&cwd));
            report.write_json(&out).context("writing eval results")?;
            println!("\nResults written to {}", out.display());

            Ok(if report.all_passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Pipeline for one-shot commands. Usage is still recorded when the store opens.
fn cli_pipeline(config: &AppConfig) -> TurnPipeline {
    let pipeline = build_pipeline(config, provider_or_unavailable(&config.llm));
    let store = match &config.store.sqlite_path {
        Some(path) => SqliteStore::open_at(path.clone()),
        None => SqliteStore::new(APP_NAME),
    };
    match store {
        Ok(store) => pipeline.with_store(Arc::new(store)),
        Err(e) => {
            warn!(error = %e, "usage store unavailable; continuing without it");
            pipeline
        }
    }
}
