//! Command-line front end for the research engine (§6): a thin
//! argument-parsing and formatting layer over [`kodegen_tools_citescrape::Orchestrator`].
//! Library errors are typed (`ResearchError`); here at the process boundary
//! they're wrapped in `anyhow::Error` and reported with a non-zero exit
//! code, per the crate's error-handling convention.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;

use kodegen_tools_citescrape::{
    CacheNamespace, CitationStyle, Config, Orchestrator, RunStatus, StartRequest,
};

#[derive(Parser)]
#[command(name = "kodegen-citescrape")]
#[command(about = "Multi-engine research automation: search, scrape, score and synthesize a cited report")]
struct Cli {
    /// Root directory for the query/page/summary caches (defaults to $CACHE_DIR or ./.citescrape-cache).
    #[arg(long, global = true)]
    cache_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a research query to completion and print its report.
    Research {
        /// The research question.
        query: String,

        /// Re-run even if a cached result exists for this query.
        #[arg(long)]
        force_refresh: bool,

        /// Keep searching beyond the first pass of focus areas.
        #[arg(long)]
        continuous: bool,

        /// Cap the total number of sources fetched across all focus areas.
        #[arg(long)]
        max_sources: Option<usize>,

        /// Reserved for future iterative-depth control; currently recorded but inert.
        #[arg(long)]
        depth_level: Option<u8>,

        /// Supply focus areas directly, skipping LLM-driven analysis. May be repeated.
        #[arg(long = "focus-area")]
        focus_areas: Vec<String>,

        /// Citation style for the printed bibliography.
        #[arg(long, value_enum, default_value = "apa")]
        style: CliCitationStyle,

        /// Print each progress event to stderr as the run proceeds.
        #[arg(long)]
        verbose_progress: bool,
    },
    /// Print entry counts and hit/miss stats for each cache namespace.
    CacheStats,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliCitationStyle {
    Apa,
    Mla,
    Chicago,
    Harvard,
    Ieee,
}

impl From<CliCitationStyle> for CitationStyle {
    fn from(style: CliCitationStyle) -> Self {
        match style {
            CliCitationStyle::Apa => CitationStyle::Apa,
            CliCitationStyle::Mla => CitationStyle::Mla,
            CliCitationStyle::Chicago => CitationStyle::Chicago,
            CliCitationStyle::Harvard => CitationStyle::Harvard,
            CliCitationStyle::Ieee => CitationStyle::Ieee,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cache_dir = cli
        .cache_dir
        .clone()
        .map(std::path::PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("citescrape")))
        .context("no cache directory configured: pass --cache-dir, set CACHE_DIR, or run where a user cache directory is resolvable")?;

    let config = Config::from_env()
        .cache_dir(cache_dir)
        .build()
        .context("failed to build configuration")?;

    match cli.command {
        Commands::Research {
            query,
            force_refresh,
            continuous,
            max_sources,
            depth_level,
            focus_areas,
            style,
            verbose_progress,
        } => {
            let orchestrator = Orchestrator::new(config)
                .await
                .context("failed to initialize orchestrator")?;

            let request = StartRequest {
                query,
                user_id: None,
                continuous,
                force_refresh,
                max_sources,
                depth_level,
                focus_areas: if focus_areas.is_empty() { None } else { Some(focus_areas) },
            };

            let request_id = orchestrator
                .start_research(request)
                .context("failed to start research run")?;

            if let Some(mut progress) = orchestrator.subscribe_progress(&request_id) {
                while let Some(event) = progress.next().await {
                    if verbose_progress {
                        eprintln!("[{:>3}%] {}", event.progress_percent, event.message);
                    }
                }
            }

            let Some(result) = orchestrator.get_results(&request_id) else {
                anyhow::bail!("run {request_id} ended without producing a result");
            };

            println!("{}", result.summary);
            println!();
            println!("Sources ({}):", result.sources.len());
            for source in &result.sources {
                println!("  - {} (reliability {:.2})", source.url, source.reliability);
            }
            println!();

            let (citations, bibliography) = orchestrator
                .citations(&request_id, style.into())
                .unwrap_or_default();
            if !citations.is_empty() {
                println!("Bibliography:");
                println!("{bibliography}");
            }

            if !result.errors.is_empty() {
                eprintln!("Non-fatal errors encountered during the run:");
                for error in &result.errors {
                    eprintln!("  - {error}");
                }
            }

            Ok(if result.status == RunStatus::Failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::CacheStats => {
            for namespace in [CacheNamespace::Query, CacheNamespace::Page, CacheNamespace::Summary] {
                let cache = kodegen_tools_citescrape::Cache::open(
                    config.cache_dir(),
                    namespace,
                    std::time::Duration::from_secs(config.cache_ttl_seconds()),
                    config.cache_max_entries(),
                )
                .await
                .with_context(|| format!("failed to open {} cache", namespace.dir_name()))?;
                let stats = cache.stats().await;
                println!("{}: {stats:?}", namespace.dir_name());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
