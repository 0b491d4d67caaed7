//! Command-line search surface for the job aggregator.
//!
//! Runs one aggregation for a recipient and prints the new jobs, best first.

mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use apify_client::ApifyClient;
use clap::{Parser, Subcommand};
use job_aggregator::{
    Aggregator, ApifyFetcher, JobSummary, LinkedInFetcher, RecipientId, RunReport,
    SearchRequest, SqliteSeenStore, TimeWindow,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Parser)]
#[command(name = "jobsprint")]
#[command(about = "Fresh job postings from several boards, deduplicated per recipient")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every configured board and print jobs not seen before
    Search {
        /// Keyword entry; repeat for OR. Quote a phrase for an exact match
        #[arg(long = "keyword", short = 'k')]
        keywords: Vec<String>,

        /// Exclude jobs matching this entry; repeatable
        #[arg(long = "exclude", short = 'x')]
        exclude: Vec<String>,

        /// Acceptable location; repeatable
        #[arg(long = "location", short = 'l')]
        locations: Vec<String>,

        /// Maximum posting age, e.g. r3600 or last_1_hour
        #[arg(long, default_value = "r3600")]
        window: String,

        /// Result cap per board
        #[arg(long, default_value_t = 25)]
        limit: usize,

        /// Board to query; repeatable. Defaults to linkedin
        #[arg(long = "source", short = 's')]
        sources: Vec<String>,

        /// Whose seen-set to dedupe against
        #[arg(long, default_value = "default")]
        recipient: String,

        #[arg(long)]
        min_salary: Option<u64>,

        #[arg(long)]
        max_salary: Option<u64>,

        /// Drop jobs scoring below this (0-100)
        #[arg(long)]
        min_quality: Option<u8>,

        /// on_site, remote or hybrid
        #[arg(long)]
        work_type: Option<String>,

        /// Keep titles that look like scams (mlm, pyramid, ...)
        #[arg(long)]
        allow_suspicious: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop seen entries older than the retention horizon
    Prune {
        #[arg(long, default_value = "default")]
        recipient: String,
    },

    /// List named time windows and their codes
    Windows,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_aggregator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search {
            keywords,
            exclude,
            locations,
            window,
            limit,
            sources,
            recipient,
            min_salary,
            max_salary,
            min_quality,
            work_type,
            allow_suspicious,
            json,
        } => {
            let request = SearchRequest {
                keywords,
                exclude_keywords: exclude,
                locations,
                time_window: window,
                result_cap: limit,
                sources: if sources.is_empty() {
                    vec!["linkedin".to_string()]
                } else {
                    sources
                },
                min_salary,
                max_salary,
                min_quality_score: min_quality,
                work_type,
                blocked_title_terms: allow_suspicious.then(Vec::new),
            };
            cmd_search(request, &recipient, json).await
        }
        Commands::Prune { recipient } => cmd_prune(&recipient).await,
        Commands::Windows => {
            cmd_windows();
            Ok(())
        }
    }
}

async fn build_aggregator(config: &Config) -> Result<Aggregator> {
    let store = SqliteSeenStore::new(&config.database_url)
        .await
        .context("Failed to open seen-set database")?;

    let linkedin = LinkedInFetcher::new()
        .context("Failed to build LinkedIn fetcher")?
        .with_requests_per_minute(config.linkedin_requests_per_minute);

    let mut aggregator = Aggregator::new(Arc::new(store))
        .with_config(config.pipeline())
        .with_fetcher(Arc::new(linkedin));

    match &config.apify_token {
        Some(token) => {
            let client = Arc::new(ApifyClient::new(token.clone()));
            aggregator = aggregator.with_fetcher(Arc::new(ApifyFetcher::indeed(client)));
        }
        None => tracing::debug!("APIFY_TOKEN not set; Indeed disabled"),
    }

    Ok(aggregator)
}

async fn cmd_search(request: SearchRequest, recipient: &str, as_json: bool) -> Result<()> {
    let criteria = request
        .into_criteria()
        .context("Invalid search criteria")?;
    let config = Config::from_env().context("Failed to load configuration")?;
    let aggregator = build_aggregator(&config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling run");
            on_interrupt.cancel();
        }
    });

    let report = aggregator
        .run_for(&RecipientId::new(recipient), &criteria, &cancel)
        .await
        .context("Aggregation run failed")?;

    if as_json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn cmd_prune(recipient: &str) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let aggregator = build_aggregator(&config).await?;

    let removed = aggregator
        .prune(&RecipientId::new(recipient), chrono::Utc::now())
        .await
        .context("Failed to prune seen-set")?;

    println!(
        "Pruned {} entries older than {} days",
        removed,
        config.seen_retention_days
    );
    Ok(())
}

fn cmd_windows() {
    for (name, seconds) in TimeWindow::NAMED {
        println!("{:<18} r{}", name, seconds);
    }
}

fn print_json(report: &RunReport) -> Result<()> {
    let body = json!({
        "run_id": report.run_id,
        "count": report.jobs.len(),
        "jobs": report.summaries(),
        "failed_sources": report.failed_sources,
        "stats": report.stats,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&body).context("Failed to serialize report")?
    );
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("{} new jobs", report.jobs.len());
    for (i, job) in report.summaries().iter().enumerate() {
        print_summary(i + 1, job);
    }

    for failure in &report.failed_sources {
        println!("! {} unavailable: {}", failure.source, failure.reason);
    }
}

fn print_summary(rank: usize, job: &JobSummary) {
    println!();
    println!("{:>3}. [{:5.1}] {}", rank, job.quality_score, job.title);
    println!("     {} - {}", job.company, job.location);
    println!(
        "     {} via {}",
        job.posted_at.format("%Y-%m-%d %H:%M UTC"),
        job.source
    );
    println!("     {}", job.url);
}
