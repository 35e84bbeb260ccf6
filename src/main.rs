use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use helpdesk_gateway::api::ApiServerBuilder;
use helpdesk_gateway::db::{self, AnalyticsRepo, KnowledgeRepo};
use helpdesk_gateway::ingest::{self, SiteScraper};
use helpdesk_gateway::{Config, DbPool, Pipeline};

/// Helpdesk - retrieval-grounded support assistant
#[derive(Parser)]
#[command(name = "helpdesk", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Answer a single message and print the reply
    Ask {
        /// Message to answer
        message: String,
        /// Print the resolution and backend attempts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import spreadsheet rows from an Excel workbook or a JSON export
    Import {
        /// Path to an .xlsx/.xls workbook or a JSON array of {Category, Question, Answer} rows
        file: PathBuf,
    },
    /// Scrape the company website into the knowledge base
    Scrape {
        /// Site root URL
        url: String,
    },
    /// Show the most asked questions
    Analytics {
        /// Number of questions to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,helpdesk_gateway=info",
        1 => "info,helpdesk_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        local = ?config.pipeline.local,
        hosted = ?config.pipeline.hosted,
        "loaded configuration"
    );

    let pool = db::init(config.db_path())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::Ask { message, json } => ask(&config, pool, &message, json).await,
        Command::Import { file } => import(pool, &file),
        Command::Scrape { url } => scrape(pool, &url).await,
        Command::Analytics { limit } => analytics(pool, limit),
    }
}

fn build_pipeline(config: &Config, pool: DbPool) -> Arc<Pipeline> {
    let store = Arc::new(KnowledgeRepo::new(pool));
    Arc::new(Pipeline::from_config(store, &config.pipeline))
}

async fn serve(config: Config, pool: DbPool) -> anyhow::Result<()> {
    let entries = KnowledgeRepo::new(pool.clone()).count()?;
    if entries == 0 {
        tracing::warn!("knowledge base is empty; run `helpdesk import` or `helpdesk scrape` first");
    }

    tracing::info!(
        port = config.api_server.port,
        entries,
        data_dir = %config.data_dir.display(),
        "starting helpdesk gateway"
    );

    let pipeline = build_pipeline(&config, pool.clone());
    let server = ApiServerBuilder::new(pool, pipeline, config.api_server.port)
        .api_key(config.api_server.api_key)
        .static_dir(config.api_server.static_dir)
        .rate_limit(config.api_server.rate_limit_per_minute)
        .build();

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }

    Ok(())
}

async fn ask(config: &Config, pool: DbPool, message: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, pool);
    let reply = pipeline.respond_detailed(message).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.text);
    }
    Ok(())
}

fn import(pool: DbPool, file: &Path) -> anyhow::Result<()> {
    let rows = ingest::read_rows_file(file)
        .map_err(|e| anyhow::anyhow!("failed to import {}: {e}", file.display()))?;
    let count = ingest::import_rows(&KnowledgeRepo::new(pool), &rows)?;

    println!("Imported {count} knowledge items from {}", file.display());
    Ok(())
}

async fn scrape(pool: DbPool, url: &str) -> anyhow::Result<()> {
    let pages = SiteScraper::new()?.scrape_site(url).await?;
    let chunks = ingest::save_pages(&KnowledgeRepo::new(pool), &pages)?;

    println!("Scraped {} pages into {chunks} knowledge items", pages.len());
    Ok(())
}

fn analytics(pool: DbPool, limit: usize) -> anyhow::Result<()> {
    let repo = AnalyticsRepo::new(pool);
    let stats = repo.stats()?;

    println!(
        "{} questions asked ({} unique)",
        stats.total_questions, stats.unique_questions
    );
    for (rank, question) in repo.top_questions(limit)?.iter().enumerate() {
        println!("{:>3}. [{}] {}", rank + 1, question.count, question.question);
    }
    Ok(())
}
