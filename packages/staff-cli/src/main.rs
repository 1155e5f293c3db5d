//! CLI for extracting staff directories to CSV.
//!
//! Configuration comes from `STAFF_*` environment variables (a `.env` file is
//! loaded first) and is overridden by flags. The model key is read from
//! `OPENAI_API_KEY`, the Firecrawl key from `FIRECRAWL_API_KEY`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staff_extraction::ai::OpenAI;
use staff_extraction::export::{export_csv, DEFAULT_OUTPUT_DIR, DEFAULT_PREFIX};
use staff_extraction::renderers::{FirecrawlRenderer, HttpRenderer};
use staff_extraction::{BatchReport, CrawlerConfig, Diagnostic, Renderer, StaffCrawler, StaffRecord, TiePolicy};

#[derive(Parser)]
#[command(name = "staff")]
#[command(about = "Extract staff names, roles and emails from directory pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: CrawlOptions,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single page
    Extract { url: String },

    /// Extract a directory, following pagination
    Paginate { url: String },

    /// Extract several directories concurrently
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RendererKind {
    /// Plain HTTP, no JavaScript
    Http,
    /// Firecrawl API with JavaScript rendering
    Firecrawl,
}

#[derive(Args)]
struct CrawlOptions {
    /// Rendering backend
    #[arg(long, global = true, value_enum, default_value = "firecrawl")]
    renderer: RendererKind,

    /// Maximum pages per directory
    #[arg(long, global = true)]
    max_pages: Option<usize>,

    /// Milliseconds to wait for content to change after a click
    #[arg(long, global = true)]
    wait_timeout_ms: Option<u64>,

    /// Comma-separated next-control candidates
    #[arg(long, global = true)]
    next_selector: Option<String>,

    /// Region watched for change after a click
    #[arg(long, global = true)]
    content_selector: Option<String>,

    /// Model in vendor/model form
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Classifier tie rule (prefer-visible, prefer-embedded)
    #[arg(long, global = true)]
    tie_policy: Option<TiePolicy>,

    /// Try the model when an embedded page yields no pattern matches
    #[arg(long, global = true)]
    fallback: bool,

    /// Directories processed at once in batch mode
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Overall timeout per directory
    #[arg(long, global = true)]
    url_timeout_ms: Option<u64>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Debug logging for the extraction library
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output directory for the CSV file
    #[arg(short, long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// CSV file name prefix
    #[arg(long, global = true, default_value = DEFAULT_PREFIX)]
    prefix: String,
}

impl CrawlOptions {
    fn apply(&self, mut config: CrawlerConfig) -> CrawlerConfig {
        if let Some(max_pages) = self.max_pages {
            config.pagination.max_pages = max_pages;
        }
        if let Some(ms) = self.wait_timeout_ms {
            config.pagination.wait_timeout_ms = ms;
        }
        if let Some(selector) = &self.next_selector {
            config.pagination.next_button_selector = selector.clone();
        }
        if let Some(selector) = &self.content_selector {
            config.pagination.content_selector = selector.clone();
        }
        if let Some(provider) = &self.provider {
            config.provider = provider.clone();
        }
        if let Some(policy) = self.tie_policy {
            config.tie_policy = policy;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(ms) = self.url_timeout_ms {
            config.url_timeout_ms = Some(ms);
        }
        config.fallback_to_model |= self.fallback;
        config.headless &= !self.headed;
        config.verbose |= self.verbose;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = cli.options.apply(
        CrawlerConfig::from_env().context("Invalid STAFF_* environment configuration")?,
    );

    let filter = if config.verbose {
        "info,staff_extraction=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    match cli.options.renderer {
        RendererKind::Http => {
            let renderer = HttpRenderer::new().context("Failed to build HTTP client")?;
            run(renderer, config, &cli).await
        }
        RendererKind::Firecrawl => {
            let renderer = FirecrawlRenderer::from_env().context("Firecrawl renderer unavailable")?;
            run(renderer, config, &cli).await
        }
    }
}

async fn run<R: Renderer>(renderer: R, config: CrawlerConfig, cli: &Cli) -> Result<()> {
    let backend = OpenAI::from_env(&config.provider).context("Model backend unavailable")?;
    tracing::info!(
        renderer = renderer.name(),
        model = backend.model(),
        max_pages = config.pagination.max_pages,
        "Starting staff extraction"
    );
    let crawler = StaffCrawler::new(renderer, backend, config)?;

    let (records, preview, batch) = match &cli.command {
        Commands::Extract { url } => {
            println!("Extracting staff from: {}", url);
            println!("{}", "-".repeat(50));
            let report = crawler.extract(url).await;
            (report.records.clone(), 5, BatchReport { reports: vec![report] })
        }
        Commands::Paginate { url } => {
            println!("Extracting staff with pagination from: {}", url);
            println!("{}", "-".repeat(50));
            let report = crawler.extract_with_pagination(url).await;
            println!("Pages visited: {}", report.pages_visited);
            (report.records.clone(), 10, BatchReport { reports: vec![report] })
        }
        Commands::Batch { urls } => {
            println!("Extracting staff from {} directories", urls.len());
            println!("{}", "-".repeat(50));
            let batch = crawler.extract_many(urls).await;
            for report in &batch.reports {
                println!(
                    "  {}: {} records, {} pages",
                    report.url,
                    report.records.len(),
                    report.pages_visited
                );
            }
            (batch.records(), 10, batch)
        }
    };

    print_diagnostics(batch.diagnostics());

    if records.is_empty() {
        println!("No staff members found.");
        return Ok(());
    }

    println!("\nFound {} staff members.\n", records.len());
    let path = export_csv(&records, &cli.options.output, &cli.options.prefix)
        .context("Failed to write CSV")?;
    println!("Exported to: {}", path.display());

    print_preview(&records, preview);
    Ok(())
}

fn print_preview(records: &[StaffRecord], limit: usize) {
    println!("\nPreview (first {}):", limit.min(records.len()));
    println!("{}", "-".repeat(50));
    for record in records.iter().take(limit) {
        println!("  {}", record);
    }
    if records.len() > limit {
        println!("  ... and {} more", records.len() - limit);
    }
}

fn print_diagnostics<'a>(diagnostics: impl Iterator<Item = &'a Diagnostic>) {
    let diagnostics: Vec<_> = diagnostics.collect();
    if diagnostics.is_empty() {
        return;
    }
    println!("\n{} issue(s) during extraction:", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  {}", diagnostic);
    }
}
