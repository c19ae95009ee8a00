use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use log::{info, warn};

use jobsync::{
    browser_controller::BrowserController,
    config::{ReaderConfig, ScrapeConfig},
    page_query::QueryClient,
    reader::ReaderClient,
    scraper::{BrowserListingPage, ScrapeOptions, ScrapeSyncLoop},
    session,
    sink::AirtableSink,
    types::{ReadResult, ScrapeOutcome},
    utils::{sanitize_filename, truncate_chars},
    writer::ResultWriter,
};

const ERROR_EXCERPT_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(author, version, about = "Job listing scraper and web reader CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in if no session state exists, then scrape the paginated job
    /// listing and push each page's records to the table store
    Scrape {
        /// Safety bound on the number of listing pages visited
        #[arg(long, default_value_t = 50)]
        max_pages: usize,
        /// Run the browser headless
        #[arg(long, default_value_t = true)]
        headless: bool,
    },
    /// Read a single URL through the web reader and save JSONL + markdown
    Read {
        url: String,
        /// Output file override; the stem names both output files
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Read many URLs (one per line) into a single JSONL file
    ReadBulk {
        urls_file: PathBuf,
        #[arg(long, default_value = "pages.jsonl")]
        out: String,
    },
    /// Search the web and save the aggregated cleaned content
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        top_k: u32,
        #[arg(long, default_value = "serp.jsonl")]
        out: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Scrape {
            max_pages,
            headless,
        } => run_scrape(max_pages, headless).await,
        Command::Read { url, out } => run_read(&url, out).await,
        Command::ReadBulk { urls_file, out } => run_read_bulk(&urls_file, &out).await,
        Command::Search { query, top_k, out } => run_search(&query, top_k, &out).await,
    }
}

async fn run_scrape(max_pages: usize, headless: bool) -> Result<()> {
    let cfg = ScrapeConfig::from_env()?;
    let options = ScrapeOptions::default_builder()
        .max_pages(max_pages)
        .headless(headless)
        .build()?;

    let browser = BrowserController::new(options.browser_timeout, options.headless)?;
    let query = QueryClient::new(cfg.query_api_key.clone());

    if !cfg.session_file.exists() {
        info!("no session state found, logging in...");
        session::establish(&cfg, &browser, &query)
            .await
            .context("login flow failed")?;
    }

    let tab = browser.new_tab()?;
    browser
        .restore_session(&tab, &cfg.session_file)
        .context("could not restore the saved session")?;

    let page = BrowserListingPage::new(browser, tab, query);
    let sink = AirtableSink::new(&cfg.table);
    let listing_url = format!("{}/en/jobs", cfg.base_url);

    let outcome = ScrapeSyncLoop::new(page, sink, options.max_pages)
        .run(&listing_url)
        .await?;

    match outcome {
        ScrapeOutcome::Exhausted {
            pages_visited,
            records_pushed,
        } => info!(
            "listing exhausted after {} pages, {} records pushed",
            pages_visited, records_pushed
        ),
        ScrapeOutcome::SafetyLimitHit {
            pages_visited,
            records_pushed,
        } => warn!(
            "stopped at the {}-page safety bound with {} records pushed; rerun with a higher --max-pages to continue",
            pages_visited, records_pushed
        ),
    }
    Ok(())
}

async fn run_read(url: &str, out: Option<PathBuf>) -> Result<()> {
    let cfg = ReaderConfig::from_env()?;
    let client = ReaderClient::new(&cfg)?;
    let writer = ResultWriter::new(&cfg.output_dir)?;

    let result = client.read_url(url).await?;

    let base = match &out {
        Some(p) => p
            .file_stem()
            .and_then(|s| s.to_str())
            .map(String::from)
            .unwrap_or_else(|| sanitize_filename(url)),
        None => sanitize_filename(url),
    };

    writer.append_jsonl(&format!("{}.json", base), std::slice::from_ref(&result))?;
    if let Some(content) = &result.content {
        writer.write_markdown(&format!("{}.md", base), content)?;
    }

    report(&result, &base);
    Ok(())
}

async fn run_read_bulk(urls_file: &PathBuf, out: &str) -> Result<()> {
    let cfg = ReaderConfig::from_env()?;
    let client = ReaderClient::new(&cfg)?;
    let writer = ResultWriter::new(&cfg.output_dir)?;

    let raw = fs::read_to_string(urls_file)
        .context(format!("could not read urls file {:?}", urls_file))?;
    let urls = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect::<Vec<String>>();

    let results = client.read_bulk(&urls).await?;
    let path = writer.append_jsonl(out, &results)?;

    let ok = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - ok;
    println!(
        "{}, {}. output: {}",
        style(format!("{} ok", ok)).green(),
        style(format!("{} failed", failed)).yellow(),
        path.display()
    );
    Ok(())
}

async fn run_search(query: &str, top_k: u32, out: &str) -> Result<()> {
    let cfg = ReaderConfig::from_env()?;
    let client = ReaderClient::new(&cfg)?;
    let writer = ResultWriter::new(&cfg.output_dir)?;

    let result = client.search_and_read(query, top_k).await?;
    let path = writer.append_jsonl(out, std::slice::from_ref(&result))?;

    match &result.error {
        Some(error) => println!(
            "{}: {}",
            style(format!("error ({})", result.status)).red(),
            truncate_chars(error, ERROR_EXCERPT_CHARS)
        ),
        None => println!(
            "{} results for '{}' -> {}",
            style("saved").green(),
            query,
            path.display()
        ),
    }
    Ok(())
}

fn report(result: &ReadResult, target: &str) {
    match &result.error {
        Some(error) => println!(
            "{}: {}",
            style(format!("error ({})", result.status)).red(),
            truncate_chars(error, ERROR_EXCERPT_CHARS)
        ),
        None => println!("{} {} -> {}", style("saved").green(), result.url, target),
    }
}
