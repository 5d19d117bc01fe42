use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use gleaner_core::{DEFAULT_USER_AGENT, ExportFormat, PolicyLoadResult, ScrapeConfig, Scraper, save_items};
use owo_colors::OwoColorize;

mod echo;

use echo::{format_size, print_banner, print_detail, print_info, print_step, print_success, print_timing, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fetch a page, extract elements by CSS selector and save them as CSV or JSON
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(author = "Gleaner Contributors")]
#[command(version)]
#[command(about = "Fetch a page and extract elements by CSS selector", long_about = None)]
struct Args {
    /// Page to fetch; also the base for robots.txt and relative links
    #[arg(long, value_name = "URL")]
    url: String,

    /// CSS selector for the elements to extract
    #[arg(long, value_name = "SELECTOR")]
    selector: String,

    /// Attribute to extract (text content when omitted)
    #[arg(long, value_name = "NAME")]
    attr: Option<String>,

    /// Output file
    #[arg(long, default_value = "data/output.csv", value_name = "FILE")]
    out: PathBuf,

    /// Output format (csv, json)
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    format: ExportFormat,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "15", value_name = "SECS")]
    timeout: f64,

    /// User-Agent for HTTP requests and robots.txt matching
    #[arg(long, default_value = DEFAULT_USER_AGENT, value_name = "UA")]
    user_agent: String,

    /// Fail when a matched element has no value for the attribute
    #[arg(long)]
    strict: bool,

    /// Abort when robots.txt cannot be loaded
    #[arg(long, conflicts_with = "ignore_robots")]
    require_robots: bool,

    /// Do not load or apply robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Minimum seconds between requests
    #[arg(long, default_value = "0", value_name = "SECS")]
    delay: f64,

    /// Show progress and enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn scrape_config(&self) -> anyhow::Result<ScrapeConfig> {
        let timeout = Duration::try_from_secs_f64(self.timeout)
            .with_context(|| format!("Invalid timeout: {}", self.timeout))?;
        let delay =
            Duration::try_from_secs_f64(self.delay).with_context(|| format!("Invalid delay: {}", self.delay))?;

        Ok(ScrapeConfig::builder()
            .timeout(timeout)
            .user_agent(&self.user_agent)
            .min_delay(delay)
            .respect_robots(!self.ignore_robots)
            .require_robots(self.require_robots)
            .strict(self.strict)
            .build())
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked from `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,gleaner_core=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let config = args.scrape_config()?;
    tracing::debug!(?config, "scrape configuration");
    let started = Instant::now();

    if args.verbose {
        print_step(1, 4, &format!("Connecting to {}", args.url.bright_white().underline()));
    }

    let scraper = Scraper::connect(&args.url, config)
        .await
        .with_context(|| format!("Failed to open session for {}", args.url))?;

    if args.verbose {
        match scraper.fetcher().robots() {
            Some(PolicyLoadResult::Loaded(_)) => print_detail("robots.txt", "loaded"),
            Some(PolicyLoadResult::Unavailable(reason)) => {
                print_warning(&format!("robots.txt unavailable ({reason}); proceeding without it"))
            }
            None => print_detail("robots.txt", "ignored"),
        }
        print_timing("Connect", started.elapsed());
        eprintln!();
        print_step(2, 4, &format!("Extracting {}", args.selector.bright_white()));
    }

    let extract_started = Instant::now();
    let outcome = scraper
        .scrape(&args.selector, args.attr.as_deref())
        .await
        .with_context(|| format!("Failed to scrape {}", args.url))?;

    if outcome.skipped > 0 {
        print_warning(&format!("Skipped {} element(s) without a value", outcome.skipped));
    }

    if args.verbose {
        print_detail("Items", &outcome.items.len().to_string());
        print_timing("Fetch + extract", extract_started.elapsed());
        eprintln!();
        print_step(3, 4, &format!("Saving {} to {}", args.format, args.out.display()));
    }

    save_items(&outcome.items, &args.out, args.format)
        .with_context(|| format!("Failed to write to file: {}", args.out.display()))?;

    if args.verbose {
        if let Ok(meta) = std::fs::metadata(&args.out) {
            print_detail("Size", &format_size(meta.len()));
        }
        eprintln!();
        print_step(4, 4, "Summarizing");
    }

    let summary = serde_json::to_string_pretty(&outcome.summary()).context("Failed to serialize summary")?;
    println!("{summary}");

    print_success(&format!(
        "Saved {} item(s) to {}",
        outcome.items.len(),
        args.out.display().bright_white()
    ));

    Ok(())
}
