// main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use retrieve_tree::config::{CrawlConfig, INFINITE_RECURSION};
use retrieve_tree::crawl::{retrieve_tree, CrawlContext, CrawlStatus};
use retrieve_tree::fetch::HttpFetcher;

/// Recursive retrieval core for a web mirroring tool: BFS-crawls a site
/// from a seed URL under the given admission policies.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed URL to start crawling from.
    url: String,

    /// Maximum recursion depth (0 = only the seed, unset = use the default).
    #[arg(short = 'l', long)]
    level: Option<u32>,

    /// Recurse infinitely, ignoring --level.
    #[arg(long)]
    infinite: bool,

    /// Download page requisites (images, CSS, scripts) inlined by a page.
    #[arg(short = 'p', long)]
    page_requisites: bool,

    /// Only follow relative links.
    #[arg(long)]
    relative_only: bool,

    /// Only follow HTTPS links.
    #[arg(long)]
    https_only: bool,

    /// Follow FTP/FTPS links.
    #[arg(long)]
    follow_ftp: bool,

    /// Don't ascend to the parent directory of the seed URL.
    #[arg(long)]
    no_parent: bool,

    /// Follow links that leave the seed's host.
    #[arg(long)]
    span_hosts: bool,

    /// Ignore robots.txt.
    #[arg(long)]
    no_robots: bool,

    /// Spider mode: check links without keeping downloaded files.
    #[arg(long)]
    spider: bool,

    /// Delete each file immediately after its links are extracted.
    #[arg(long)]
    delete_after: bool,

    /// Directory include patterns (substring match against the URL path).
    #[arg(long = "include")]
    includes: Vec<String>,

    /// Directory exclude patterns.
    #[arg(long = "exclude")]
    excludes: Vec<String>,

    /// URL-accept regular expression.
    #[arg(long)]
    accept_regex: Option<String>,

    /// Accepted file suffixes (e.g. "html", "png"); non-matching leaf
    /// URLs are rejected unless exempted as non-leaf HTML.
    #[arg(long = "accept")]
    accept_suffixes: Vec<String>,

    /// Rejected file suffixes; checked after the accept list.
    #[arg(long = "reject")]
    reject_suffixes: Vec<String>,

    /// Accepted domains (exact host match).
    #[arg(long = "domain")]
    accept_domains: Vec<String>,

    /// Byte quota for the whole crawl.
    #[arg(long)]
    quota: Option<u64>,

    /// Path to write the tab-separated rejection log to.
    #[arg(long)]
    reject_log: Option<String>,

    /// Directory fetched files are written to.
    #[arg(long, default_value = "./downloaded")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    match run().await {
        Ok(CrawlStatus::Ok) => {
            println!("crawl finished");
        }
        Ok(CrawlStatus::QuotaExceeded) => {
            eprintln!("crawl stopped: quota exceeded");
            std::process::exit(3);
        }
        Ok(CrawlStatus::FatalWriteError) => {
            eprintln!("crawl stopped: fatal write error");
            std::process::exit(4);
        }
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<CrawlStatus> {
    let args = Args::parse();

    let accept_url = args
        .accept_regex
        .as_deref()
        .map(Regex::new)
        .transpose()
        .context("invalid --accept-regex")?;

    let config = CrawlConfig {
        reclevel: if args.infinite { INFINITE_RECURSION } else { args.level.unwrap_or(5) },
        page_requisites: args.page_requisites,
        relative_only: args.relative_only,
        https_only: args.https_only,
        follow_ftp: args.follow_ftp,
        no_parent: args.no_parent,
        spanhost: args.span_hosts,
        use_robots: !args.no_robots,
        spider: args.spider,
        delete_after: args.delete_after,
        includes: args.includes,
        excludes: args.excludes,
        accept_url,
        accept_suffixes: args.accept_suffixes,
        reject_suffixes: args.reject_suffixes,
        accept_domains: args.accept_domains,
        quota: args.quota,
        rejected_log: args.reject_log,
        ..CrawlConfig::default()
    };

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("could not create output directory {}", args.output_dir.display()))?;

    let fetcher = HttpFetcher::new(args.output_dir).context("could not build HTTP client")?;
    let mut ctx = CrawlContext::new(config, &fetcher);

    if ctx.config.spider {
        ctx.on_visited = Some(Box::new(|url: &str, referer: Option<&str>| match referer {
            Some(r) => println!("Visited: {url} (referer: {r})"),
            None => println!("Visited: {url}"),
        }));
    }

    let status = retrieve_tree(&args.url, &mut ctx)
        .await
        .with_context(|| format!("crawl of {} failed", args.url))?;
    Ok(status)
}
