//! Crawl loop: dequeues, fetches, extracts links, walks children through
//! the admission filter, and enqueues the survivors. [`retrieve_tree`]
//! is the single public entry point of this crate.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::admission::{descend_redirect, download_child, RejectReason};
use crate::config::CrawlConfig;
use crate::extract::{extract_css, extract_html, ChildRecord};
use crate::fetch::{FetchOutcome, FetchStatus, Fetcher};
use crate::parsed_url::ParsedUrl;
use crate::queue::UrlQueue;
use crate::rejectlog::RejectLogWriter;
use crate::robots::RobotsChecker;
use crate::seen::SeenSet;
use crate::Error;

/// Terminal status of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    Ok,
    QuotaExceeded,
    FatalWriteError,
}

/// The bundle of external collaborators and cross-crawl state, owned by
/// the caller and outliving any one crawl.
pub struct CrawlContext<'a> {
    pub config: CrawlConfig,
    pub fetcher: &'a dyn Fetcher,
    pub robots: RobotsChecker,

    /// URL string to local file already on disk.
    pub dl_url_file_map: HashMap<String, PathBuf>,
    pub downloaded_html_set: HashSet<String>,
    pub downloaded_css_set: HashSet<String>,

    /// Visited-URL side-effect sink, invoked in spider mode.
    pub on_visited: Option<Box<dyn FnMut(&str, Option<&str>) + 'a>>,
    /// Delete-file side-effect sink, invoked after unlink.
    pub on_delete: Option<Box<dyn FnMut(&Path) + 'a>>,

    bytes_downloaded: u64,
}

impl<'a> CrawlContext<'a> {
    pub fn new(config: CrawlConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            config,
            fetcher,
            robots: RobotsChecker::new(reqwest::Client::new()),
            dl_url_file_map: HashMap::new(),
            downloaded_html_set: HashSet::new(),
            downloaded_css_set: HashSet::new(),
            on_visited: None,
            on_delete: None,
            bytes_downloaded: 0,
        }
    }

    #[cfg(test)]
    pub fn new_offline(config: CrawlConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self {
            config,
            fetcher,
            robots: RobotsChecker::offline(),
            dl_url_file_map: HashMap::new(),
            downloaded_html_set: HashSet::new(),
            downloaded_css_set: HashSet::new(),
            on_visited: None,
            on_delete: None,
            bytes_downloaded: 0,
        }
    }

    fn quota_exceeded(&self) -> bool {
        self.config.quota.is_some_and(|q| self.bytes_downloaded > q)
    }
}

/// Recursive BFS retrieval starting from `start_url`, governed by
/// `ctx.config`.
pub async fn retrieve_tree(start_url: &str, ctx: &mut CrawlContext<'_>) -> Result<CrawlStatus, Error> {
    let start = ParsedUrl::parse(start_url)?;

    let mut queue = UrlQueue::new();
    let mut seen = SeenSet::new();
    let mut log = match &ctx.config.rejected_log {
        Some(path) => RejectLogWriter::open(Some(path)),
        None => RejectLogWriter::silent(),
    };

    queue.enqueue(start.clone(), None, 0, true, false);
    seen.add(start.url());

    let mut fatal_write = false;
    let status;

    loop {
        if ctx.quota_exceeded() {
            status = CrawlStatus::QuotaExceeded;
            break;
        }
        if fatal_write {
            status = CrawlStatus::FatalWriteError;
            break;
        }
        let Some(item) = queue.dequeue() else {
            status = CrawlStatus::Ok;
            break;
        };

        info!(url = item.url.url(), depth = item.depth, "dequeued");

        let (outcome, reused) = fetch_or_reuse(ctx, &item.url).await;

        if outcome.status == FetchStatus::FatalWrite {
            fatal_write = true;
        }

        let mut descend = eligible_to_descend(ctx, &item.url, &item.html_allowed, &item.css_allowed, &outcome, reused);

        if let Some(target) = &outcome.redirected_to {
            if descend {
                let reason = descend_redirect(target, &item.url, &start, item.depth, &mut seen, &mut ctx.robots, &ctx.config).await;
                if reason.is_success() {
                    seen.add(item.url.url());
                } else {
                    debug!(url = target, reason = reason.log_token(), "redirect rejected");
                    log.log(reason, &ParsedUrl::parse(target).unwrap_or_else(|_| item.url.clone()), &item.url);
                    descend = false;
                }
            }
        }

        let mut dash_p_leaf_html = false;
        if descend && !ctx.config.is_infinite_recursion() && item.depth >= ctx.config.reclevel {
            if ctx.config.page_requisites && (item.depth == ctx.config.reclevel || item.depth == ctx.config.reclevel + 1) {
                dash_p_leaf_html = true;
            } else {
                descend = false;
            }
        }

        if descend {
            if let Some(local_file) = &outcome.local_file {
                extract_and_enqueue(
                    ctx,
                    &mut queue,
                    &mut seen,
                    &mut log,
                    &start,
                    &item.url,
                    item.depth,
                    local_file,
                    outcome.is_html || item.html_allowed,
                    outcome.is_css || item.css_allowed,
                    dash_p_leaf_html,
                )
                .await;
            }
        }

        cleanup_local_file(ctx, &outcome);

        if let Some(n) = outcome.content_length {
            ctx.bytes_downloaded += n;
        }
    }

    log.close();
    queue.drain();

    Ok(status)
}

async fn fetch_or_reuse(ctx: &mut CrawlContext<'_>, url: &ParsedUrl) -> (FetchOutcome, bool) {
    if let Some(path) = ctx.dl_url_file_map.get(url.url()) {
        (
            FetchOutcome {
                local_file: Some(path.clone()),
                status: FetchStatus::Ok,
                is_html: ctx.downloaded_html_set.contains(url.url()),
                is_css: ctx.downloaded_css_set.contains(url.url()),
                redirected_to: None,
                content_length: None,
            },
            true,
        )
    } else {
        (ctx.fetcher.fetch(url.url(), None).await, false)
    }
}

fn eligible_to_descend(
    ctx: &CrawlContext<'_>,
    url: &ParsedUrl,
    html_allowed: &bool,
    css_allowed: &bool,
    outcome: &FetchOutcome,
    reused: bool,
) -> bool {
    if outcome.status != FetchStatus::Ok {
        return false;
    }
    if reused {
        return (ctx.downloaded_html_set.contains(url.url()) && *html_allowed) || (ctx.downloaded_css_set.contains(url.url()) && *css_allowed);
    }
    (*html_allowed && outcome.is_html) || outcome.is_css || *css_allowed
}

#[allow(clippy::too_many_arguments)]
async fn extract_and_enqueue(
    ctx: &mut CrawlContext<'_>,
    queue: &mut UrlQueue,
    seen: &mut SeenSet,
    log: &mut RejectLogWriter,
    start: &ParsedUrl,
    parent: &ParsedUrl,
    depth: u32,
    local_file: &Path,
    as_html: bool,
    as_css: bool,
    dash_p_leaf_html: bool,
) {
    let children: Vec<ChildRecord> = if as_html {
        match extract_html(local_file, parent, ctx.config.page_requisites) {
            Ok((children, meta_nofollow)) => {
                if meta_nofollow && ctx.config.use_robots {
                    Vec::new()
                } else {
                    children
                }
            }
            Err(e) => {
                warn!(error = %e, "html extraction failed");
                Vec::new()
            }
        }
    } else if as_css {
        extract_css(local_file, parent).unwrap_or_else(|e| {
            warn!(error = %e, "css extraction failed");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let referer = parent.without_credentials();

    for child in children {
        if child.ignore_when_downloading {
            continue;
        }
        if dash_p_leaf_html && !child.link_inline_p {
            continue;
        }

        let reason = download_child(
            &child,
            parent,
            depth,
            start,
            seen,
            &mut ctx.robots,
            &ctx.config,
            ctx.on_visited.as_deref_mut(),
        )
        .await;

        if reason.is_success() {
            seen.add(child.url.url());
            queue.enqueue(child.url, Some(referer.clone()), depth + 1, child.link_expect_html, child.link_expect_css);
        } else {
            debug!(url = child.url.url(), reason = reason.log_token(), "rejected");
            log.log(reason, &child.url, parent);
        }
    }
}

fn cleanup_local_file(ctx: &mut CrawlContext<'_>, outcome: &FetchOutcome) {
    let Some(path) = &outcome.local_file else {
        return;
    };
    if !path.exists() {
        return;
    }
    let acceptable = ctx.config.acceptable(path.file_name().and_then(|n| n.to_str()).unwrap_or(""));
    if ctx.config.delete_after || ctx.config.spider || !acceptable {
        if std::fs::remove_file(path).is_ok() {
            if let Some(cb) = ctx.on_delete.as_mut() {
                cb(path);
            }
        } else {
            warn!(path = %path.display(), "failed to unlink file during cleanup");
        }
    }
}
