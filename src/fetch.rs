//! Fetcher contract: the HTTP transport, abstracted as a trait so the
//! crawl loop can be driven by a network-free mock in tests.

use std::collections::HashMap;
use std::path::PathBuf;

use futures::future::BoxFuture;

use crate::parsed_url::SchemeClass;

/// Outcome of a single fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Local path the body was written to, if the fetch succeeded.
    pub local_file: Option<PathBuf>,
    pub status: FetchStatus,
    pub is_html: bool,
    pub is_css: bool,
    /// Final URL after any redirect chain.
    pub redirected_to: Option<String>,
    pub content_length: Option<u64>,
}

impl FetchOutcome {
    pub fn failed() -> Self {
        Self {
            local_file: None,
            status: FetchStatus::Error,
            is_html: false,
            is_css: false,
            redirected_to: None,
            content_length: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    NotFound,
    Error,
    /// Writing the fetched body to disk failed.
    FatalWrite,
}

/// Implemented by [`HttpFetcher`] (real network I/O) and `MockFetcher`
/// (tests).
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str, referer: Option<&'a str>) -> BoxFuture<'a, FetchOutcome>;
}

/// Redirect chains longer than this are treated as a transport failure.
const MAX_REDIRECTS: u32 = 10;

/// `reqwest`-backed fetcher. The client's own redirect following is
/// disabled (policy `none()`) so this fetcher can follow the chain by
/// hand and still report the final URL via `redirected_to`: the crawl
/// loop runs the admission filter against that URL (§4.D) even though
/// the body has already been retrieved, so a rejected redirect target
/// discards the fetched content instead of re-fetching it.
pub struct HttpFetcher {
    client: reqwest::Client,
    dest_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(dest_dir: PathBuf) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent("retrieve_tree")
            .build()?;
        Ok(Self { client, dest_dir })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str, referer: Option<&'a str>) -> BoxFuture<'a, FetchOutcome> {
        Box::pin(async move {
            let mut current = url.to_string();
            let mut current_referer = referer.map(|s| s.to_string());
            let mut redirected_to = None;

            for _ in 0..MAX_REDIRECTS {
                let scheme = url::Url::parse(&current).ok().map(|u| SchemeClass::from_scheme(u.scheme()));
                if !matches!(scheme, Some(SchemeClass::Http) | Some(SchemeClass::Https)) {
                    // FTP transport isn't implemented by this fetcher.
                    return FetchOutcome::failed();
                }

                let mut req = self.client.get(&current);
                if let Some(r) = &current_referer {
                    req = req.header(reqwest::header::REFERER, r.as_str());
                }

                let resp = match req.send().await {
                    Ok(r) => r,
                    Err(_) => return FetchOutcome::failed(),
                };

                if resp.status().is_redirection() {
                    let Some(location) = resp
                        .headers()
                        .get(reqwest::header::LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.to_string())
                    else {
                        return FetchOutcome::failed();
                    };
                    let Ok(base) = url::Url::parse(&current) else {
                        return FetchOutcome::failed();
                    };
                    let Ok(next) = base.join(&location) else {
                        return FetchOutcome::failed();
                    };
                    redirected_to = Some(next.to_string());
                    current_referer = Some(current);
                    current = next.to_string();
                    continue;
                }

                if !resp.status().is_success() {
                    return FetchOutcome {
                        local_file: None,
                        status: FetchStatus::NotFound,
                        is_html: false,
                        is_css: false,
                        redirected_to,
                        content_length: None,
                    };
                }

                let content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_ascii_lowercase();
                let is_html = content_type.contains("text/html") || content_type.contains("application/xhtml");
                let is_css = content_type.contains("text/css");

                let bytes = match resp.bytes().await {
                    Ok(b) => b,
                    Err(_) => return FetchOutcome::failed(),
                };

                let file_name = format!("{:x}.tmp", md5_like_hash(&current));
                let local_path = self.dest_dir.join(file_name);
                if let Some(parent) = local_path.parent() {
                    if tokio::fs::create_dir_all(parent).await.is_err() {
                        return FetchOutcome {
                            local_file: None,
                            status: FetchStatus::FatalWrite,
                            is_html,
                            is_css,
                            redirected_to,
                            content_length: Some(bytes.len() as u64),
                        };
                    }
                }
                if tokio::fs::write(&local_path, &bytes).await.is_err() {
                    return FetchOutcome {
                        local_file: None,
                        status: FetchStatus::FatalWrite,
                        is_html,
                        is_css,
                        redirected_to,
                        content_length: Some(bytes.len() as u64),
                    };
                }

                return FetchOutcome {
                    local_file: Some(local_path),
                    status: FetchStatus::Ok,
                    is_html,
                    is_css,
                    redirected_to,
                    content_length: Some(bytes.len() as u64),
                };
            }

            // Redirect chain too long: treated as a transport failure.
            FetchOutcome::failed()
        })
    }
}

/// Cheap non-cryptographic hash used only to build a unique temp-file
/// name; collisions would merely overwrite a stale download.
fn md5_like_hash(s: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut h = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut h);
    h.finish()
}

/// In-memory fetcher for tests: a fixed map from URL to canned outcome.
#[derive(Default)]
pub struct MockFetcher {
    pub responses: HashMap<String, FetchOutcome>,
    pub calls: std::sync::Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, outcome: FetchOutcome) -> Self {
        self.responses.insert(url.to_string(), outcome);
        self
    }
}

impl Fetcher for MockFetcher {
    fn fetch<'a>(&'a self, url: &'a str, _referer: Option<&'a str>) -> BoxFuture<'a, FetchOutcome> {
        self.calls.lock().unwrap().push(url.to_string());
        let outcome = self.responses.get(url).cloned().unwrap_or_else(FetchOutcome::failed);
        Box::pin(async move { outcome })
    }
}
