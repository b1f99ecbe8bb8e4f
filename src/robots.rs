//! Robots-exclusion cache/matcher: fetches and memoizes `robots.txt` per
//! `(host, port)`, matched via `robotstxt::DefaultMatcher`.

use std::collections::HashMap;

use robotstxt::DefaultMatcher;

use crate::parsed_url::SchemeClass;

const USER_AGENT: &str = "retrieve_tree";

#[derive(Debug, Clone)]
enum RobotsSpec {
    /// The fetched body, matched on demand.
    Fetched(String),
    /// Installed after a failed fetch so retries are suppressed.
    Dummy,
}

/// Per-crawl robots cache. Guarantees at most one fetch per `(host, port)`.
#[derive(Debug, Default)]
pub struct RobotsChecker {
    client: Option<reqwest::Client>,
    cache: HashMap<(String, u16), RobotsSpec>,
}

impl RobotsChecker {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client: Some(client),
            cache: HashMap::new(),
        }
    }

    /// Test-only constructor that never performs network I/O; any lookup
    /// for a host not pre-seeded via [`Self::seed`] is treated as an
    /// allow-all dummy spec.
    #[cfg(test)]
    pub fn offline() -> Self {
        Self {
            client: None,
            cache: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn seed(&mut self, host: &str, port: u16, body: &str) {
        self.cache
            .insert((host.to_string(), port), RobotsSpec::Fetched(body.to_string()));
    }

    pub fn was_fetched(&self, host: &str, port: u16) -> bool {
        self.cache.contains_key(&(host.to_string(), port))
    }

    /// Ensures a spec is cached for `(host, port)`, fetching it if
    /// necessary, then tests `path` against it.
    pub async fn is_allowed(&mut self, host: &str, port: u16, scheme: SchemeClass, path: &str) -> bool {
        let key = (host.to_string(), port);
        if !self.cache.contains_key(&key) {
            let spec = self.fetch(host, port, scheme).await;
            self.cache.insert(key.clone(), spec);
        }
        match self.cache.get(&key).expect("just inserted") {
            RobotsSpec::Dummy => true,
            RobotsSpec::Fetched(body) => {
                DefaultMatcher::default().one_agent_allowed_by_robots(body, USER_AGENT, &robots_test_url(host, port, scheme, path))
            }
        }
    }

    async fn fetch(&self, host: &str, port: u16, scheme: SchemeClass) -> RobotsSpec {
        let Some(client) = &self.client else {
            return RobotsSpec::Dummy;
        };
        let scheme_str = match scheme {
            SchemeClass::Https | SchemeClass::Ftps => "https",
            _ => "http",
        };
        let url = format!("{scheme_str}://{host}:{port}/robots.txt");
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => RobotsSpec::Fetched(body),
                Err(_) => RobotsSpec::Dummy,
            },
            _ => RobotsSpec::Dummy,
        }
    }
}

fn robots_test_url(host: &str, port: u16, scheme: SchemeClass, path: &str) -> String {
    let scheme_str = match scheme {
        SchemeClass::Https | SchemeClass::Ftps => "https",
        _ => "http",
    };
    format!("{scheme_str}://{host}:{port}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disallowed_path_is_rejected() {
        let mut r = RobotsChecker::offline();
        r.seed("h", 80, "User-agent: *\nDisallow: /private/\n");
        assert!(!r.is_allowed("h", 80, SchemeClass::Http, "/private/p").await);
        assert!(r.is_allowed("h", 80, SchemeClass::Http, "/public/p").await);
    }

    #[tokio::test]
    async fn unseeded_host_without_client_is_dummy_allow_all() {
        let mut r = RobotsChecker::offline();
        assert!(r.is_allowed("other", 80, SchemeClass::Http, "/anything").await);
        assert!(r.was_fetched("other", 80));
    }

    #[tokio::test]
    async fn fetch_happens_at_most_once_per_host_port() {
        let mut r = RobotsChecker::offline();
        r.seed("h", 80, "User-agent: *\nDisallow: /x\n");
        assert!(r.was_fetched("h", 80));
        let _ = r.is_allowed("h", 80, SchemeClass::Http, "/x").await;
        let _ = r.is_allowed("h", 80, SchemeClass::Http, "/y").await;
        // still exactly one cache entry for (h, 80)
        assert_eq!(r.cache.len(), 1);
    }
}
