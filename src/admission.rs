//! Admission filter and redirect arbiter: the ordered, short-circuiting
//! rule chain that decides whether a child URL is followed.

use crate::config::CrawlConfig;
use crate::extract::ChildRecord;
use crate::parsed_url::ParsedUrl;
use crate::robots::RobotsChecker;
use crate::seen::SeenSet;

/// Closed outcome of the admission filter. The writer derives its
/// logging token straight from the variant, no stringly-typed reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Success,
    Blacklist,
    NotHttps,
    NonHttp,
    Absolute,
    Domain,
    Parent,
    List,
    Regex,
    Rules,
    SpannedHost,
    Robots,
}

impl RejectReason {
    pub fn log_token(self) -> &'static str {
        match self {
            RejectReason::Success => "SUCCESS",
            RejectReason::Blacklist => "BLACKLIST",
            RejectReason::NotHttps => "NOTHTTPS",
            RejectReason::NonHttp => "NONHTTP",
            RejectReason::Absolute => "ABSOLUTE",
            RejectReason::Domain => "DOMAIN",
            RejectReason::Parent => "PARENT",
            RejectReason::List => "LIST",
            RejectReason::Regex => "REGEX",
            RejectReason::Rules => "RULES",
            RejectReason::SpannedHost => "SPANNEDHOST",
            RejectReason::Robots => "ROBOTS",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, RejectReason::Success)
    }
}

/// Whether an HTML-suffixed child is exempt from the suffix
/// accept/reject rules because further descent may still be useful.
fn is_non_leaf_html(config: &CrawlConfig, depth: u32) -> bool {
    config.is_infinite_recursion()
        || (config.reclevel > 0 && depth < config.reclevel - 1)
        || config.page_requisites
}

/// Evaluates the eleven-rule admission chain against `child`, in order,
/// short-circuiting on the first rejection.
///
/// `parent` is the parsed URL of the page `child` was discovered on;
/// `parent_depth` is that page's BFS depth; `start_url` is the crawl's
/// seed URL, used for the no-parent and domain comparisons.
pub async fn download_child(
    child: &ChildRecord,
    parent: &ParsedUrl,
    parent_depth: u32,
    start_url: &ParsedUrl,
    seen: &mut SeenSet,
    robots: &mut RobotsChecker,
    config: &CrawlConfig,
    mut on_visited: Option<&mut dyn FnMut(&str, Option<&str>)>,
) -> RejectReason {
    let url = &child.url;

    // Rule 1: seen-set check. In spider mode, a rediscovery still counts
    // as a "visited" observation even though it's rejected here.
    if seen.contains(url.url()) {
        if config.spider {
            if let Some(cb) = on_visited.as_deref_mut() {
                cb(url.url(), Some(parent.url()));
            }
        }
        return RejectReason::Blacklist;
    }

    let scheme = url.scheme_class();

    // Rule 2: HTTPS-only.
    if config.https_only && !matches!(scheme, crate::parsed_url::SchemeClass::Https) {
        return RejectReason::NotHttps;
    }

    // Rule 3: scheme class.
    let scheme_ok = scheme.is_http_like() || (scheme.is_ftp_like() && config.follow_ftp);
    if !scheme_ok {
        return RejectReason::NonHttp;
    }

    // Rule 4: relative-only.
    if config.relative_only && scheme.is_http_like() && !child.link_relative_p {
        return RejectReason::Absolute;
    }

    // Rule 5: domain accept list.
    if let Some(host) = url.host() {
        if !config.domain_allowed(host) {
            return RejectReason::Domain;
        }
    } else if !config.accept_domains.is_empty() {
        return RejectReason::Domain;
    }

    // Rule 6: no-parent.
    if config.no_parent {
        let same_scheme_class = url.scheme_class().is_http_like() == start_url.scheme_class().is_http_like();
        let same_host = url.same_host(start_url);
        let same_scheme_or_port = url.scheme_class() == start_url.scheme_class() || url.port_or_default() == start_url.port_or_default();
        let inline_exempt = config.page_requisites && child.link_inline_p;
        if same_scheme_class
            && same_host
            && same_scheme_or_port
            && !inline_exempt
            && !start_url.directory_is_prefix_of(url)
        {
            return RejectReason::Parent;
        }
    }

    // Rule 7: directory include/exclude lists.
    if !config.directory_allowed(&url.directory()) {
        return RejectReason::List;
    }

    // Rule 8: URL accept regex.
    if let Some(re) = &config.accept_url {
        if !re.is_match(url.url()) {
            return RejectReason::Regex;
        }
    }

    // Rule 9: suffix accept/reject, skipped for directory-like URLs and
    // non-leaf HTML.
    let is_directory_like = url.file().is_empty();
    let is_html_like = url.file().to_ascii_lowercase().ends_with(".html") || url.file().to_ascii_lowercase().ends_with(".htm");
    let exempt_from_rules = is_directory_like || (is_html_like && is_non_leaf_html(config, parent_depth));
    if !exempt_from_rules && !config.acceptable(url.file()) {
        return RejectReason::Rules;
    }

    // Rule 10: span-host.
    if scheme == parent.scheme_class() && !config.spanhost {
        if let (Some(a), Some(b)) = (parent.host(), url.host()) {
            if !a.eq_ignore_ascii_case(b) {
                return RejectReason::SpannedHost;
            }
        }
    }

    // Rule 11: robots exclusion, with a seen-set side effect on disallow
    // so rediscoveries short-circuit on rule 1.
    if config.use_robots && scheme.is_http_like() {
        if let Some(host) = url.host() {
            let allowed = robots.is_allowed(host, url.port_or_default(), scheme, url.path()).await;
            if !allowed {
                seen.add(url.url());
                return RejectReason::Robots;
            }
        }
    }

    RejectReason::Success
}

/// Redirect arbiter: re-runs the admission filter against the
/// post-redirect URL `redirect_target`, treating `LIST`/`REGEX` as an
/// overridden success because the destination was asserted by the
/// server, not discovered locally.
pub async fn descend_redirect(
    redirect_target: &str,
    original_url: &ParsedUrl,
    start_url: &ParsedUrl,
    parent_depth: u32,
    seen: &mut SeenSet,
    robots: &mut RobotsChecker,
    config: &CrawlConfig,
) -> RejectReason {
    let Ok(target) = ParsedUrl::parse(redirect_target) else {
        return RejectReason::NonHttp;
    };

    let synthetic = ChildRecord {
        url: target.clone(),
        link_relative_p: false,
        link_inline_p: false,
        link_expect_html: false,
        link_expect_css: false,
        ignore_when_downloading: false,
    };

    let reason = download_child(
        &synthetic,
        original_url,
        parent_depth,
        start_url,
        seen,
        robots,
        config,
        None,
    )
    .await;

    match reason {
        RejectReason::Success | RejectReason::List | RejectReason::Regex => {
            seen.add(target.url());
            RejectReason::Success
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::RobotsChecker;

    fn child(url: &str, inline: bool, relative: bool) -> ChildRecord {
        ChildRecord {
            url: ParsedUrl::parse(url).unwrap(),
            link_relative_p: relative,
            link_inline_p: inline,
            link_expect_html: false,
            link_expect_css: false,
            ignore_when_downloading: false,
        }
    }

    #[tokio::test]
    async fn blacklist_short_circuits_everything_else() {
        let mut seen = SeenSet::new();
        seen.add("http://h/a");
        let mut robots = RobotsChecker::offline();
        let config = CrawlConfig::default();
        let parent = ParsedUrl::parse("http://h/").unwrap();
        let reason = download_child(&child("http://h/a", false, true), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Blacklist);
    }

    #[tokio::test]
    async fn spider_mode_reports_blacklist_hit_as_visited() {
        let mut seen = SeenSet::new();
        seen.add("http://h/a");
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.spider = true;
        let parent = ParsedUrl::parse("http://h/").unwrap();
        let mut calls: Vec<(String, Option<String>)> = Vec::new();
        let mut hook = |url: &str, referer: Option<&str>| {
            calls.push((url.to_string(), referer.map(|s| s.to_string())));
        };
        let reason = download_child(
            &child("http://h/a", false, true),
            &parent,
            0,
            &parent,
            &mut seen,
            &mut robots,
            &config,
            Some(&mut hook),
        )
        .await;
        assert_eq!(reason, RejectReason::Blacklist);
        assert_eq!(calls, vec![("http://h/a".to_string(), Some("http://h/".to_string()))]);
    }

    #[tokio::test]
    async fn non_spider_mode_does_not_report_blacklist_hit_as_visited() {
        let mut seen = SeenSet::new();
        seen.add("http://h/a");
        let mut robots = RobotsChecker::offline();
        let config = CrawlConfig::default();
        let parent = ParsedUrl::parse("http://h/").unwrap();
        let mut called = false;
        let mut hook = |_: &str, _: Option<&str>| called = true;
        let reason = download_child(
            &child("http://h/a", false, true),
            &parent,
            0,
            &parent,
            &mut seen,
            &mut robots,
            &config,
            Some(&mut hook),
        )
        .await;
        assert_eq!(reason, RejectReason::Blacklist);
        assert!(!called);
    }

    #[tokio::test]
    async fn https_only_rejects_plain_http_child() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.https_only = true;
        let parent = ParsedUrl::parse("https://h/").unwrap();
        let reason = download_child(&child("http://h/a", false, true), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::NotHttps);
    }

    #[tokio::test]
    async fn ftp_rejected_unless_follow_ftp_set() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let config = CrawlConfig::default();
        let parent = ParsedUrl::parse("http://h/").unwrap();
        let reason = download_child(&child("ftp://h/a", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::NonHttp);

        let mut config2 = CrawlConfig::default();
        config2.follow_ftp = true;
        config2.use_robots = false;
        let reason2 = download_child(&child("ftp://h/a", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config2, None).await;
        assert_eq!(reason2, RejectReason::Success);
    }

    #[tokio::test]
    async fn relative_only_rejects_absolute_links() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.relative_only = true;
        config.use_robots = false;
        let parent = ParsedUrl::parse("http://h/a/").unwrap();
        let reason = download_child(&child("http://other/x", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Absolute);
    }

    #[tokio::test]
    async fn no_parent_rejects_sibling_accepts_descendant() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.no_parent = true;
        config.use_robots = false;
        let start = ParsedUrl::parse("http://h/a/").unwrap();

        let sibling = child("http://h/b/x", false, false);
        let reason = download_child(&sibling, &start, 0, &start, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Parent);

        let descendant = child("http://h/a/b/x", false, false);
        let reason2 = download_child(&descendant, &start, 0, &start, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason2, RejectReason::Success);
    }

    #[tokio::test]
    async fn spanned_host_rejected_when_spanhost_off() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.use_robots = false;
        let parent = ParsedUrl::parse("http://a.example/").unwrap();
        let start = parent.clone();
        let reason = download_child(&child("http://b.example/r", false, false), &parent, 0, &start, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::SpannedHost);
    }

    #[tokio::test]
    async fn robots_disallow_registers_seen_and_blacklists_next_lookup() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        robots.seed("h", 80, "User-agent: *\nDisallow: /private/\n");
        let config = CrawlConfig::default();
        let parent = ParsedUrl::parse("http://h/").unwrap();

        let reason = download_child(&child("http://h/private/p", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Robots);
        assert!(seen.contains("http://h/private/p"));

        let reason2 = download_child(&child("http://h/private/p", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason2, RejectReason::Blacklist);
    }

    #[tokio::test]
    async fn non_leaf_html_exempt_from_suffix_rules() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.use_robots = false;
        config.accept_suffixes = vec!["png".to_string()];
        config.reclevel = 5;
        let parent = ParsedUrl::parse("http://h/").unwrap();
        // depth 0 < reclevel - 1 (4): HTML is exempt from the suffix list.
        let reason = download_child(&child("http://h/page.html", false, false), &parent, 0, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Success);
    }

    #[tokio::test]
    async fn leaf_html_at_boundary_depth_subject_to_suffix_rules() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.use_robots = false;
        config.accept_suffixes = vec!["png".to_string()];
        config.reclevel = 2;
        let parent = ParsedUrl::parse("http://h/").unwrap();
        // depth 1 == reclevel - 1: no longer exempt, rejected by RULES.
        let reason = download_child(&child("http://h/page.html", false, false), &parent, 1, &parent, &mut seen, &mut robots, &config, None).await;
        assert_eq!(reason, RejectReason::Rules);
    }

    #[tokio::test]
    async fn redirect_list_rejection_is_overridden_to_success() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.use_robots = false;
        config.includes = vec!["/only/".to_string()];
        let start = ParsedUrl::parse("http://h/").unwrap();
        let original = ParsedUrl::parse("http://h/r").unwrap();

        let reason = descend_redirect("http://h/elsewhere", &original, &start, 0, &mut seen, &mut robots, &config).await;
        assert_eq!(reason, RejectReason::Success);
        assert!(seen.contains("http://h/elsewhere"));
    }

    #[tokio::test]
    async fn redirect_spannedhost_aborts_descent() {
        let mut seen = SeenSet::new();
        let mut robots = RobotsChecker::offline();
        let mut config = CrawlConfig::default();
        config.use_robots = false;
        let start = ParsedUrl::parse("http://a.example/").unwrap();
        let original = ParsedUrl::parse("http://a.example/r").unwrap();

        let reason = descend_redirect("http://b.example/r", &original, &start, 0, &mut seen, &mut robots, &config).await;
        assert_eq!(reason, RejectReason::SpannedHost);
        assert!(!seen.contains("http://b.example/r"));
    }
}
