//! Crawl configuration: the options that shape a single crawl, as a
//! plain struct with a `Default` impl rather than a process-wide global.

use regex::Regex;

/// Sentinel `reclevel` meaning "no depth bound".
pub const INFINITE_RECURSION: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum recursion depth; [`INFINITE_RECURSION`] disables the bound.
    pub reclevel: u32,
    /// Download page requisites (images, CSS, scripts) up to two levels
    /// past `reclevel`.
    pub page_requisites: bool,
    pub relative_only: bool,
    pub https_only: bool,
    pub follow_ftp: bool,
    pub no_parent: bool,
    pub spanhost: bool,
    pub use_robots: bool,
    pub spider: bool,
    pub delete_after: bool,

    /// Directory include/exclude patterns.
    pub includes: Vec<String>,
    pub excludes: Vec<String>,

    /// URL-accept regex.
    pub accept_url: Option<Regex>,

    /// Suffix accept/reject lists consulted by `acceptable()`.
    pub accept_suffixes: Vec<String>,
    pub reject_suffixes: Vec<String>,

    /// Domain accept list. Empty means "accept all".
    pub accept_domains: Vec<String>,

    /// Byte quota; `None` disables the check.
    pub quota: Option<u64>,

    /// Rejection-log sink path; `None` means the writer is silent.
    pub rejected_log: Option<String>,

    /// Diagnostic-message locale; unused by the core beyond being
    /// threaded through to client code.
    pub locale: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            reclevel: 5,
            page_requisites: false,
            relative_only: false,
            https_only: false,
            follow_ftp: false,
            no_parent: false,
            spanhost: false,
            use_robots: true,
            spider: false,
            delete_after: false,
            includes: Vec::new(),
            excludes: Vec::new(),
            accept_url: None,
            accept_suffixes: Vec::new(),
            reject_suffixes: Vec::new(),
            accept_domains: Vec::new(),
            quota: None,
            rejected_log: None,
            locale: "C".to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn is_infinite_recursion(&self) -> bool {
        self.reclevel == INFINITE_RECURSION
    }

    /// Suffix acceptability test. A file with no extension is always
    /// acceptable; accept/reject
    /// lists are matched against the lowercase suffix.
    pub fn acceptable(&self, file_name: &str) -> bool {
        let suffix = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return self.accept_suffixes.is_empty(),
        };
        if !self.accept_suffixes.is_empty() && !self.accept_suffixes.iter().any(|s| s.eq_ignore_ascii_case(&suffix)) {
            return false;
        }
        if self.reject_suffixes.iter().any(|s| s.eq_ignore_ascii_case(&suffix)) {
            return false;
        }
        true
    }

    /// Directory include/exclude test.
    pub fn directory_allowed(&self, directory: &str) -> bool {
        if !self.includes.is_empty() && !self.includes.iter().any(|p| directory.contains(p.as_str())) {
            return false;
        }
        if self.excludes.iter().any(|p| directory.contains(p.as_str())) {
            return false;
        }
        true
    }

    /// Domain accept-list test.
    pub fn domain_allowed(&self, host: &str) -> bool {
        self.accept_domains.is_empty() || self.accept_domains.iter().any(|d| host.eq_ignore_ascii_case(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_everything() {
        let cfg = CrawlConfig::default();
        assert!(cfg.acceptable("a.html"));
        assert!(cfg.directory_allowed("/any/path/"));
        assert!(cfg.domain_allowed("example.com"));
    }

    #[test]
    fn suffix_reject_wins_over_empty_accept() {
        let mut cfg = CrawlConfig::default();
        cfg.reject_suffixes.push("exe".to_string());
        assert!(!cfg.acceptable("malware.exe"));
        assert!(cfg.acceptable("page.html"));
    }

    #[test]
    fn suffix_accept_list_is_exclusive() {
        let mut cfg = CrawlConfig::default();
        cfg.accept_suffixes.push("html".to_string());
        assert!(cfg.acceptable("index.html"));
        assert!(!cfg.acceptable("image.png"));
    }
}
