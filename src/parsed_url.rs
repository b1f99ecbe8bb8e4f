//! Parsed-URL model: a thin wrapper over [`url::Url`] exposing the
//! scheme/host/port/path/directory/file/params/query/fragment/user
//! accessors the admission filter and rejection log need.

use std::fmt;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::Error;

/// Coarse scheme classification the admission filter reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeClass {
    Http,
    Https,
    Ftp,
    Ftps,
    Other,
}

impl SchemeClass {
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "http" => SchemeClass::Http,
            "https" => SchemeClass::Https,
            "ftp" => SchemeClass::Ftp,
            "ftps" => SchemeClass::Ftps,
            _ => SchemeClass::Other,
        }
    }

    /// True for schemes the admission filter treats as web-fetchable.
    pub fn is_http_like(self) -> bool {
        matches!(self, SchemeClass::Http | SchemeClass::Https)
    }

    pub fn is_ftp_like(self) -> bool {
        matches!(self, SchemeClass::Ftp | SchemeClass::Ftps)
    }

    /// Token used in the rejection log's scheme column.
    pub fn log_token(self) -> &'static str {
        match self {
            SchemeClass::Http => "SCHEME_HTTP",
            SchemeClass::Https => "SCHEME_HTTPS",
            SchemeClass::Ftp => "SCHEME_FTP",
            SchemeClass::Ftps => "SCHEME_FTPS",
            SchemeClass::Other => "SCHEME_INVALID",
        }
    }
}

/// A parsed URL, opaque to the crawl core beyond its scheme, host, port,
/// path, directory, file, params, query, fragment, user, and original
/// URL string.
#[derive(Debug, Clone)]
pub struct ParsedUrl {
    inner: Url,
}

impl ParsedUrl {
    pub fn parse(s: &str) -> Result<Self, Error> {
        let inner = Url::parse(s).map_err(|e| Error::UrlParse {
            url: s.to_string(),
            source: e,
        })?;
        Ok(ParsedUrl { inner })
    }

    pub fn join(&self, href: &str) -> Result<Self, Error> {
        let inner = self.inner.join(href).map_err(|e| Error::UrlParse {
            url: href.to_string(),
            source: e,
        })?;
        Ok(ParsedUrl { inner })
    }

    pub fn scheme_class(&self) -> SchemeClass {
        SchemeClass::from_scheme(self.inner.scheme())
    }

    pub fn host(&self) -> Option<&str> {
        self.inner.host_str()
    }

    /// Port, falling back to the scheme's well-known default.
    pub fn port_or_default(&self) -> u16 {
        self.inner.port_or_known_default().unwrap_or(match self.scheme_class() {
            SchemeClass::Https | SchemeClass::Ftps => 443,
            _ => 80,
        })
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    /// The directory component: the path with its final segment stripped,
    /// always ending in `/`.
    pub fn directory(&self) -> String {
        let path = self.inner.path();
        match path.rfind('/') {
            Some(pos) => path[..=pos].to_string(),
            None => "/".to_string(),
        }
    }

    /// The final path segment, empty for a directory-like URL.
    pub fn file(&self) -> &str {
        let path = self.inner.path();
        match path.rfind('/') {
            Some(pos) => &path[pos + 1..],
            None => path,
        }
    }

    pub fn params(&self) -> &str {
        // `url` folds rfc3986 "params" into the path; there is no
        // dedicated accessor, so an empty string is returned unless a
        // ';'-style matrix parameter is present in the last segment.
        self.file().rsplit_once(';').map(|(_, p)| p).unwrap_or("")
    }

    pub fn query(&self) -> &str {
        self.inner.query().unwrap_or("")
    }

    pub fn fragment(&self) -> &str {
        self.inner.fragment().unwrap_or("")
    }

    pub fn user(&self) -> Option<&str> {
        let u = self.inner.username();
        if u.is_empty() {
            None
        } else {
            Some(u)
        }
    }

    pub fn url(&self) -> &str {
        self.inner.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.inner
    }

    /// Returns the percent-decoded form of the URL string, used as the
    /// seen-set key.
    pub fn decoded(&self) -> String {
        percent_decode_str(self.inner.as_str())
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Same URL with any embedded credentials stripped, for use as a
    /// referer.
    pub fn without_credentials(&self) -> String {
        let mut u = self.inner.clone();
        let _ = u.set_username("");
        let _ = u.set_password(None);
        u.into()
    }

    /// Whether `self`'s directory is a prefix of `other`'s directory,
    /// the no-parent check.
    pub fn directory_is_prefix_of(&self, other: &ParsedUrl) -> bool {
        other.directory().starts_with(&self.directory())
    }

    pub fn same_host(&self, other: &ParsedUrl) -> bool {
        match (self.host(), other.host()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl PartialEq for ParsedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_and_file_split_on_last_slash() {
        let u = ParsedUrl::parse("http://h/a/b/c.html").unwrap();
        assert_eq!(u.directory(), "/a/b/");
        assert_eq!(u.file(), "c.html");
    }

    #[test]
    fn directory_like_url_has_empty_file() {
        let u = ParsedUrl::parse("http://h/a/b/").unwrap();
        assert_eq!(u.file(), "");
    }

    #[test]
    fn decoded_collapses_percent_escapes() {
        let a = ParsedUrl::parse("http://h/x%2F").unwrap();
        let b = ParsedUrl::parse("http://h/x/").unwrap();
        assert_eq!(a.decoded(), b.decoded());
    }

    #[test]
    fn directory_prefix_check() {
        let start = ParsedUrl::parse("http://h/a/").unwrap();
        let deeper = ParsedUrl::parse("http://h/a/b/c").unwrap();
        let sibling = ParsedUrl::parse("http://h/other/c").unwrap();
        assert!(start.directory_is_prefix_of(&deeper));
        assert!(!start.directory_is_prefix_of(&sibling));
    }

    #[test]
    fn scheme_class_is_http_like() {
        assert!(SchemeClass::Https.is_http_like());
        assert!(!SchemeClass::Ftp.is_http_like());
        assert!(SchemeClass::Ftp.is_ftp_like());
    }
}
