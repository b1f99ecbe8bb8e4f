//! Closed error set for the retrieval core (SPEC_FULL §4.L / §7).
//!
//! Admission rejections are *not* errors — they are the structured
//! [`crate::admission::RejectReason`] outcome and never appear here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid url '{url}': {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("fetch failed for '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid accept-url pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("link extraction failed reading '{path}': {source}")]
    Extract {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not open rejection log at '{path}': {source}")]
    RejectLogOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write error while downloading '{url}'")]
    FatalWrite { url: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
