//! Rejection log writer: a tab-separated audit trail of rejected
//! children. Silent when configured with no sink; an open failure is a
//! diagnostic, never fatal.

use std::fs::File;
use std::io::{BufWriter, Write};

use tracing::warn;

use crate::admission::RejectReason;
use crate::parsed_url::ParsedUrl;

const HEADER: &str = "REASON\tU_URL\tU_SCHEME\tU_HOST\tU_PORT\tU_PATH\tU_PARAMS\tU_QUERY\tU_FRAGMENT\tP_URL\tP_SCHEME\tP_HOST\tP_PORT\tP_PATH\tP_PARAMS\tP_QUERY\tP_FRAGMENT";

pub struct RejectLogWriter {
    sink: Option<BufWriter<File>>,
}

impl RejectLogWriter {
    /// Opens `path` and writes the header. Header emission is skipped
    /// entirely when the open fails.
    pub fn open(path: Option<&str>) -> Self {
        let sink = path.and_then(|p| match File::create(p) {
            Ok(f) => {
                let mut w = BufWriter::new(f);
                if let Err(e) = writeln!(w, "{HEADER}") {
                    warn!(error = %e, path = p, "failed writing rejection log header");
                    return None;
                }
                Some(w)
            }
            Err(e) => {
                warn!(error = %e, path = p, "could not open rejection log, proceeding without one");
                None
            }
        });
        Self { sink }
    }

    /// A writer with no sink configured; all calls are no-ops.
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn log(&mut self, reason: RejectReason, child: &ParsedUrl, parent: &ParsedUrl) {
        let Some(w) = self.sink.as_mut() else {
            return;
        };
        let row = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            reason.log_token(),
            percent_encoding::utf8_percent_encode(child.url(), percent_encoding::NON_ALPHANUMERIC),
            child.scheme_class().log_token(),
            child.host().unwrap_or(""),
            child.port_or_default(),
            child.path(),
            child.params(),
            child.query(),
            child.fragment(),
            percent_encoding::utf8_percent_encode(parent.url(), percent_encoding::NON_ALPHANUMERIC),
            parent.scheme_class().log_token(),
            parent.host().unwrap_or(""),
            parent.port_or_default(),
            parent.path(),
            parent.params(),
            parent.query(),
            parent.fragment(),
        );
        if let Err(e) = writeln!(w, "{row}") {
            warn!(error = %e, "failed writing rejection log row");
        }
    }

    pub fn close(&mut self) {
        if let Some(w) = self.sink.as_mut() {
            let _ = w.flush();
        }
        self.sink = None;
    }
}
