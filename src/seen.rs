//! Seen-set: membership/insertion on the percent-decoded URL string, so
//! two encodings of the same URL collapse to one entry.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;

#[derive(Debug, Default)]
pub struct SeenSet {
    seen: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(url: &str) -> String {
        percent_decode_str(url).decode_utf8_lossy().into_owned()
    }

    pub fn add(&mut self, url: &str) {
        self.seen.insert(Self::decode(url));
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(&Self::decode(url))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decoded_forms_collapse() {
        let mut s = SeenSet::new();
        s.add("http://h/x%2F");
        assert!(s.contains("http://h/x/"));
    }

    #[test]
    fn distinct_urls_do_not_collide() {
        let mut s = SeenSet::new();
        s.add("http://h/a");
        assert!(!s.contains("http://h/b"));
    }
}
