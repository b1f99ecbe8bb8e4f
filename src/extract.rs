//! HTML/CSS link extractors, built on `scraper` for HTML plus a
//! `regex`-based CSS `url()`/`@import` scanner.

use std::path::Path;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::Error;
use crate::parsed_url::ParsedUrl;

/// A candidate child URL extracted from a downloaded page.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub url: ParsedUrl,
    pub link_relative_p: bool,
    pub link_inline_p: bool,
    pub link_expect_html: bool,
    pub link_expect_css: bool,
    pub ignore_when_downloading: bool,
}

fn is_relative(href: &str) -> bool {
    !href.contains("://") && !href.starts_with("//")
}

fn push_child(out: &mut Vec<ChildRecord>, base: &ParsedUrl, href: &str, inline: bool, expect_html: bool, expect_css: bool) {
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("data:") || href.starts_with("mailto:") {
        return;
    }
    if let Ok(url) = base.join(href) {
        out.push(ChildRecord {
            url,
            link_relative_p: is_relative(href),
            link_inline_p: inline,
            link_expect_html: expect_html,
            link_expect_css: expect_css,
            ignore_when_downloading: false,
        });
    }
}

/// Extracts child links from an HTML document, honoring page-requisite
/// tags when `page_requisites` is set. Returns the children plus whether
/// a `<meta name=robots content=nofollow>` directive was present.
pub fn extract_html(path: &Path, base: &ParsedUrl, page_requisites: bool) -> Result<(Vec<ChildRecord>, bool), Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Extract {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(extract_html_str(&content, base, page_requisites))
}

pub fn extract_html_str(content: &str, base: &ParsedUrl, page_requisites: bool) -> (Vec<ChildRecord>, bool) {
    let document = Html::parse_document(content);
    let meta_nofollow = has_meta_robots_nofollow(&document);

    let mut children = Vec::new();

    if let Ok(sel) = Selector::parse("a[href]") {
        for el in document.select(&sel) {
            if let Some(href) = el.value().attr("href") {
                push_child(&mut children, base, href, false, true, false);
            }
        }
    }

    if page_requisites {
        if let Ok(sel) = Selector::parse("img[src]") {
            for el in document.select(&sel) {
                if let Some(src) = el.value().attr("src") {
                    push_child(&mut children, base, src, true, false, false);
                }
            }
        }
        if let Ok(sel) = Selector::parse("link[rel=stylesheet][href]") {
            for el in document.select(&sel) {
                if let Some(href) = el.value().attr("href") {
                    push_child(&mut children, base, href, true, false, true);
                }
            }
        }
        if let Ok(sel) = Selector::parse("script[src]") {
            for el in document.select(&sel) {
                if let Some(src) = el.value().attr("src") {
                    push_child(&mut children, base, src, true, false, false);
                }
            }
        }
    }

    (children, meta_nofollow)
}

fn has_meta_robots_nofollow(document: &Html) -> bool {
    let Ok(sel) = Selector::parse("meta[name]") else {
        return false;
    };
    for el in document.select(&sel) {
        let Some(name) = el.value().attr("name") else {
            continue;
        };
        if !name.eq_ignore_ascii_case("robots") {
            continue;
        }
        if let Some(content) = el.value().attr("content") {
            if content.split(',').any(|d| d.trim().eq_ignore_ascii_case("nofollow")) {
                return true;
            }
        }
    }
    false
}

/// Extracts `url(...)`/`@import` references from a CSS file.
pub fn extract_css(path: &Path, base: &ParsedUrl) -> Result<Vec<ChildRecord>, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Extract {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(extract_css_str(&content, base))
}

pub fn extract_css_str(content: &str, base: &ParsedUrl) -> Vec<ChildRecord> {
    // Matches url(foo), url('foo'), url("foo") and @import "foo"/'foo'.
    let url_re = Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("static regex");
    let import_re = Regex::new(r#"@import\s+['"]([^'"]+)['"]"#).expect("static regex");

    let mut children = Vec::new();
    for caps in url_re.captures_iter(content) {
        push_child(&mut children, base, &caps[1], true, false, true);
    }
    for caps in import_re.captures_iter(content) {
        push_child(&mut children, base, &caps[1], true, false, true);
    }
    children
}
