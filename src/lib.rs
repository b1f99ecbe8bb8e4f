//! Recursive retrieval core: a BFS crawl controller that takes a seed URL
//! and a set of admission policies and turns them into an ordered crawl
//! of a web subtree.
//!
//! The crate is organized leaves-first, matching the dependency order of
//! the components it's built from: [`parsed_url`] and [`error`] at the
//! bottom, [`queue`]/[`seen`]/[`robots`]/[`fetch`]/[`extract`] as the
//! narrow collaborators, [`admission`]/[`rejectlog`] as the policy layer,
//! and [`crawl`] tying it all together behind the single [`crawl::retrieve_tree`]
//! entry point.

pub mod admission;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod parsed_url;
pub mod queue;
pub mod rejectlog;
pub mod robots;
pub mod seen;

pub use crawl::{retrieve_tree, CrawlContext, CrawlStatus};
pub use error::Error;
