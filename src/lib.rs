//! Newsstand - a categorized news aggregator
//!
//! Periodically pulls articles from RSS and Atom feeds grouped by category,
//! normalizes them and stores each story once, keyed by its source URL.

pub mod aggregator;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod normalize;
pub mod registry;
pub mod routes;
pub mod throttle;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
