//! # finwire
//!
//! Collects financial news from Chinese and international sources,
//! merges it into one deduplicated, time-ordered collection and keeps an
//! analyzed result fresh in a shared cache.
//!
//! ## Architecture
//!
//! ```text
//! Collectors → Aggregator → Analyzer → Cache ← Scheduler
//! ```
//!
//! - [`collector`]: one collector per source (JSON APIs, RSS/Atom feeds,
//!   browser-rendered pages)
//! - [`aggregator`]: concurrent fan-out, dedup and ordering
//! - [`analyzer`]: turns an aggregation into an opaque JSON result
//! - [`cache`]: single-flight refresh, TTL reads, background scheduler
//!
//! ## Quick Start
//!
//! ```bash
//! # Show enabled sources
//! finwire sources
//!
//! # One collection cycle
//! finwire collect --limit 20
//!
//! # Full refresh written to a file
//! finwire refresh --output latest.json
//!
//! # Keep the result fresh every 30 minutes
//! finwire serve --interval 30m --warm-from latest.json
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the
/// aggregator, the analysis pipeline and the cache.
pub mod app;

/// Merging one cycle's output from every collector.
pub mod aggregator;

/// Analysis boundary and the built-in digest analyzer.
pub mod analyzer;

/// Cached refresh result with single-flight semantics.
pub mod cache;

/// Command-line interface using clap.
///
/// - `sources` - List enabled sources
/// - `collect [--limit N] [--json]` - Run one collection cycle
/// - `refresh [--output PATH]` - Collect, analyze and write the result
/// - `serve` - Refresh in the background until interrupted
pub mod cli;

/// News sources and the trait they share.
pub mod collector;

/// Configuration loaded from `~/.config/finwire/config.toml`.
pub mod config;

/// Long-running refresh mode with signal handling.
pub mod daemon;

/// Core domain models.
///
/// - [`NewsItem`](domain::NewsItem): one normalized news entry
/// - [`Collection`](domain::Collection): the merged output of a cycle
/// - [`NewsCategory`](domain::NewsCategory): keyword-based classification
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching a request
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// RSS 2.0 and Atom parsing into raw feed entries.
pub mod normalizer;

/// One refresh cycle: collect, analyze, publish.
pub mod pipeline;

/// Headless Chrome rendering for sources without an API.
///
/// - [`ChromeScraper`](scraper::ChromeScraper): shared browser, bounded pages
/// - [`ScraperConfig`](scraper::ScraperConfig): Configuration options
/// - [`Scraper`](scraper::Scraper): Async trait for rendering implementations
pub mod scraper;
