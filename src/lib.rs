//! # bmnews-fulltext
//!
//! Full-text retrieval and normalization for biomedical articles.
//!
//! Structured JATS XML is the preferred source; when it is unavailable the
//! service falls back through open-access PDF lookup, the DOI resolver,
//! and finally the PubMed article page.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Immutable value types for parsed articles and fetch results
//! - [`jats`]: Streaming JATS XML parser and HTML renderer
//! - [`fulltext`]: Ranked-fallback retrieval service over external sources
//! - [`cache`]: Validated binary cache for downloaded PDFs
//! - [`config`]: Configuration management
//! - [`utils`]: HTTP client and retry utilities
//!
//! ## Example
//!
//! ```rust,no_run
//! use bmnews_fulltext::{Config, FullTextResult, FullTextService};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FullTextService::new(Config::default())?;
//! match service.fetch(Some("PMC123"), Some("10.1/x"), None).await? {
//!     FullTextResult::StructuredText { html } => println!("{}", html),
//!     other => println!("link: {:?}", other.url()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod fulltext;
pub mod jats;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use cache::PdfCache;
pub use config::Config;
pub use fulltext::{FetchError, FullTextService};
pub use jats::{JatsParser, ParseError};
pub use models::{Article, FullTextResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
