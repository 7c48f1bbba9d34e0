//! Ranked-fallback retrieval of full text from external sources.
//!
//! [`FullTextService::fetch`] walks a fixed tier order — structured JATS
//! XML, open-access PDF lookup, DOI resolver, PubMed page — and returns the
//! first tier that produces something. Individual tier failures are
//! absorbed and logged; only total exhaustion (or missing identifiers)
//! surfaces as an error.

mod service;

pub use service::FullTextService;

/// Errors that can occur while fetching full text
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// No PMC ID, DOI, or PMID was supplied. Checked before any I/O.
    #[error("no usable identifier (need a PMC ID, DOI, or PMID)")]
    NoIdentifiers,

    /// Network or HTTP error, including 5xx/429 after retries ran out
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be parsed (JSON, XML)
    #[error("parse error: {0}")]
    Parse(String),

    /// Every applicable tier came up empty
    #[error("no full-text source available: {0}")]
    TierUnavailable(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
