//! Outcome of a full-text lookup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a full-text fetch produced, one variant per retrieval tier.
///
/// Exactly one payload exists per result by construction. `CachedFile` is
/// never produced by the service itself; callers use it to represent a
/// local cache hit from [`PdfCache`](crate::cache::PdfCache).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FullTextResult {
    /// Structured JATS XML was found and rendered to display HTML.
    StructuredText { html: String },

    /// An open-access PDF is available at this URL.
    OpenAccessPdf { url: String },

    /// No text or PDF found; the DOI resolver URL is the best we can offer.
    PublisherRedirect { url: String },

    /// Last resort: the PubMed article page for a bare PMID.
    PubMedLink { url: String },

    /// A previously downloaded PDF already sits in the local cache.
    CachedFile { path: PathBuf },
}

impl FullTextResult {
    /// True when the result carries display HTML rather than an external link.
    pub fn is_structured(&self) -> bool {
        matches!(self, FullTextResult::StructuredText { .. })
    }

    /// The external URL, for the link-style variants.
    pub fn url(&self) -> Option<&str> {
        match self {
            FullTextResult::OpenAccessPdf { url }
            | FullTextResult::PublisherRedirect { url }
            | FullTextResult::PubMedLink { url } => Some(url),
            _ => None,
        }
    }
}
