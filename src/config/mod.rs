//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Full-text subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Contact email sent to the open-access lookup API (required by the
    /// service's fair-use policy; free, no key needed)
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Base URL for the structured-XML endpoint (Europe PMC REST)
    #[serde(default = "default_xml_base_url")]
    pub xml_base_url: String,

    /// Base URL for the open-access-location API (Unpaywall v2)
    #[serde(default = "default_oa_base_url")]
    pub oa_base_url: String,

    /// PDF cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contact_email: default_contact_email(),
            request_timeout_secs: default_request_timeout(),
            xml_base_url: default_xml_base_url(),
            oa_base_url: default_oa_base_url(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_contact_email() -> String {
    std::env::var("UNPAYWALL_EMAIL").unwrap_or_else(|_| "user@example.com".to_string())
}

fn default_request_timeout() -> u64 {
    30
}

fn default_xml_base_url() -> String {
    "https://www.ebi.ac.uk/europepmc/webservices/rest".to_string()
}

fn default_oa_base_url() -> String {
    "https://api.unpaywall.org/v2".to_string()
}

/// PDF cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory; defaults to the platform cache dir
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
        }
    }
}

/// Default cache directory: `~/.cache/bmnews-fulltext/pdfs` (or platform
/// equivalent), falling back to a relative directory when no home exists.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join(env!("CARGO_PKG_NAME"))
        .join("pdfs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.xml_base_url.starts_with("https://"));
        assert!(config.oa_base_url.starts_with("https://"));
        assert!(!config.contact_email.is_empty());
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let config: Config = serde_json::from_str(r#"{"contact_email":"me@lab.org"}"#).unwrap();
        assert_eq!(config.contact_email, "me@lab.org");
        assert_eq!(config.request_timeout_secs, 30);
    }
}
