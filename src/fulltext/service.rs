//! Tiered full-text retrieval.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::fulltext::FetchError;
use crate::jats::JatsParser;
use crate::models::FullTextResult;
use crate::utils::{with_retry, HttpClient, RetryConfig};

const DOI_RESOLVER_BASE: &str = "https://doi.org";
const PUBMED_BASE: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// Full-text retrieval service.
///
/// Tiers are attempted strictly in order, one attempt each; an earlier
/// tier's absence (404, empty result, unparseable XML) falls through
/// silently to the next. The service holds no per-request state, so one
/// instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct FullTextService {
    client: Arc<HttpClient>,
    config: Config,
    retry: RetryConfig,
}

impl FullTextService {
    pub fn new(config: Config) -> Result<Self, FetchError> {
        let client = Arc::new(HttpClient::new(Duration::from_secs(
            config.request_timeout_secs,
        ))?);
        Ok(Self {
            client,
            config,
            retry: RetryConfig::default(),
        })
    }

    /// Create with a custom HTTP client (for testing)
    #[allow(dead_code)]
    pub fn with_client(config: Config, client: Arc<HttpClient>) -> Self {
        Self {
            client,
            config,
            retry: RetryConfig::default(),
        }
    }

    /// Fetch the best available full-text representation for a paper.
    ///
    /// Identifier preference: PMC ID (structured XML), then DOI (open
    /// access PDF, else publisher redirect), then PMID (PubMed page).
    /// Returns [`FetchError::NoIdentifiers`], before any network call,
    /// when all three are absent or empty.
    pub async fn fetch(
        &self,
        pmcid: Option<&str>,
        doi: Option<&str>,
        pmid: Option<&str>,
    ) -> Result<FullTextResult, FetchError> {
        let pmcid = non_empty(pmcid);
        let doi = non_empty(doi).map(clean_doi);
        let pmid = non_empty(pmid);

        if pmcid.is_none() && doi.is_none() && pmid.is_none() {
            return Err(FetchError::NoIdentifiers);
        }

        // Tier 1: structured JATS XML, rendered to display HTML.
        if let Some(pmcid) = pmcid {
            if let Some(result) = self.try_structured_xml(pmcid).await {
                return Ok(result);
            }
        }

        if let Some(doi) = doi {
            // Tier 2: open-access PDF location lookup.
            if let Some(result) = self.try_open_access(&doi).await {
                return Ok(result);
            }

            // Tier 3: the DOI resolver always works when a DOI exists.
            return Ok(FullTextResult::PublisherRedirect {
                url: format!("{}/{}", DOI_RESOLVER_BASE, doi),
            });
        }

        // Tier 4: last resort, the PubMed article page.
        if let Some(pmid) = pmid {
            return Ok(FullTextResult::PubMedLink {
                url: format!("{}/{}/", PUBMED_BASE, pmid),
            });
        }

        Err(FetchError::TierUnavailable(
            "structured XML unavailable and no DOI or PMID to fall back on".to_string(),
        ))
    }

    /// Tier 1: fetch JATS XML for a PMC ID and render it.
    async fn try_structured_xml(&self, pmcid: &str) -> Option<FullTextResult> {
        let pmcid = normalize_pmcid(pmcid);
        let url = format!("{}/{}/fullTextXML", self.config.xml_base_url, pmcid);

        let response = match self.http_get(&url).await {
            Ok(response) => response,
            Err(e) => {
                debug!("structured XML request for {} failed: {}", pmcid, e);
                return None;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("no structured XML for {}", pmcid);
            return None;
        }
        if !response.status().is_success() {
            debug!(
                "structured XML endpoint returned {} for {}",
                response.status(),
                pmcid
            );
            return None;
        }

        let xml = match response.text().await {
            Ok(xml) => xml,
            Err(e) => {
                debug!("failed to read structured XML for {}: {}", pmcid, e);
                return None;
            }
        };

        match JatsParser::with_pmcid(pmcid.as_str()).render_html(&xml) {
            Ok(html) => Some(FullTextResult::StructuredText { html }),
            Err(e) => {
                debug!("structured XML for {} did not parse: {}", pmcid, e);
                None
            }
        }
    }

    /// Tier 2: look up an open-access copy by DOI.
    async fn try_open_access(&self, doi: &str) -> Option<FullTextResult> {
        let url = format!(
            "{}/{}?email={}",
            self.config.oa_base_url,
            urlencoding::encode(doi),
            urlencoding::encode(&self.config.contact_email)
        );

        let response = match self.http_get(&url).await {
            Ok(response) => response,
            Err(e) => {
                debug!("open-access lookup for {} failed: {}", doi, e);
                return None;
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("DOI {} unknown to the open-access index", doi);
            return None;
        }
        if !response.status().is_success() {
            debug!(
                "open-access lookup returned {} for {}",
                response.status(),
                doi
            );
            return None;
        }

        let record: OaResponse = match response.json().await {
            Ok(record) => record,
            Err(e) => {
                debug!("open-access response for {} did not parse: {}", doi, e);
                return None;
            }
        };

        record
            .pdf_url()
            .map(|url| FullTextResult::OpenAccessPdf { url })
            .or_else(|| {
                debug!("no open-access location for {}", doi);
                None
            })
    }

    /// The one seam every outbound request goes through. Transient
    /// failures (connect errors, 5xx, 429) retry with backoff; 404 and
    /// other client statuses return to the caller untouched.
    async fn http_get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let client = Arc::clone(&self.client);
        let url = url.to_string();

        with_retry(self.retry, move || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move {
                let response = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Network(format!("GET {} failed: {}", url, e)))?;

                let status = response.status();
                if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(FetchError::Network(format!(
                        "GET {} returned {}",
                        url, status
                    )));
                }

                Ok(response)
            }
        })
        .await
    }
}

fn non_empty(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|s| !s.is_empty())
}

/// Normalize a PMC identifier to the `PMC{digits}` form.
fn normalize_pmcid(id: &str) -> String {
    let trimmed = id.trim();
    if trimmed.len() >= 3 && trimmed[..3].eq_ignore_ascii_case("pmc") {
        format!("PMC{}", &trimmed[3..])
    } else {
        format!("PMC{}", trimmed)
    }
}

fn clean_doi(doi: &str) -> String {
    doi.trim_start_matches("https://doi.org/")
        .trim_start_matches("doi:")
        .trim()
        .to_string()
}

// ===== Open-access API types =====

/// Unpaywall-style open-access lookup response
#[derive(Debug, Deserialize)]
struct OaResponse {
    best_oa_location: Option<OaLocation>,
    #[serde(default)]
    oa_locations: Vec<OaLocation>,
}

#[derive(Debug, Deserialize)]
struct OaLocation {
    url_for_pdf: Option<String>,
    url: Option<String>,
}

impl OaResponse {
    /// Best PDF URL: the best location's PDF, else any secondary
    /// location's PDF, else any secondary location's generic URL.
    fn pdf_url(&self) -> Option<String> {
        self.best_oa_location
            .as_ref()
            .and_then(|loc| loc.url_for_pdf.clone())
            .or_else(|| {
                self.oa_locations
                    .iter()
                    .find_map(|loc| loc.url_for_pdf.clone())
            })
            .or_else(|| self.oa_locations.iter().find_map(|loc| loc.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_XML: &str = r#"<article>
        <front><article-meta>
          <title-group><article-title>Sample Article</article-title></title-group>
        </article-meta></front>
        <body><sec><title>Intro</title><p>Hello.</p></sec></body>
    </article>"#;

    fn test_config(server: &mockito::ServerGuard) -> Config {
        Config {
            contact_email: "test@example.com".to_string(),
            xml_base_url: server.url(),
            oa_base_url: server.url(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_pmcid() {
        assert_eq!(normalize_pmcid("123"), "PMC123");
        assert_eq!(normalize_pmcid("PMC123"), "PMC123");
        assert_eq!(normalize_pmcid("pmc123"), "PMC123");
        assert_eq!(normalize_pmcid(" PMC123 "), "PMC123");
    }

    #[test]
    fn test_clean_doi() {
        assert_eq!(clean_doi("10.1/x"), "10.1/x");
        assert_eq!(clean_doi("https://doi.org/10.1/x"), "10.1/x");
        assert_eq!(clean_doi("doi:10.1/x"), "10.1/x");
    }

    #[test]
    fn test_oa_response_location_preference() {
        let record: OaResponse = serde_json::from_str(
            r#"{
                "best_oa_location": {"url_for_pdf": null, "url": "https://example.com/page"},
                "oa_locations": [
                    {"url_for_pdf": null, "url": "https://example.com/alt"},
                    {"url_for_pdf": "https://example.com/alt.pdf", "url": null}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.pdf_url().as_deref(), Some("https://example.com/alt.pdf"));

        let record: OaResponse = serde_json::from_str(
            r#"{"best_oa_location": null, "oa_locations": [{"url_for_pdf": null, "url": "https://example.com/alt"}]}"#,
        )
        .unwrap();
        assert_eq!(record.pdf_url().as_deref(), Some("https://example.com/alt"));

        let record: OaResponse =
            serde_json::from_str(r#"{"best_oa_location": null, "oa_locations": []}"#).unwrap();
        assert_eq!(record.pdf_url(), None);
    }

    #[tokio::test]
    async fn test_fetch_structured_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/PMC123/fullTextXML")
            .with_status(200)
            .with_body(SAMPLE_XML)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service.fetch(Some("PMC123"), None, None).await.unwrap();

        match result {
            FullTextResult::StructuredText { html } => {
                assert!(html.contains("<h1>Sample Article</h1>"));
                assert!(html.contains("<p>Hello.</p>"));
            }
            other => panic!("expected StructuredText, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_normalizes_bare_pmcid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/PMC77/fullTextXML")
            .with_status(200)
            .with_body(SAMPLE_XML)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service.fetch(Some("77"), None, None).await.unwrap();

        assert!(result.is_structured());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_publisher_redirect() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/PMC404/fullTextXML")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/10.1%2Fx")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service
            .fetch(Some("PMC404"), Some("10.1/x"), None)
            .await
            .unwrap();

        assert_eq!(
            result,
            FullTextResult::PublisherRedirect {
                url: "https://doi.org/10.1/x".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_open_access_pdf() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/10.1%2Foa")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"best_oa_location": {"url_for_pdf": "https://example.com/paper.pdf", "url": null}, "oa_locations": []}"#,
            )
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service.fetch(None, Some("10.1/oa"), None).await.unwrap();

        assert_eq!(
            result,
            FullTextResult::OpenAccessPdf {
                url: "https://example.com/paper.pdf".to_string()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_unparseable_xml_falls_through_to_oa() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/PMC9/fullTextXML")
            .with_status(200)
            .with_body("<article><sec></article>")
            .create_async()
            .await;
        server
            .mock("GET", "/10.2%2Fy")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"best_oa_location": {"url_for_pdf": "https://example.com/y.pdf", "url": null}, "oa_locations": []}"#,
            )
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service
            .fetch(Some("PMC9"), Some("10.2/y"), None)
            .await
            .unwrap();

        assert_eq!(
            result,
            FullTextResult::OpenAccessPdf {
                url: "https://example.com/y.pdf".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_pmid_last_resort() {
        let service = FullTextService::new(Config::default()).unwrap();
        let result = service.fetch(None, None, Some("12345")).await.unwrap();

        assert_eq!(
            result,
            FullTextResult::PubMedLink {
                url: "https://pubmed.ncbi.nlm.nih.gov/12345/".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_no_identifiers_makes_no_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service.fetch(None, None, Some("  ")).await;

        assert!(matches!(result, Err(FetchError::NoIdentifiers)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_pmcid_only_exhaustion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/PMC404/fullTextXML")
            .with_status(404)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service.fetch(Some("PMC404"), None, None).await;

        assert!(matches!(result, Err(FetchError::TierUnavailable(_))));
    }

    #[tokio::test]
    async fn test_http_get_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/PMC5/fullTextXML")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;
        server
            .mock("GET", "/10.3%2Fz")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let service = FullTextService::new(test_config(&server)).unwrap();
        let result = service
            .fetch(Some("PMC5"), Some("10.3/z"), None)
            .await
            .unwrap();

        // 5xx retries, then the tier is treated as unavailable.
        assert!(matches!(result, FullTextResult::PublisherRedirect { .. }));
        mock.assert_async().await;
    }
}
