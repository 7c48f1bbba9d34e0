//! HTTP client and retry utilities shared by the retrieval tiers.

mod http;
mod retry;

pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig};
