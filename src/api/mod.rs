//! HTTP adapter for the abuse-report API.

use std::time::Duration;

use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::{DomainDetail, HealthStatus, NewReport, Report, StatusUpdate};

mod error;

pub use error::ApiError;

/// Compile-time default for the API base URL.
pub const DEFAULT_BASE_URL: &str = match option_env!("ABUSEDASH_API_BASE_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:8000",
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide connection settings, created once and handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ApiClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(cfg.base_url.trim()).map_err(|e| ApiError::BaseUrl {
            url: cfg.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl {
                url: cfg.base_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(concat!("abusedash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network {
                base_url: cfg.base_url.clone(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url,
            timeout: cfg.timeout,
        })
    }

    /// Per-request timeout the client was built with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let resp = self.send(self.request(Method::GET, &["health"])).await?;
        decode(resp).await
    }

    pub async fn list_reports(&self) -> Result<Vec<Report>, ApiError> {
        let resp = self.send(self.request(Method::GET, &["reports"])).await?;
        decode(resp).await
    }

    pub async fn get_domain_detail(&self, domain_name: &str) -> Result<DomainDetail, ApiError> {
        let resp = self
            .send(self.request(Method::GET, &["report", domain_name]))
            .await?;
        decode(resp).await
    }

    /// The server assigns `report_id` and `risk_level`.
    pub async fn create_report(&self, payload: &NewReport) -> Result<Report, ApiError> {
        let resp = self
            .send(self.request(Method::POST, &["report"]).json(payload))
            .await?;
        decode(resp).await
    }

    pub async fn update_domain_status(
        &self,
        domain_name: &str,
        payload: &StatusUpdate,
    ) -> Result<(), ApiError> {
        let resp = self
            .send(
                self.request(Method::POST, &["domains", domain_name, "status"])
                    .json(payload),
            )
            .await?;
        check_status(resp).await.map(|_| ())
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this never fails.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> reqwest::RequestBuilder {
        self.client.request(method, self.url(segments))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        req.send().await.map_err(|e| ApiError::Network {
            base_url: self.base_url().to_string(),
            source: e,
        })
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let resp = check_status(resp).await?;
    resp.json::<T>().await.map_err(ApiError::Decode)
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound);
    }
    if status.is_client_error() {
        let detail = match resp.json::<ErrorBody>().await {
            Ok(body) => match body.detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
            Err(_) => status
                .canonical_reason()
                .unwrap_or("client error")
                .to_string(),
        };
        return Err(ApiError::Rejected { status, detail });
    }
    Err(ApiError::Server { status })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: base.to_string(),
            timeout: Duration::from_secs(1),
        })
        .expect("client")
    }

    #[test]
    fn url_joins_segments_under_base_path() {
        let c = client("http://api.test/v1/");
        assert_eq!(
            c.url(&["domains", "example.com", "status"]).as_str(),
            "http://api.test/v1/domains/example.com/status"
        );
        let c = client("http://api.test");
        assert_eq!(c.url(&["reports"]).as_str(), "http://api.test/reports");
    }

    #[test]
    fn domain_segment_is_percent_encoded() {
        let c = client("http://api.test");
        assert_eq!(
            c.url(&["report", "a b/c.com"]).as_str(),
            "http://api.test/report/a%20b%2Fc.com"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let err = ApiClient::new(&ApiConfig {
            base_url: "not a url".to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
        .expect_err("should fail");
        assert!(matches!(err, ApiError::BaseUrl { .. }));

        let err = ApiClient::new(&ApiConfig {
            base_url: "mailto:abuse@example.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
        .expect_err("should fail");
        assert!(matches!(err, ApiError::BaseUrl { .. }));
    }

    #[test]
    fn keeps_the_configured_timeout() {
        assert_eq!(client("http://api.test").timeout(), Duration::from_secs(1));
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        assert_eq!(client("http://api.test/").base_url(), "http://api.test");
    }
}
