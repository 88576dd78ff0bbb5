use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single API call. Returned to the calling view undecorated.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("cannot reach API at {base_url}: {source}")]
    Network {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("domain not found")]
    NotFound,
    #[error("request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },
    #[error("server error ({status})")]
    Server { status: StatusCode },
    #[error("failed to decode API response: {0}")]
    Decode(#[source] reqwest::Error),
    /// The caller stopped waiting before a response arrived.
    #[error("request abandoned: {0}")]
    Abandoned(&'static str),
    #[error("invalid API base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Network { source, .. } if source.is_timeout())
    }
}
