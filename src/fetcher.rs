use crate::job::{FailureKind, FetchError, FetchedDocument};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "docfetch/0.1";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Covers connect, response headers and the full body.
    pub timeout: Duration,
    pub user_agent: String,
    pub fail_on_http_status: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fail_on_http_status: false,
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError>;
}

/// Issues one GET per job through a freshly built client, so no connection
/// state is shared between jobs.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    settings: FetchSettings,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<Client, FetchError> {
        Client::builder()
            .timeout(self.settings.timeout)
            .user_agent(self.settings.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::new(FailureKind::Network, e.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, FetchError> {
        let url = Url::parse(url.trim())
            .map_err(|e| FetchError::new(FailureKind::InvalidUrl, e.to_string()))?;
        let client = self.build_client()?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, FailureKind::Network))?;

        let status = response.status();
        if !status.is_success() {
            if self.settings.fail_on_http_status {
                return Err(FetchError::new(
                    FailureKind::HttpStatus(status.as_u16()),
                    status.to_string(),
                ));
            }
            log::warn!("{} answered {}, archiving body anyway", url, status);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        // Consumes the response; the connection is released on every path.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, FailureKind::Body))?;

        log::debug!("Fetched {} ({} bytes)", url, bytes.len());

        Ok(FetchedDocument {
            bytes: bytes.to_vec(),
            content_type,
            status: status.as_u16(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error, fallback: FailureKind) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_connect() {
        return FetchError::new(FailureKind::Connect, err.to_string());
    }
    FetchError::new(fallback, err.to_string())
}
