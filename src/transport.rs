//! `reqwest`-backed [`Transport`].

use async_trait::async_trait;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::contract::{QueryParams, Transport};
use crate::error::{ConfigurationError, TransportError};

/// Issues authenticated GET requests against the delivery API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    access_token: String,
}

impl HttpTransport {
    pub fn new(access_token: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            access_token: access_token.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigurationError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                ConfigurationError::HttpClient(e.to_string())
            })?;
        Ok(Self::new(config.access_token.clone(), http))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, params: &QueryParams) -> Result<Vec<u8>, TransportError> {
        debug!(url = %url, params = ?params, "[HTTP] GET");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(url = %url, status = status.as_u16(), "[HTTP] Request failed");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        debug!(url = %url, bytes = body.len(), "[HTTP] Response received");
        Ok(body.to_vec())
    }
}
