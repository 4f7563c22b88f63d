//! HTTP transport used by provider backends.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::TransportError;

/// Posts a request body and returns the response body as text.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<String, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
///
/// Non-success HTTP statuses are reported as [`TransportError::Status`].
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<String, TransportError> {
        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Connection {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "provider responded");

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "no body".to_string());
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.text().await.map_err(|e| TransportError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
