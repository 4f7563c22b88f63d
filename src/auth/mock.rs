//! In-memory mock implementation of HttpTransport for testing without the real provider.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::transport::HttpTransport;
use crate::error::TransportError;

/// One request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub url: String,
    pub content_type: String,
    pub body: String,
}

impl RecordedRequest {
    /// Value of the `Method` attribute on the `<Call>` element, if present.
    pub fn call_method(&self) -> Option<&str> {
        let start = self.body.find("Method=\"")? + "Method=\"".len();
        let end = self.body[start..].find('"')?;
        Some(&self.body[start..start + end])
    }
}

/// Mock transport replaying queued responses in order.
///
/// Every call is recorded. Running out of queued responses yields a
/// connection error.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock preloaded with successful response bodies.
    pub fn with_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let responses = bodies.into_iter().map(|b| Ok(b.into())).collect();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_error(&self, error: TransportError) {
        self.responses.lock().await.push_back(Err(error));
    }

    /// Requests seen so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<String, TransportError> {
        self.requests.lock().await.push(RecordedRequest {
            url: url.to_string(),
            content_type: content_type.to_string(),
            body,
        });

        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Connection {
                    url: url.to_string(),
                    message: "no mock response queued".to_string(),
                })
            })
    }
}
