//! Batch delivery
//!
//! The transport hands each batch to a [`Deliver`] implementation. The
//! production one POSTs the batch as a JSON array to the ingestion endpoint.

use std::time::Duration;

use async_trait::async_trait;
use pulse_protocol::Event;
use tracing::trace;

use crate::error::{ClientError, TransportError};

/// Header carrying the number of events in the request body
pub const BATCH_SIZE_HEADER: &str = "X-Batch-Size";

/// Sends one batch to the ingestion endpoint
#[async_trait]
pub trait Deliver: Send + Sync {
    /// Deliver a batch; any error makes the transport retry
    async fn deliver(&self, batch: &[Event]) -> Result<(), TransportError>;
}

/// HTTP delivery with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpDeliver {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpDeliver {
    /// Create a delivery client for `endpoint`
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = parse_endpoint(endpoint)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl Deliver for HttpDeliver {
    async fn deliver(&self, batch: &[Event]) -> Result<(), TransportError> {
        let body =
            serde_json::to_vec(batch).map_err(|e| TransportError::Serialization(e.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(BATCH_SIZE_HEADER, batch.len())
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        trace!(status = status.as_u16(), events = batch.len(), "batch response");

        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }
}

/// Validate an endpoint string
pub(crate) fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url, ClientError> {
    if endpoint.trim().is_empty() {
        return Err(ClientError::MissingEndpoint);
    }

    let url = reqwest::Url::parse(endpoint).map_err(|e| ClientError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_accepts_http() {
        let url = parse_endpoint("http://localhost:3001/v1/collect").unwrap();
        assert_eq!(url.path(), "/v1/collect");
    }

    #[test]
    fn test_parse_endpoint_rejects_empty() {
        assert!(matches!(parse_endpoint("  "), Err(ClientError::MissingEndpoint)));
    }

    #[test]
    fn test_parse_endpoint_rejects_relative() {
        assert!(matches!(
            parse_endpoint("/v1/collect"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_parse_endpoint_rejects_other_schemes() {
        assert!(matches!(
            parse_endpoint("ftp://example.com/upload"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        // Port 9 (discard) on localhost is normally closed
        let deliver = HttpDeliver::new("http://127.0.0.1:9/v1/collect", Duration::from_secs(2))
            .unwrap();
        let batch = vec![Event::with_timestamp(1, "error", serde_json::json!({}))];

        let err = deliver.deliver(&batch).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
