use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::error::INVALID_SESSION_CODE;
use crate::structs::tracking::{
    CaptureRequest, CaptureResponse, DurationUpdateRequest, TitleUpdateRequest,
};

#[derive(Error, Debug)]
pub enum TransportError {
    /// The server refused the session token we presented.
    #[error("Session rejected by server")]
    InvalidSession,

    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Worth another attempt after a backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Rejected { status, .. } => *status >= 500 || *status == 429,
            TransportError::InvalidSession | TransportError::Decode(_) => false,
        }
    }
}

/// Calls whose outcome the tracker waits for.
#[async_trait]
pub trait TrackerTransport: Send + Sync {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResponse, TransportError>;

    async fn update_title(&self, request: &TitleUpdateRequest) -> Result<(), TransportError>;
}

/// Fire-and-forget delivery the host keeps attempting while the page is torn
/// down. Returns whether the request was handed off, never whether it arrived.
pub trait BeaconTransport: Send + Sync {
    fn send_beacon(&self, request: &DurationUpdateRequest) -> bool;
}

/// HTTP implementation for native hosts.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/analytics/{}", self.base_url, path)
    }
}

async fn rejection(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let body: serde_json::Value = response.json().await.unwrap_or_default();

    let session_rejected = status == StatusCode::UNAUTHORIZED
        || status == StatusCode::NOT_FOUND
        || body["code"] == INVALID_SESSION_CODE;
    if session_rejected {
        return TransportError::InvalidSession;
    }

    TransportError::Rejected {
        status: status.as_u16(),
        message: body["error"].as_str().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl TrackerTransport for HttpTransport {
    async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResponse, TransportError> {
        let response = self
            .client
            .post(self.endpoint("capture"))
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        response
            .json::<CaptureResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn update_title(&self, request: &TitleUpdateRequest) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.endpoint("title"))
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }
}

impl BeaconTransport for HttpTransport {
    fn send_beacon(&self, request: &DurationUpdateRequest) -> bool {
        // Without a runtime there is nothing to hand the request to
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };

        let mut builder = self.client.post(self.endpoint("duration")).json(request);
        if let Some(token) = &request.session_id {
            builder = builder.header("X-Session-Id", token.as_str());
        }

        handle.spawn(async move {
            match builder.send().await {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => log::warn!("Duration beacon rejected: {}", response.status()),
                Err(e) => log::warn!("Duration beacon not delivered: {}", e),
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_and_server_failures_are_transient() {
        assert!(TransportError::Network("reset".into()).is_transient());
        assert!(
            TransportError::Rejected {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            TransportError::Rejected {
                status: 429,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !TransportError::Rejected {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!TransportError::InvalidSession.is_transient());
    }

    #[test]
    fn endpoint_joins_base_url() {
        let transport = HttpTransport::new("https://shop.example.com/");
        assert_eq!(
            transport.endpoint("capture"),
            "https://shop.example.com/api/analytics/capture"
        );
    }
}
