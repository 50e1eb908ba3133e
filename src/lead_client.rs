use std::fmt::Formatter;
use std::time::Duration;

use reqwest::{redirect, Client, StatusCode, Url};
use secrecy::{ExposeSecret, Secret};

use crate::delivery::error_chain_fmt;
use crate::domain::LeadPayload;

/// One network exchange with the lead backend.
#[async_trait::async_trait]
pub trait LeadTransport: Send + Sync {
    async fn send_lead(&self, payload: &LeadPayload) -> Result<StatusCode, TransportError>;
}

#[derive(thiserror::Error)]
pub enum TransportError {
    #[error("The lead backend did not answer in time.")]
    Timeout(#[source] Option<reqwest::Error>),
    #[error("The lead backend could not be reached.")]
    NetworkUnavailable(#[source] Option<reqwest::Error>),
    #[error("The lead backend rejected the submission with status {0}.")]
    ServerRejected(u16),
}

impl TransportError {
    /// Timeouts and network failures are worth another try, a rejection is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_) | TransportError::NetworkUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(Some(e))
        } else {
            TransportError::NetworkUnavailable(Some(e))
        }
    }
}

impl std::fmt::Debug for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub struct LeadClient {
    http_client: Client,
    endpoint: Url,
    api_key: Option<Secret<String>>,
}

impl LeadClient {
    /// The timeout covers the whole exchange, from connecting to reading the response.
    /// Redirects are not followed: a 3xx is a rejection, since following it would drop the body.
    pub fn new(
        endpoint: Url,
        api_key: Option<Secret<String>>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            http_client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl LeadTransport for LeadClient {
    #[tracing::instrument(
        name = "Sending lead to backend",
        skip(self, payload),
        fields(endpoint = %self.endpoint, lead_email = %payload.email())
    )]
    async fn send_lead(&self, payload: &LeadPayload) -> Result<StatusCode, TransportError> {
        let mut request = self.http_client.post(self.endpoint.clone()).json(payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-Api-Key", api_key.expose_secret());
        }
        // `send` only fails on transport problems; the status is checked separately.
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::ServerRejected(status.as_u16()));
        }
        Ok(status)
    }
}
