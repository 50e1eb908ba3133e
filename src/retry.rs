use std::time::Duration;

use crate::delivery::{DeliveryError, DeliveryReceipt, LeadSink};
use crate::domain::LeadPayload;
use crate::lead_client::LeadTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first failure.
    pub retries: u32,
    /// Pause before each extra attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay: Duration::from_millis(2000),
        }
    }
}

/// A transport that tries again, after a pause, when a call times out or cannot reach the backend.
///
/// Attempts are strictly sequential and always carry the same payload. A rejection from the
/// backend, or running out of retries, hands the last error back unchanged.
pub struct RetryingTransport<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: LeadTransport> RetryingTransport<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }
}

#[async_trait::async_trait]
impl<T: LeadTransport> LeadSink for RetryingTransport<T> {
    #[tracing::instrument(name = "Delivering lead", skip(self, payload))]
    async fn deliver(&self, payload: &LeadPayload) -> Result<DeliveryReceipt, DeliveryError> {
        let mut remaining = self.policy.retries;
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.transport.send_lead(payload).await {
                Ok(status) => {
                    return Ok(DeliveryReceipt::Remote {
                        status: status.as_u16(),
                        attempts,
                    })
                }
                Err(e) if e.is_retryable() && remaining > 0 => {
                    remaining -= 1;
                    tracing::warn!(
                        error.message = %e,
                        attempt = attempts,
                        "Lead delivery failed, retrying in {:?}",
                        self.policy.delay
                    );
                    tokio::time::sleep(self.policy.delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
