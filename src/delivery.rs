use std::fmt::Formatter;

use crate::domain::LeadPayload;
use crate::lead_client::TransportError;
use crate::local_log::PersistenceError;

/// Where a built lead ends up: the remote backend or the local log.
#[async_trait::async_trait]
pub trait LeadSink: Send + Sync {
    async fn deliver(&self, payload: &LeadPayload) -> Result<DeliveryReceipt, DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryReceipt {
    /// The backend accepted the lead with `status` after `attempts` calls.
    Remote { status: u16, attempts: u32 },
    /// The lead was appended to the local log, which now holds `entries` records.
    Stored { entries: usize },
}

#[derive(thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl std::fmt::Debug for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Iterates over a chain of errors via the `source` method and prints the error with its cause
pub fn error_chain_fmt(
    error: &impl std::error::Error,
    formatter: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(formatter, "{}\n", error)?;
    let mut current = error.source();
    while let Some(cause) = current {
        writeln!(formatter, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
