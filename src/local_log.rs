use std::fmt::Formatter;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use crate::delivery::{error_chain_fmt, DeliveryError, DeliveryReceipt, LeadSink};
use crate::domain::LeadPayload;

/// Storage key the log lives under; the file is `<directory>/<key>.json`.
pub const LOG_KEY: &str = "neutralops_submissions";

#[derive(thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to access the local lead log at {}.", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The local lead log at {} is not a JSON array of leads.", .path.display())]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("The local lead log task did not complete.")]
    Interrupted(#[source] tokio::task::JoinError),
}

impl std::fmt::Debug for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Append-only, unbounded log of every lead, stored as a single JSON array.
///
/// Appends read the whole array, push one record and write it back through a temporary file,
/// so readers only ever see a complete array. Appends are serialized within the process.
#[derive(Clone)]
pub struct LocalLeadLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl LocalLeadLog {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            path: directory.as_ref().join(format!("{}.json", LOG_KEY)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one lead and returns how many the log holds afterwards.
    #[tracing::instrument(
        name = "Appending lead to local log",
        skip(self, payload),
        fields(path = %self.path.display())
    )]
    pub async fn append(&self, payload: &LeadPayload) -> Result<usize, PersistenceError> {
        let path = self.path.clone();
        let write_lock = self.write_lock.clone();
        let payload = payload.clone();
        spawn_blocking_with_tracing(move || -> Result<usize, PersistenceError> {
            // A poisoned lock only means another append panicked; the file itself is intact.
            let _guard = write_lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut entries = read_entries(&path)?;
            entries.push(payload);
            write_entries(&path, &entries)?;
            Ok(entries.len())
        })
        .await
        .map_err(PersistenceError::Interrupted)?
    }

    /// Every lead recorded so far, oldest first.
    pub async fn entries(&self) -> Result<Vec<LeadPayload>, PersistenceError> {
        let path = self.path.clone();
        spawn_blocking_with_tracing(move || read_entries(&path))
            .await
            .map_err(PersistenceError::Interrupted)?
    }
}

#[async_trait::async_trait]
impl LeadSink for LocalLeadLog {
    async fn deliver(&self, payload: &LeadPayload) -> Result<DeliveryReceipt, DeliveryError> {
        let entries = self.append(payload).await?;
        Ok(DeliveryReceipt::Stored { entries })
    }
}

fn read_entries(path: &Path) -> Result<Vec<LeadPayload>, PersistenceError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };
    serde_json::from_slice(&raw).map_err(|source| PersistenceError::Corrupted {
        path: path.to_owned(),
        source,
    })
}

fn write_entries(path: &Path, entries: &[LeadPayload]) -> Result<(), PersistenceError> {
    let io_error = |source: std::io::Error| PersistenceError::Io {
        path: path.to_owned(),
        source,
    };
    let body = serde_json::to_vec(entries).map_err(|source| PersistenceError::Corrupted {
        path: path.to_owned(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, body).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)
}

/// Runs blocking file work on tokio's blocking pool, keeping the caller's span as its parent.
fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}
