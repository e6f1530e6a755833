use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("tracker already exists: {0}")]
    TrackerAlreadyExists(String),
    #[error("tracker not found: {0}")]
    TrackerNotFound(String),
    #[error("failed to connect to tracker {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("announce to {url} failed: {reason}")]
    Announce { url: String, reason: String },
}
