/// Failure taxonomy for the chat client. None of these end the process; each one
/// degrades a single feature (a send, a load, a speech control).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MentorError {
    /// Network error, non-2xx status, or a response body that did not match the schema.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// Persisted payload could not be parsed.
    #[error("stored data is corrupt: {0}")]
    StorageCorrupt(String),
    /// Writing to the key-value store failed.
    #[error("storage error: {0}")]
    Storage(String),
    /// The platform has no engine for the requested speech feature.
    #[error("{0} is not supported on this system")]
    CapabilityUnsupported(&'static str),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, MentorError>;
