use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid milestone input: {0}")]
    InvalidInput(#[from] MilestoneError),

    #[error("Entity source error: {0}")]
    Source(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Milestone calculation failures. `InvalidInput` is a caller bug, never an
/// upstream condition; `Overflow` is a value too large to have a next milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MilestoneError {
    #[error("current value {current} must be >= 0 and step {step} must be > 0")]
    InvalidInput { current: i64, step: i64 },

    /// The next milestone above `current` is not representable.
    #[error("next multiple of {step} above {current} overflows")]
    Overflow { current: i64, step: i64 },
}

/// Failure of a single request on a single transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e.to_string())
    }
}

/// Per-entity pipeline failure. Everything except `Fatal` is isolated to the
/// entity that produced it.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("unusable payload: {0}")]
    Parse(String),

    #[error("worker failure: {0}")]
    Worker(String),

    #[error(transparent)]
    Fatal(MilestoneError),
}

/// An overflowing total is one bad record; invalid input is a caller bug
/// that stops the run.
impl From<MilestoneError> for ScanError {
    fn from(e: MilestoneError) -> Self {
        match e {
            MilestoneError::Overflow { .. } => ScanError::Parse(e.to_string()),
            MilestoneError::InvalidInput { .. } => ScanError::Fatal(e),
        }
    }
}

impl ScanError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::Fatal(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Unreachable(_) => "unreachable",
            ScanError::Parse(_) => "parse",
            ScanError::Worker(_) => "worker",
            ScanError::Fatal(_) => "fatal",
        }
    }
}
