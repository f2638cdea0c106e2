//! Unified error hierarchy for trainlive
//!
//! The live core is pure in-memory state manipulation, so the taxonomy is
//! narrow: index misuse, double starts and invalid definitions. The ambient
//! layer (configuration, track files) adds its own variants.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all trainlive operations
#[derive(Debug, Error)]
pub enum TrainLiveError {
    /// Direct index access outside the exercise list
    #[error("Invalid index {index} (length {len})")]
    InvalidIndex { index: usize, len: usize },

    /// A session of this kind is already running
    #[error("A {session} session is already active")]
    AlreadyActive { session: SessionKind },

    /// Invalid session, circuit or block definition
    #[error("Validation error: {0}")]
    Validation(String),

    /// Track file loading errors
    #[error("Track error: {0}")]
    Track(#[from] TrackError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session kinds that enforce a single active instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Run,
    Circuit,
    Strength,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Run => write!(f, "run"),
            SessionKind::Circuit => write!(f, "circuit"),
            SessionKind::Strength => write!(f, "strength"),
        }
    }
}

/// Track loading errors
#[derive(Debug, Error)]
pub enum TrackError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Extension is neither gpx nor json
    #[error("Unsupported track format: {format}")]
    UnsupportedFormat { format: String },

    /// Format-specific parsing error
    #[error("Parse error in {format}: {reason}")]
    ParseError { format: String, reason: String },

    /// Track point without a usable timestamp
    #[error("Track point {index} has no timestamp")]
    MissingTimestamp { index: usize },
}

/// Result type alias for trainlive operations
pub type Result<T> = std::result::Result<T, TrainLiveError>;

impl TrainLiveError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrainLiveError::AlreadyActive { .. } => ErrorSeverity::Warning,
            TrainLiveError::Validation(_) => ErrorSeverity::Warning,
            TrainLiveError::Track(TrackError::FileNotFound { .. }) => ErrorSeverity::Warning,
            TrainLiveError::InvalidIndex { .. } => ErrorSeverity::Error,
            TrainLiveError::Configuration(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrainLiveError::AlreadyActive { session } => {
                format!("Finish or reset the current {} before starting a new one.", session)
            }
            TrainLiveError::Track(TrackError::FileNotFound { path }) => {
                format!("Could not find track file: {}", path.display())
            }
            TrainLiveError::InvalidIndex { index, len } => {
                format!("Exercise {} does not exist (session has {}).", index + 1, len)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Error that prevents the operation
    Error,
    /// Warning that doesn't leave the session in a bad state
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
