//! Error types for Capline Core

use thiserror::Error;

/// Result type alias for caption and player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a caption timestamp token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampIssue {
    /// Token did not split into exactly three `:`-separated parts
    WrongComponentCount(usize),
    /// A part was empty or not an unsigned integer
    NotNumeric,
    /// The total number of seconds does not fit
    OutOfRange,
}

impl std::fmt::Display for TimestampIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampIssue::WrongComponentCount(n) => {
                write!(f, "timestamp must be in the format HH:MM:SS (found {} part(s))", n)
            }
            TimestampIssue::NotNumeric => write!(f, "invalid timestamp format"),
            TimestampIssue::OutOfRange => write!(f, "timestamp is out of range"),
        }
    }
}

/// Capline error types
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Please enter a valid video URL.")]
    EmptyUrl,

    #[error("Line {line}: invalid timestamp '{token}': {issue}")]
    CaptionFormat {
        line: usize,
        token: String,
        issue: TimestampIssue,
    },

    // Player errors
    #[error("Invalid player state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a caption format error for a 1-based line number
    pub fn caption_format(line: usize, token: impl Into<String>, issue: TimestampIssue) -> Self {
        Error::CaptionFormat {
            line,
            token: token.into(),
            issue,
        }
    }

    /// Returns true if the user can fix this by editing their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Error::EmptyUrl | Error::CaptionFormat { .. })
    }

    /// Returns a stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::EmptyUrl => "EMPTY_URL",
            Error::CaptionFormat { .. } => "CAPTION_FORMAT",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}
