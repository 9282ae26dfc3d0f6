//! Error types for satmark core.

use std::{error::Error, fmt, io};

/// Error type for satmark core operations.
#[derive(Debug)]
pub enum SatmarkError {
    /// An underlying I/O error.
    Io(io::Error),
    /// A JSON (de)serialization error.
    Json(serde_json::Error),
    /// A configuration problem (bad path, unknown language, ...).
    Config(String),
    /// Percentile ranks are undefined for fewer than two projects.
    InsufficientProjects(usize),
}

impl fmt::Display for SatmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Config(message) => write!(f, "configuration error: {message}"),
            Self::InsufficientProjects(count) => write!(
                f,
                "percentile ranks are undefined for {count} project(s); at least 2 are required"
            ),
        }
    }
}

impl Error for SatmarkError {}

impl From<io::Error> for SatmarkError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SatmarkError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Convenience result type for satmark core.
pub type Result<T> = std::result::Result<T, SatmarkError>;
