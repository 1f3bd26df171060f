use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures raised by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("start year {start} is after end year {end}")]
    InvalidRange { start: i32, end: i32 },
}

/// Failures raised while loading a subject's records from a data source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data for subject '{subject}' in {}", location.display())]
    DataNotFound { subject: String, location: PathBuf },

    #[error("malformed data for subject '{subject}': {reason}")]
    DataFormat { subject: String, reason: String },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn format(subject: &str, reason: impl Into<String>) -> Self {
        SourceError::DataFormat {
            subject: subject.to_string(),
            reason: reason.into(),
        }
    }

    pub fn not_found(subject: &str, location: impl Into<PathBuf>) -> Self {
        SourceError::DataNotFound {
            subject: subject.to_string(),
            location: location.into(),
        }
    }
}

/// Anything the dashboard state can fail with while refreshing a view.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
