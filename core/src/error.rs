use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upstream unavailable for slice '{slice}': {reason}")]
    UpstreamUnavailable { slice: String, reason: String },

    #[error("Specialist '{id}' not found")]
    SpecialistNotFound { id: String },

    #[error("Malformed value for '{field}': {value}")]
    Malformed { field: String, value: String },

    #[error("Store connection lock poisoned")]
    StoreLockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportError {
    pub fn upstream(slice: &str, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            slice:  slice.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(field: &str, value: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
