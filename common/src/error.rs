//! Error taxonomy shared by the store, the API and the client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressError {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),
    /// Two callers created the same staff member at once.
    #[error("staff member {name:?} was created concurrently, retry the request")]
    Conflict { name: String },
    /// The datastore was unavailable or a query failed.
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("collation data unavailable: {0}")]
    Collation(String),
}

impl ProgressError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProgressError::Validation(message.into())
    }

    /// True if the caller sent something wrong, as opposed to a server-side failure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProgressError::Validation(_))
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::Error> for ProgressError {
    fn from(err: diesel::result::Error) -> Self {
        ProgressError::Persistence(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<diesel::r2d2::PoolError> for ProgressError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ProgressError::Persistence(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<diesel::result::ConnectionError> for ProgressError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        ProgressError::Persistence(err.to_string())
    }
}
