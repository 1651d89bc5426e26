//! Error types for borm

use thiserror::Error;

/// Result type alias for borm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for mapping, SQL generation and execution.
///
/// Everything except [`OrmError::Driver`] is detected before a statement is sent.
#[derive(Debug, Error)]
pub enum OrmError {
    /// The destination shape is not something borm can bind.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A malformed or empty condition (or an empty SET list).
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// The selected dialect cannot honor a requested clause.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// A column value could not be stored into (or matched to) the destination.
    #[error("Mapping error on column '{column}': {message}")]
    Mapping { column: String, message: String },

    /// Opaque passthrough from the underlying driver.
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OrmError {
    /// Create a mapping error for a specific column
    pub fn mapping(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Wrap a driver error without altering it.
    pub fn driver<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Driver(Box::new(err))
    }

    pub fn unsupported_type(message: impl Into<String>) -> Self {
        Self::UnsupportedType(message.into())
    }

    pub fn invalid_condition(message: impl Into<String>) -> Self {
        Self::InvalidCondition(message.into())
    }

    pub fn unsupported_feature(message: impl Into<String>) -> Self {
        Self::UnsupportedFeature(message.into())
    }

    /// Check if this error came from the driver
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    /// Check if this is an unsupported feature error
    pub fn is_unsupported_feature(&self) -> bool {
        matches!(self, Self::UnsupportedFeature(_))
    }

    /// Check if this is an invalid condition error
    pub fn is_invalid_condition(&self) -> bool {
        matches!(self, Self::InvalidCondition(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::driver(err)
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::driver(err)
    }
}
