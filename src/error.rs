use thiserror::Error;

/// Custom Result type for minidb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for minidb
///
/// Everything except `Io` and `Internal` is a domain error: the session turns
/// it into a failed `ExecutionResult` instead of returning it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Statement text could not be parsed
    #[error("syntax error: {0}")]
    Syntax(String),
    /// Statement uses a construct this dialect does not support
    #[error("unsupported syntax: {0}")]
    UnsupportedSyntax(String),
    /// Invalid table or column definition
    #[error("schema error: {0}")]
    Schema(String),
    /// Value cannot be coerced to the column type
    #[error("type error: {0}")]
    Type(String),
    /// Uniqueness, primary key or not-null breach
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// Table or column does not exist
    #[error("not found: {0}")]
    NotFound(String),
    #[error("table {0} already exists")]
    DuplicateTable(String),
    /// Persistence layer failure
    #[error("io failure: {0}")]
    Io(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true for errors that must reach the caller as `Err`
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Internal(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(value: bincode::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(value: tempfile::PersistError) -> Self {
        Error::Io(value.error.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Error::Internal(format!("invalid config: {}", value))
    }
}
