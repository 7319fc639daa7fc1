//! Error types for tidewire operations.

use std::fmt;

use thiserror::Error;

/// The primary error type for all tidewire operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Static table or configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Column bytes could not be turned into a typed value
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    /// A mutation was attempted on a cursor that cannot be edited
    #[error("Result set is not updatable: {0}")]
    NotUpdatable(NotUpdatableReason),
    /// Error reported by the statement-execution collaborator, passed through as-is
    #[error(transparent)]
    Execution(#[from] SqlExecutionError),
    /// Operation not allowed at the cursor's current position or state
    #[error("Invalid cursor state: {0}")]
    InvalidCursorState(String),
    /// An internal lock was poisoned by a panicking thread
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

/// Why a column value could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// The bytes do not match any accepted layout for the column type
    Malformed,
    /// A fixed-width field needs more bytes than the buffer holds
    Truncated { expected: usize, actual: usize },
    /// An all-zero date/time literal under the raise-error policy
    ZeroDate,
    /// The column's client encoding has no converter
    UnsupportedEncoding(String),
}

/// A column value that could not be decoded.
///
/// Carries the offending bytes and the zero-based column index so callers can
/// report exactly which value failed.
#[derive(Debug, Clone, Error)]
#[error("Decoding error in column {column_index}: {message}")]
pub struct DecodingError {
    pub column_index: usize,
    pub bytes: Vec<u8>,
    pub kind: DecodingErrorKind,
    pub message: String,
}

impl DecodingError {
    pub fn new(
        column_index: usize,
        bytes: &[u8],
        kind: DecodingErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            column_index,
            bytes: bytes.to_vec(),
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(column_index: usize, bytes: &[u8], message: impl Into<String>) -> Self {
        Self::new(column_index, bytes, DecodingErrorKind::Malformed, message)
    }

    pub fn truncated(column_index: usize, bytes: &[u8], expected: usize) -> Self {
        Self::new(
            column_index,
            bytes,
            DecodingErrorKind::Truncated {
                expected,
                actual: bytes.len(),
            },
            format!("needs {expected} bytes, buffer holds {}", bytes.len()),
        )
    }

    /// Re-target an error produced without column context.
    #[must_use]
    pub fn at_column(mut self, column_index: usize) -> Self {
        self.column_index = column_index;
        self
    }
}

/// The fixed set of reasons a result set cannot be edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotUpdatableReason {
    /// Columns come from more than one table
    MultipleTables,
    /// Columns come from more than one database
    MultipleDatabases,
    /// A column has no originating table, or the table name is empty
    MissingTableName,
    /// None of the projected columns is part of the primary key
    NoPrimaryKey,
    /// The projected primary key does not match the table's live primary key
    PrimaryKeyMismatch { projected: Vec<String>, live: Vec<String> },
}

impl fmt::Display for NotUpdatableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotUpdatableReason::MultipleTables => {
                write!(f, "result set references more than one table")
            }
            NotUpdatableReason::MultipleDatabases => {
                write!(f, "result set references more than one database")
            }
            NotUpdatableReason::MissingTableName => {
                write!(f, "a column has no originating table name")
            }
            NotUpdatableReason::NoPrimaryKey => {
                write!(f, "no primary key column is part of the result set")
            }
            NotUpdatableReason::PrimaryKeyMismatch { projected, live } => write!(
                f,
                "projected primary key [{}] does not match table primary key [{}]",
                projected.join(", "),
                live.join(", ")
            ),
        }
    }
}

/// An error reported by the statement-execution collaborator.
///
/// The core never inspects or rewrites these; they reach the caller unchanged.
#[derive(Debug, Error)]
pub struct SqlExecutionError {
    pub message: String,
    pub sqlstate: Option<String>,
    pub vendor_code: Option<u16>,
    pub sql: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SqlExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sqlstate: None,
            vendor_code: None,
            sql: None,
            source: None,
        }
    }

    /// Is this a unique constraint violation?
    pub fn is_duplicate_key(&self) -> bool {
        // ER_DUP_ENTRY
        self.vendor_code == Some(1062)
    }
}

impl fmt::Display for SqlExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl Error {
    /// Get SQLSTATE if available (e.g., "23000" for an integrity violation)
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Execution(e) => e.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the recorded reason if this is a `NotUpdatable` error.
    pub fn not_updatable_reason(&self) -> Option<&NotUpdatableReason> {
        match self {
            Error::NotUpdatable(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidCursorState(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError::new(message))
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        tracing::error!(error = %err, "lock poisoned by a panicking thread");
        Error::Lock(err.to_string())
    }
}

/// Result type alias for tidewire operations.
pub type Result<T> = std::result::Result<T, Error>;
