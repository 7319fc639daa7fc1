//! Core types and traits for the tidewire MySQL driver core.
//!
//! This crate provides the foundations the protocol crate builds on:
//!
//! - `Value` and `SqlTime` for decoded column values and bound parameters
//! - `RowSource` / `ByteArrayRow` for undecoded result rows
//! - `Connection`, `StatementExecutor`, `MetadataSource`, `SessionContext` and
//!   `Session` collaborator contracts
//! - `ServerVersion` for version-gated behavior
//! - one crate-wide `Error` type

pub mod connection;
pub mod error;
pub mod row;
pub mod value;
pub mod version;

pub use connection::{
    Connection, IsolationLevel, MetadataSource, Session, SessionContext, StatementExecutor,
    UpdateCount,
};
pub use error::{
    ConfigError, DecodingError, DecodingErrorKind, Error, NotUpdatableReason, Result,
    SqlExecutionError,
};
pub use row::{ByteArrayRow, FromValue, RowSource, WireFormat};
pub use value::{SqlTime, Value};
pub use version::ServerVersion;
