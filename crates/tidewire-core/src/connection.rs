//! Collaborator contracts.
//!
//! The driver core never talks to a socket. Everything it needs from the
//! outside world goes through the narrow traits in this module:
//!
//! - [`StatementExecutor`] - runs one prepared SQL text with bound parameters
//! - [`Connection`] - prepares statements and reports server capabilities
//! - [`MetadataSource`] - table defaults and live primary keys
//! - [`SessionContext`] - catalog, autocommit and isolation state
//! - [`Session`] - a full session: context, connection and lifecycle
//!
//! All methods take `&self`; implementations that hold mutable state are
//! expected to guard it internally, the way a synchronous driver connection
//! guards its handle with a mutex.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::row::ByteArrayRow;
use crate::value::Value;
use crate::version::ServerVersion;

/// Transaction isolation level.
///
/// Defines the degree to which one transaction must be isolated from
/// resource or data modifications made by other concurrent transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// Dirty reads, non-repeatable reads and phantoms all possible.
    ReadUncommitted,

    /// Only committed changes from others are visible.
    ReadCommitted,

    /// Consistent snapshot for the whole transaction. The server default.
    #[default]
    RepeatableRead,

    /// Transactions appear to execute sequentially.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    /// Parse either the SQL form (`READ COMMITTED`) or the system variable
    /// form (`READ-COMMITTED`), case-insensitively.
    pub fn from_sql(text: &str) -> Option<Self> {
        let normalized = text.trim().to_ascii_uppercase().replace('-', " ");
        match normalized.as_str() {
            "READ UNCOMMITTED" => Some(IsolationLevel::ReadUncommitted),
            "READ COMMITTED" => Some(IsolationLevel::ReadCommitted),
            "REPEATABLE READ" => Some(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Some(IsolationLevel::Serializable),
            _ => None,
        }
    }
}

/// Outcome of a data-modifying statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateCount {
    pub affected_rows: u64,
    /// Server-assigned auto-increment id, when the statement produced one
    pub last_insert_id: Option<u64>,
}

impl UpdateCount {
    pub const fn new(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            last_insert_id: None,
        }
    }

    #[must_use]
    pub const fn with_insert_id(mut self, id: u64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A prepared statement bound to one SQL text.
///
/// Errors returned from the execute methods reach the caller unchanged.
pub trait StatementExecutor: Send {
    /// The SQL text this statement was prepared from.
    fn sql(&self) -> &str;

    /// Run a query and materialize its rows.
    ///
    /// Rows come back in select-list order.
    fn execute_query(&mut self, params: &[Value]) -> Result<Vec<ByteArrayRow>>;

    /// Run a data-modifying statement.
    fn execute_update(&mut self, params: &[Value]) -> Result<UpdateCount>;

    /// Release the server-side statement. Called at most once by the core.
    fn close(&mut self) -> Result<()>;
}

/// Prepares statements and reports what the server supports.
pub trait Connection: Send + Sync {
    type Statement: StatementExecutor;

    /// Prepare a statement for repeated execution.
    fn prepare(&self, sql: &str) -> Result<Self::Statement>;

    /// Version of the connected server.
    fn server_version(&self) -> ServerVersion;

    /// Identifier quote string, `None` when the server cannot quote identifiers.
    fn identifier_quote(&self) -> Option<&str> {
        Some("`")
    }

    /// Current default database.
    fn database(&self) -> Option<String>;
}

/// Schema facts the editable cursor needs beyond result-set metadata.
pub trait MetadataSource: Send + Sync {
    /// Server default of every column in a table, keyed by column name.
    ///
    /// A `None` value means the column's default is NULL.
    fn column_defaults(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<HashMap<String, Option<Vec<u8>>>>;

    /// Names of the table's primary-key columns, in key order.
    fn primary_key_columns(&self, database: Option<&str>, table: &str) -> Result<Vec<String>>;
}

/// Transactional context that must follow traffic across a session swap.
pub trait SessionContext {
    fn catalog(&self) -> Result<Option<String>>;

    fn set_catalog(&self, catalog: Option<&str>) -> Result<()>;

    fn auto_commit(&self) -> Result<bool>;

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()>;

    fn isolation(&self) -> Result<IsolationLevel>;

    fn set_isolation(&self, level: IsolationLevel) -> Result<()>;
}

/// A complete session: connection, transactional context and lifecycle.
pub trait Session: SessionContext + Connection {
    fn set_read_only(&self, read_only: bool) -> Result<()>;

    fn is_read_only(&self) -> Result<bool>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Cheap liveness probe.
    fn ping(&self) -> Result<()>;

    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;

    /// Re-authenticate as another user on the same session.
    fn change_user(&self, user: &str, password: Option<&str>) -> Result<()>;

    /// Attach a free-form comment to the session, as seen by the server.
    fn set_session_comment(&self, comment: Option<&str>) -> Result<()>;
}

impl<T: Connection> Connection for &T {
    type Statement = T::Statement;

    fn prepare(&self, sql: &str) -> Result<Self::Statement> {
        (**self).prepare(sql)
    }

    fn server_version(&self) -> ServerVersion {
        (**self).server_version()
    }

    fn identifier_quote(&self) -> Option<&str> {
        (**self).identifier_quote()
    }

    fn database(&self) -> Option<String> {
        (**self).database()
    }
}

impl<T: Connection> Connection for Arc<T> {
    type Statement = T::Statement;

    fn prepare(&self, sql: &str) -> Result<Self::Statement> {
        (**self).prepare(sql)
    }

    fn server_version(&self) -> ServerVersion {
        (**self).server_version()
    }

    fn identifier_quote(&self) -> Option<&str> {
        (**self).identifier_quote()
    }

    fn database(&self) -> Option<String> {
        (**self).database()
    }
}
