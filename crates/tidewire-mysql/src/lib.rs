//! MySQL driver core for tidewire.
//!
//! Everything between raw result bytes and the application, without a
//! transport. It provides:
//!
//! - A compiled-in charset/collation catalog with version-gated charset
//!   negotiation
//! - Result set packet parsing (column definitions, text and binary rows)
//! - A row codec turning raw column bytes into typed values under the
//!   configured zero-date and datetime policies
//! - An editable cursor that writes row edits back through synthesized
//!   UPDATE/INSERT/DELETE statements
//! - A replica-aware session that routes between a primary and a replica pool
//!
//! Statement execution and session state come from the collaborator traits in
//! `tidewire_core`.
//!
//! # Example
//!
//! ```rust,ignore
//! use tidewire_mysql::{DriverConfig, EditableCursor, RowCodec};
//!
//! let config = DriverConfig::from_url(
//!     "mysql://app@db:3306/shop?zeroDateTimeBehavior=convertToNull&useTimezone=true",
//! )?;
//! let codec = RowCodec::new(&config)?;
//! let values = codec.decode_row(&row, &columns)?;
//!
//! let cursor = EditableCursor::open(&conn, columns, rows, &config, None)?;
//! ```

pub mod charset;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod protocol;
pub mod replication;
pub mod types;

pub use charset::{CharsetCandidate, CharsetCatalog, CollationEntry};
pub use codec::{ColumnResult, RowCodec};
pub use config::{DateTimePolicy, DriverConfig, ReplicationUrl, ZeroDateTimeBehavior};
pub use cursor::{CursorState, EditableCursor, SynthesizedSql, TableTarget};
pub use protocol::{PacketReader, parse_binary_row, parse_column_def, parse_text_row};
pub use replication::{ActiveSide, ReplicaAwareSession};
pub use types::{ColumnDef, FieldType, SqlType};
