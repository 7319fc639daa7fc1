//! Editable result cursor.
//!
//! A mutable view over a fetched row set. Edits are written back through four
//! synthesized helper statements (UPDATE, INSERT, DELETE and a refresh
//! SELECT) keyed by the projected primary key.
//!
//! # States
//!
//! - **Browsing**: navigating fetched rows.
//! - **PositionedUpdate**: the current row has pending column edits, bound as
//!   UPDATE parameters.
//! - **InsertRow**: a blank shadow row is being filled for an INSERT.
//!
//! Transitions only go Browsing to one of the others and back.
//!
//! # Example
//!
//! ```ignore
//! let cursor = EditableCursor::open(&conn, columns, rows, &config, None)?;
//! cursor.next()?;
//! cursor.update_value(2, "shipped")?;
//! cursor.update_row()?;
//!
//! cursor.move_to_insert_row()?;
//! cursor.update_value(1, "new order")?;
//! cursor.insert_row()?;
//! ```

pub mod binding;
pub mod statements;
pub mod updatability;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tidewire_core::{
    ByteArrayRow, Connection, Error, FromValue, MetadataSource, NotUpdatableReason, Result,
    RowSource, StatementExecutor, Value, WireFormat,
};

use crate::codec::RowCodec;
use crate::config::DriverConfig;
use crate::types::{ColumnDef, SqlType};
pub use statements::{HelperKind, SynthesizedSql, quote_ident};
use statements::HelperStatements;
pub use updatability::TableTarget;

/// Where the cursor is in its edit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    #[default]
    Browsing,
    PositionedUpdate,
    InsertRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(usize),
    AfterLast,
}

impl Position {
    fn from_index(index: i64, len: usize) -> Self {
        match usize::try_from(index) {
            Err(_) => Position::BeforeFirst,
            Ok(i) if i >= len => Position::AfterLast,
            Ok(i) => Position::At(i),
        }
    }

    fn to_index(self, len: usize) -> i64 {
        match self {
            Position::BeforeFirst => -1,
            Position::At(i) => i64::try_from(i).unwrap_or(i64::MAX),
            Position::AfterLast => i64::try_from(len).unwrap_or(i64::MAX),
        }
    }
}

/// Mutable cursor state, guarded by the cursor's lock.
struct Inner<S: StatementExecutor> {
    rows: Vec<ByteArrayRow>,
    position: Position,
    saved_position: Position,
    state: CursorState,
    sql: Option<SynthesizedSql>,
    helpers: HelperStatements<S>,
    /// Pending SET values, one per column
    update_values: Vec<Value>,
    /// Key of the row being updated, as it was before the edits
    update_keys: Vec<Value>,
    insert_values: Vec<Value>,
    insert_shadow: ByteArrayRow,
    defaults: Option<HashMap<String, Option<Vec<u8>>>>,
    closed: bool,
}

impl<S: StatementExecutor> Inner<S> {
    fn current_index(&self) -> Result<usize> {
        match self.position {
            Position::At(i) if i < self.rows.len() => Ok(i),
            _ if self.rows.is_empty() => Err(Error::invalid_state("result set is empty")),
            _ => Err(Error::invalid_state("cursor is not positioned on a row")),
        }
    }

    fn clear_update(&mut self) {
        self.update_values.clear();
        self.update_keys.clear();
    }

    /// Drop pending edits and leave the insert row, back at the saved row.
    fn discard_edits(&mut self) {
        if self.state == CursorState::InsertRow {
            self.position = self.saved_position;
            self.insert_values.clear();
        }
        self.clear_update();
        self.state = CursorState::Browsing;
    }
}

/// An editable view over a materialized result set.
pub struct EditableCursor<C: Connection> {
    connection: C,
    columns: Vec<ColumnDef>,
    codec: RowCodec,
    target: std::result::Result<TableTarget, NotUpdatableReason>,
    metadata: Option<Arc<dyn MetadataSource>>,
    populate_defaults: bool,
    inner: Mutex<Inner<C::Statement>>,
}

impl<C: Connection> fmt::Debug for EditableCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditableCursor")
            .field("columns", &self.columns.len())
            .field("target", &self.target)
            .field("populate_defaults", &self.populate_defaults)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> EditableCursor<C> {
    /// Open a cursor over already fetched rows.
    ///
    /// Updatability is decided here and never revisited. A read-only cursor
    /// still navigates and reads; its mutations fail with the recorded reason.
    #[tracing::instrument(level = "debug", skip_all, fields(columns = columns.len(), rows = rows.len()))]
    pub fn open(
        connection: C,
        columns: Vec<ColumnDef>,
        rows: Vec<ByteArrayRow>,
        config: &DriverConfig,
        metadata: Option<Arc<dyn MetadataSource>>,
    ) -> Result<Self> {
        let codec = RowCodec::new(config)?;
        let target = updatability::analyze(
            &columns,
            connection.database(),
            config.strict_updates,
            metadata.as_deref(),
        )?;
        match &target {
            Ok(t) => tracing::debug!(table = %t.table, key_columns = t.primary_key.len(), "result set is updatable"),
            Err(reason) => tracing::debug!(%reason, "result set is read-only"),
        }
        let width = columns.len();
        Ok(Self {
            connection,
            columns,
            codec,
            target,
            metadata,
            populate_defaults: config.populate_insert_row_defaults,
            inner: Mutex::new(Inner {
                rows,
                position: Position::BeforeFirst,
                saved_position: Position::BeforeFirst,
                state: CursorState::Browsing,
                sql: None,
                helpers: HelperStatements::default(),
                update_values: Vec::new(),
                update_keys: Vec::new(),
                insert_values: Vec::new(),
                insert_shadow: ByteArrayRow::nulls(width),
                defaults: None,
                closed: false,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<C::Statement>>> {
        let inner = self.inner.lock()?;
        if inner.closed {
            return Err(Error::invalid_state("cursor is closed"));
        }
        Ok(inner)
    }

    fn target(&self) -> Result<&TableTarget> {
        self.target
            .as_ref()
            .map_err(|reason| Error::NotUpdatable(reason.clone()))
    }

    fn column(&self, index: usize) -> Result<&ColumnDef> {
        self.columns.get(index).ok_or_else(|| {
            Error::invalid_state(format!(
                "column index {index} out of range for {} columns",
                self.columns.len()
            ))
        })
    }

    // ==================== Accessors ====================

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Index of the column with the given label, case-insensitively.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn is_updatable(&self) -> bool {
        self.target.is_ok()
    }

    pub fn not_updatable_reason(&self) -> Option<&NotUpdatableReason> {
        self.target.as_ref().err()
    }

    /// The table edits are written to, when the cursor is editable.
    pub fn table_target(&self) -> Option<&TableTarget> {
        self.target.as_ref().ok()
    }

    pub fn codec(&self) -> &RowCodec {
        &self.codec
    }

    pub fn state(&self) -> Result<CursorState> {
        Ok(self.lock()?.state)
    }

    /// The helper statement texts, once a mutation has synthesized them.
    pub fn synthesized_sql(&self) -> Result<Option<SynthesizedSql>> {
        Ok(self.lock()?.sql.clone())
    }

    /// Decoded value of a column on the current row, or on the insert row
    /// while it is being filled.
    pub fn get_value(&self, index: usize) -> Result<Value> {
        let column = self.column(index)?;
        let inner = self.lock()?;
        let row = if inner.state == CursorState::InsertRow {
            &inner.insert_shadow
        } else {
            &inner.rows[inner.current_index()?]
        };
        Ok(self.codec.decode_column(row, index, column)?)
    }

    /// Typed value of a column on the current row.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T> {
        T::from_value(&self.get_value(index)?)
    }

    // ==================== Navigation ====================

    fn navigate(&self, to: impl FnOnce(Position, usize) -> Position) -> Result<bool> {
        let mut inner = self.lock()?;
        inner.discard_edits();
        let len = inner.rows.len();
        inner.position = to(inner.position, len);
        Ok(matches!(inner.position, Position::At(_)))
    }

    fn relative(&self, delta: i64) -> Result<bool> {
        self.navigate(|pos, len| Position::from_index(pos.to_index(len).saturating_add(delta), len))
    }

    /// Advance to the next row; `false` once past the last row.
    pub fn next(&self) -> Result<bool> {
        self.relative(1)
    }

    pub fn previous(&self) -> Result<bool> {
        self.relative(-1)
    }

    pub fn first(&self) -> Result<bool> {
        self.absolute(1)
    }

    pub fn last(&self) -> Result<bool> {
        self.absolute(-1)
    }

    /// Move to a 1-based row number; negative numbers count from the end and
    /// zero moves before the first row.
    pub fn absolute(&self, row: i64) -> Result<bool> {
        self.navigate(|_, len| {
            let len_i = i64::try_from(len).unwrap_or(i64::MAX);
            match row {
                0 => Position::BeforeFirst,
                r if r > 0 => Position::from_index(r - 1, len),
                r => Position::from_index(len_i.saturating_add(r), len),
            }
        })
    }

    pub fn before_first(&self) -> Result<()> {
        self.navigate(|_, _| Position::BeforeFirst).map(|_| ())
    }

    pub fn after_last(&self) -> Result<()> {
        self.navigate(|_, _| Position::AfterLast).map(|_| ())
    }

    /// 1-based number of the current row, `None` off the rows.
    pub fn row_number(&self) -> Result<Option<usize>> {
        let inner = self.lock()?;
        Ok(match inner.position {
            Position::At(i) if inner.state != CursorState::InsertRow => Some(i + 1),
            _ => None,
        })
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.lock()?.rows.len())
    }

    pub fn is_before_first(&self) -> Result<bool> {
        let inner = self.lock()?;
        Ok(inner.position == Position::BeforeFirst && !inner.rows.is_empty())
    }

    pub fn is_after_last(&self) -> Result<bool> {
        let inner = self.lock()?;
        Ok(inner.position == Position::AfterLast && !inner.rows.is_empty())
    }

    // ==================== Statement plumbing ====================

    fn helper<'a>(
        &self,
        inner: &'a mut Inner<C::Statement>,
        kind: HelperKind,
    ) -> Result<&'a mut C::Statement> {
        let target = self.target()?;
        let sql = inner.sql.get_or_insert_with(|| {
            let sql = SynthesizedSql::build(self.connection.identifier_quote(), target, &self.columns);
            tracing::debug!(
                update = %sql.update,
                insert = %sql.insert,
                delete = %sql.delete,
                refresh = %sql.refresh,
                "synthesized cursor statements"
            );
            sql
        });
        inner
            .helpers
            .get_or_prepare(&self.connection, kind, sql.text(kind))
    }

    fn bind_row(&self, row: &dyn RowSource) -> Result<Vec<Value>> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, c)| binding::bind_column(&self.codec, c, i, row.bytes(i), row.wire_format()))
            .collect()
    }

    fn key_params(&self, target: &TableTarget, row: &dyn RowSource) -> Result<Vec<Value>> {
        target
            .primary_key
            .iter()
            .map(|&i| {
                binding::bind_column(&self.codec, &self.columns[i], i, row.bytes(i), row.wire_format())
            })
            .collect()
    }

    fn fetch_row(&self, inner: &mut Inner<C::Statement>, keys: &[Value]) -> Result<Option<ByteArrayRow>> {
        let rows = self.helper(inner, HelperKind::Refresher)?.execute_query(keys)?;
        Ok(rows.into_iter().next())
    }

    /// Re-bind the current row as UPDATE parameters.
    fn sync_update(&self, inner: &mut Inner<C::Statement>, target: &TableTarget, index: usize) -> Result<()> {
        let row = &inner.rows[index];
        inner.update_values = self.bind_row(row)?;
        inner.update_keys = self.key_params(target, row)?;
        Ok(())
    }

    // ==================== Mutation ====================

    /// Set a column value.
    ///
    /// On a fetched row the first edit enters positioned-update mode; on the
    /// insert row the value's text form is also written to the shadow row.
    pub fn update_value(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let target = self.target()?;
        self.column(index)?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        match inner.state {
            CursorState::InsertRow => {
                inner.insert_shadow.set(index, self.codec.server_text(&value));
                inner.insert_values[index] = value;
            }
            CursorState::Browsing => {
                let row = inner.current_index()?;
                self.sync_update(inner, target, row)?;
                inner.state = CursorState::PositionedUpdate;
                tracing::debug!(row = row + 1, "entering positioned update");
                inner.update_values[index] = value;
            }
            CursorState::PositionedUpdate => {
                inner.update_values[index] = value;
            }
        }
        Ok(())
    }

    pub fn update_null(&self, index: usize) -> Result<()> {
        self.update_value(index, Value::Null)
    }

    /// Write pending edits of the current row back to the table.
    ///
    /// The row is refreshed from the server afterwards and the cursor stays
    /// positioned with parameters re-bound from it, so repeating the call
    /// without new edits writes the same values again. With no pending edits
    /// this is a no-op.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn update_row(&self) -> Result<()> {
        let target = self.target()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        match inner.state {
            CursorState::InsertRow => Err(Error::invalid_state(
                "cannot update the insert row, use insert_row",
            )),
            CursorState::Browsing => inner.current_index().map(|_| ()),
            CursorState::PositionedUpdate => {
                let index = inner.current_index()?;
                let mut params = inner.update_values.clone();
                params.extend(inner.update_keys.iter().cloned());
                let count = self.helper(inner, HelperKind::Updater)?.execute_update(&params)?;
                tracing::debug!(affected = count.affected_rows, row = index + 1, "row updated");

                let keys: Vec<Value> = target
                    .primary_key
                    .iter()
                    .map(|&i| inner.update_values[i].clone())
                    .collect();
                let fresh = match self.fetch_row(inner, &keys)? {
                    Some(row) => row,
                    None => text_row(&self.codec, &inner.update_values),
                };
                inner.rows[index] = fresh;
                self.sync_update(inner, target, index)
            }
        }
    }

    /// Discard pending positioned edits without touching the table.
    pub fn cancel_row_updates(&self) -> Result<()> {
        self.target()?;
        let mut inner = self.lock()?;
        match inner.state {
            CursorState::PositionedUpdate => {
                inner.clear_update();
                inner.state = CursorState::Browsing;
                Ok(())
            }
            CursorState::InsertRow => Err(Error::invalid_state(
                "cannot cancel row updates on the insert row",
            )),
            CursorState::Browsing => Err(Error::invalid_state("no row updates to cancel")),
        }
    }

    /// Delete the current row from the table and from the cursor.
    ///
    /// The cursor ends up on the row before the deleted one, or before the
    /// first row when the first row was deleted.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn delete_row(&self) -> Result<()> {
        let target = self.target()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if inner.state == CursorState::InsertRow {
            return Err(Error::invalid_state("cannot delete the insert row"));
        }
        let index = inner.current_index()?;
        let keys = self.key_params(target, &inner.rows[index])?;
        let count = self.helper(inner, HelperKind::Deleter)?.execute_update(&keys)?;

        inner.rows.remove(index);
        inner.clear_update();
        inner.state = CursorState::Browsing;
        inner.position = match index.checked_sub(1) {
            Some(previous) => Position::At(previous),
            None => Position::BeforeFirst,
        };
        tracing::debug!(affected = count.affected_rows, remaining = inner.rows.len(), "row deleted");
        Ok(())
    }

    /// Re-read the current row from the table, discarding pending edits.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn refresh_row(&self) -> Result<()> {
        let target = self.target()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if inner.state == CursorState::InsertRow {
            return Err(Error::invalid_state("cannot refresh the insert row"));
        }
        let index = inner.current_index()?;
        inner.clear_update();
        inner.state = CursorState::Browsing;

        let keys = self.key_params(target, &inner.rows[index])?;
        match self.fetch_row(inner, &keys)? {
            Some(row) => {
                inner.rows[index].overwrite_from(&row);
                Ok(())
            }
            None => Err(Error::invalid_state(
                "row no longer exists in the table",
            )),
        }
    }

    // ==================== Insert row ====================

    /// Move to a blank insert row, remembering the current position.
    ///
    /// Each column starts as `DEFAULT`, or with the table's server default
    /// when insert-row defaults are enabled.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn move_to_insert_row(&self) -> Result<()> {
        let target = self.target()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;

        if self.populate_defaults && inner.defaults.is_none() {
            if let Some(metadata) = &self.metadata {
                let fetched = metadata.column_defaults(target.database.as_deref(), &target.table)?;
                inner.defaults = Some(fetched);
            } else {
                tracing::debug!("no metadata source, insert row starts with DEFAULT");
            }
        }

        let defaults = inner.defaults.as_ref().filter(|_| self.populate_defaults);
        let mut shadow = ByteArrayRow::nulls(self.columns.len());
        let mut values = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let value = match defaults.map(|d| lookup_default(d, column.origin_name())) {
                None | Some(None) => Value::Default,
                Some(Some(None)) => Value::Null,
                Some(Some(Some(bytes))) if is_expression_default(column, bytes) => {
                    Value::Raw(bytes.clone())
                }
                Some(Some(Some(bytes))) => {
                    shadow.set(i, Some(bytes.clone()));
                    if column.is_binary() {
                        Value::Bytes(bytes.clone())
                    } else {
                        Value::Text(
                            self.codec
                                .catalog()
                                .decode_str(self.codec.encoding_for(column), bytes)
                                .map_err(|e| e.at_column(i))?,
                        )
                    }
                }
            };
            values.push(value);
        }

        // nothing below can fail
        if inner.state != CursorState::InsertRow {
            inner.saved_position = inner.position;
        }
        inner.clear_update();
        inner.insert_values = values;
        inner.insert_shadow = shadow;
        inner.state = CursorState::InsertRow;
        Ok(())
    }

    /// Leave the insert row and return to the remembered position.
    pub fn move_to_current_row(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.state == CursorState::InsertRow {
            inner.discard_edits();
        }
        Ok(())
    }

    /// Insert the insert row into the table and append it to the cursor.
    ///
    /// A server-assigned auto-increment id is written back into its column,
    /// then the row is re-read by primary key. When the re-read finds
    /// nothing, the locally known values are kept.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn insert_row(&self) -> Result<()> {
        let target = self.target()?;
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        if inner.state != CursorState::InsertRow {
            return Err(Error::invalid_state("not on the insert row"));
        }
        let params = inner.insert_values.clone();
        let count = self.helper(inner, HelperKind::Inserter)?.execute_update(&params)?;

        if let Some(id) = count.last_insert_id {
            if let Some(i) = self.columns.iter().position(ColumnDef::is_auto_increment) {
                let text = id.to_string().into_bytes();
                inner.insert_shadow.set(i, Some(text.clone()));
                inner.insert_values[i] = Value::Raw(text);
                tracing::debug!(column = %self.columns[i].name, id, "back-filled auto-increment id");
            }
        }

        let keys = target
            .primary_key
            .iter()
            .map(|&i| match &inner.insert_values[i] {
                Value::Default => binding::bind_column(
                    &self.codec,
                    &self.columns[i],
                    i,
                    inner.insert_shadow.bytes(i),
                    inner.insert_shadow.wire_format(),
                ),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        let row = match self.fetch_row(inner, &keys)? {
            Some(row) => row,
            None => {
                tracing::debug!("inserted row not found on re-read, keeping local values");
                inner.insert_shadow.clone()
            }
        };
        inner.rows.push(row);
        inner.discard_edits();
        tracing::debug!(rows = inner.rows.len(), "row inserted");
        Ok(())
    }

    // ==================== Lifecycle ====================

    /// Release every helper statement. Later calls are no-ops; other
    /// operations fail once closed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        inner.helpers.close_all()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map_or(true, |inner| inner.closed)
    }
}

impl<C: Connection> Drop for EditableCursor<C> {
    fn drop(&mut self) {
        let inner = match self.inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !inner.closed {
            inner.closed = true;
            // failures are already logged
            let _ = inner.helpers.close_all();
        }
    }
}

fn text_row(codec: &RowCodec, values: &[Value]) -> ByteArrayRow {
    ByteArrayRow::with_format(
        values.iter().map(|v| codec.server_text(v)).collect(),
        WireFormat::Text,
    )
}

fn lookup_default<'a>(
    defaults: &'a HashMap<String, Option<Vec<u8>>>,
    column: &str,
) -> Option<&'a Option<Vec<u8>>> {
    defaults.get(column).or_else(|| {
        defaults
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })
}

/// A temporal default such as `CURRENT_TIMESTAMP` is an expression, not a
/// literal, and is inlined as-is.
fn is_expression_default(column: &ColumnDef, default: &[u8]) -> bool {
    matches!(
        column.declared_type(false),
        SqlType::Timestamp | SqlType::Date | SqlType::Time
    ) && default.len() >= 8
        && default[..8].eq_ignore_ascii_case(b"CURRENT_")
}
