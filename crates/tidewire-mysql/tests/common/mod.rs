//! In-memory collaborators shared by the integration tests.
//!
//! `MockConnection` backs the synthesized cursor statements with one table of
//! text rows; `RecordingSession` records every context change a replica-aware
//! session makes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::FixedOffset;

use tidewire_core::{
    ByteArrayRow, Connection, Error, IsolationLevel, MetadataSource, Result, ServerVersion,
    Session, SessionContext, SqlExecutionError, StatementExecutor, UpdateCount, Value,
};
use tidewire_mysql::types::column_flags;
use tidewire_mysql::{ColumnDef, FieldType};

// ==================== Table-backed connection ====================

#[derive(Debug, Default)]
pub struct TableState {
    pub width: usize,
    pub key: Vec<usize>,
    pub auto_increment: Option<usize>,
    pub rows: Vec<Vec<Option<String>>>,
    pub next_id: u64,
    pub prepared: Vec<String>,
    pub executed: Vec<(String, Vec<Value>)>,
    pub closed: Vec<String>,
    /// The refresh SELECT finds nothing
    pub hide_rows: bool,
    /// The next execute call fails with this error
    pub fail_next: Option<SqlExecutionError>,
    /// Session time zone timestamps are stored in; as bound when unset
    pub server_tz: Option<FixedOffset>,
}

impl TableState {
    /// Stored text of a bound parameter.
    fn text(&self, value: &Value) -> Option<String> {
        let value = match (value, self.server_tz) {
            (Value::Timestamp(ts), Some(tz)) => Value::Timestamp(ts.with_timezone(&tz)),
            _ => value.clone(),
        };
        value
            .to_text_bytes()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    fn matches(&self, row: &[Option<String>], keys: &[Value]) -> bool {
        self.key
            .iter()
            .zip(keys)
            .all(|(&i, key)| row[i] == self.text(key))
    }
}

#[derive(Debug, Clone)]
pub struct MockConnection {
    pub state: Arc<Mutex<TableState>>,
    pub quote: Option<String>,
    pub database: Option<String>,
}

impl MockConnection {
    pub fn new(state: TableState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            quote: Some("`".to_string()),
            database: Some("shop".to_string()),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap()
    }
}

impl Connection for MockConnection {
    type Statement = MockStatement;

    fn prepare(&self, sql: &str) -> Result<MockStatement> {
        self.state().prepared.push(sql.to_string());
        Ok(MockStatement {
            sql: sql.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    fn server_version(&self) -> ServerVersion {
        ServerVersion::new(8, 0, 33)
    }

    fn identifier_quote(&self) -> Option<&str> {
        self.quote.as_deref()
    }

    fn database(&self) -> Option<String> {
        self.database.clone()
    }
}

#[derive(Debug)]
pub struct MockStatement {
    sql: String,
    state: Arc<Mutex<TableState>>,
}

impl MockStatement {
    fn begin(&self, params: &[Value]) -> Result<MutexGuard<'_, TableState>> {
        let mut state = self.state.lock().unwrap();
        state.executed.push((self.sql.clone(), params.to_vec()));
        if let Some(err) = state.fail_next.take() {
            return Err(err.into());
        }
        Ok(state)
    }
}

impl StatementExecutor for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute_query(&mut self, params: &[Value]) -> Result<Vec<ByteArrayRow>> {
        let state = self.begin(params)?;
        assert!(self.sql.starts_with("SELECT"), "unexpected query {}", self.sql);
        if state.hide_rows {
            return Ok(Vec::new());
        }
        Ok(state
            .rows
            .iter()
            .filter(|row| state.matches(row, params))
            .map(|row| ByteArrayRow::from_texts(row.iter().cloned()))
            .collect())
    }

    fn execute_update(&mut self, params: &[Value]) -> Result<UpdateCount> {
        let mut state = self.begin(params)?;
        let width = state.width;
        if self.sql.starts_with("UPDATE") {
            let (values, keys) = params.split_at(width);
            let index = state.rows.iter().position(|row| state.matches(row, keys));
            return Ok(match index {
                Some(i) => {
                    let stored = values.iter().map(|v| state.text(v)).collect();
                    state.rows[i] = stored;
                    UpdateCount::new(1)
                }
                None => UpdateCount::new(0),
            });
        }
        if self.sql.starts_with("INSERT") {
            let mut assigned = None;
            let mut row = Vec::with_capacity(width);
            for (i, value) in params.iter().enumerate() {
                if *value == Value::Default && state.auto_increment == Some(i) {
                    let id = state.next_id;
                    state.next_id += 1;
                    assigned = Some(id);
                    row.push(Some(id.to_string()));
                } else {
                    row.push(state.text(value));
                }
            }
            state.rows.push(row);
            let count = UpdateCount::new(1);
            return Ok(assigned.map_or(count, |id| count.with_insert_id(id)));
        }
        if self.sql.starts_with("DELETE") {
            let before = state.rows.len();
            let keep: Vec<_> = state
                .rows
                .iter()
                .filter(|row| !state.matches(row, params))
                .cloned()
                .collect();
            state.rows = keep;
            return Ok(UpdateCount::new((before - state.rows.len()) as u64));
        }
        panic!("unexpected update {}", self.sql);
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().unwrap().closed.push(self.sql.clone());
        Ok(())
    }
}

// ==================== Metadata ====================

#[derive(Debug, Default)]
pub struct FixedMetadata {
    pub keys: Vec<String>,
    pub defaults: HashMap<String, Option<Vec<u8>>>,
}

impl MetadataSource for FixedMetadata {
    fn column_defaults(
        &self,
        _database: Option<&str>,
        _table: &str,
    ) -> Result<HashMap<String, Option<Vec<u8>>>> {
        Ok(self.defaults.clone())
    }

    fn primary_key_columns(&self, _database: Option<&str>, _table: &str) -> Result<Vec<String>> {
        Ok(self.keys.clone())
    }
}

/// A metadata source whose every lookup fails.
#[derive(Debug, Default)]
pub struct FailingMetadata;

impl MetadataSource for FailingMetadata {
    fn column_defaults(
        &self,
        _database: Option<&str>,
        _table: &str,
    ) -> Result<HashMap<String, Option<Vec<u8>>>> {
        Err(Error::Execution(SqlExecutionError::new(
            "information_schema is not readable",
        )))
    }

    fn primary_key_columns(&self, _database: Option<&str>, _table: &str) -> Result<Vec<String>> {
        Ok(vec!["id".to_string()])
    }
}

// ==================== Fixtures ====================

/// `shop.orders (id BIGINT AUTO_INCREMENT PRIMARY KEY, customer VARCHAR,
/// placed TIMESTAMP)`.
pub fn order_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", FieldType::LongLong)
            .from_table("shop", "orders")
            .with_ordinal(0)
            .with_flags(
                column_flags::PRIMARY_KEY | column_flags::AUTO_INCREMENT | column_flags::NOT_NULL,
            ),
        ColumnDef::new("customer", FieldType::VarString)
            .from_table("shop", "orders")
            .with_ordinal(1),
        ColumnDef::new("placed", FieldType::Timestamp)
            .from_table("shop", "orders")
            .with_ordinal(2),
    ]
}

pub fn order_rows() -> Vec<Vec<Option<String>>> {
    vec![
        vec![Some("1".into()), Some("ann".into()), Some("2024-01-01 10:00:00".into())],
        vec![Some("2".into()), Some("bob".into()), None],
        vec![Some("3".into()), Some("cy".into()), Some("2024-03-05 08:30:00".into())],
    ]
}

pub fn order_table() -> TableState {
    TableState {
        width: 3,
        key: vec![0],
        auto_increment: Some(0),
        rows: order_rows(),
        next_id: 10,
        ..TableState::default()
    }
}

pub fn fetched(rows: &[Vec<Option<String>>]) -> Vec<ByteArrayRow> {
    rows.iter()
        .map(|row| ByteArrayRow::from_texts(row.iter().cloned()))
        .collect()
}

// ==================== Recording session ====================

#[derive(Debug, Default)]
pub struct SessionState {
    pub catalog: Option<String>,
    pub auto_commit: bool,
    pub isolation: IsolationLevel,
    pub read_only: bool,
    pub closed: bool,
    pub pings: usize,
    pub fail_ping: bool,
    pub user: Option<String>,
    pub comment: Option<String>,
    /// Setter calls, in order
    pub calls: Vec<String>,
}

#[derive(Debug)]
pub struct RecordingSession {
    pub name: &'static str,
    state: Mutex<SessionState>,
}

impl RecordingSession {
    pub fn new(name: &'static str, state: SessionState) -> Self {
        Self {
            name,
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: String) -> MutexGuard<'_, SessionState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

/// A statement that only remembers which session prepared it.
#[derive(Debug)]
pub struct SessionStatement {
    pub session: &'static str,
    sql: String,
}

impl StatementExecutor for SessionStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn execute_query(&mut self, _params: &[Value]) -> Result<Vec<ByteArrayRow>> {
        Ok(Vec::new())
    }

    fn execute_update(&mut self, _params: &[Value]) -> Result<UpdateCount> {
        Ok(UpdateCount::new(0))
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SessionContext for RecordingSession {
    fn catalog(&self) -> Result<Option<String>> {
        Ok(self.state().catalog.clone())
    }

    fn set_catalog(&self, catalog: Option<&str>) -> Result<()> {
        self.record(format!("set_catalog({catalog:?})")).catalog = catalog.map(str::to_string);
        Ok(())
    }

    fn auto_commit(&self) -> Result<bool> {
        Ok(self.state().auto_commit)
    }

    fn set_auto_commit(&self, auto_commit: bool) -> Result<()> {
        self.record(format!("set_auto_commit({auto_commit})")).auto_commit = auto_commit;
        Ok(())
    }

    fn isolation(&self) -> Result<IsolationLevel> {
        Ok(self.state().isolation)
    }

    fn set_isolation(&self, level: IsolationLevel) -> Result<()> {
        self.record(format!("set_isolation({})", level.as_sql())).isolation = level;
        Ok(())
    }
}

impl Connection for RecordingSession {
    type Statement = SessionStatement;

    fn prepare(&self, sql: &str) -> Result<SessionStatement> {
        Ok(SessionStatement {
            session: self.name,
            sql: sql.to_string(),
        })
    }

    fn server_version(&self) -> ServerVersion {
        ServerVersion::new(8, 0, 33)
    }

    fn database(&self) -> Option<String> {
        self.state().catalog.clone()
    }
}

impl Session for RecordingSession {
    fn set_read_only(&self, read_only: bool) -> Result<()> {
        self.record(format!("set_read_only({read_only})")).read_only = read_only;
        Ok(())
    }

    fn is_read_only(&self) -> Result<bool> {
        Ok(self.state().read_only)
    }

    fn commit(&self) -> Result<()> {
        self.record("commit".to_string());
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.record("rollback".to_string());
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let mut state = self.state();
        state.pings += 1;
        if state.fail_ping {
            return Err(SqlExecutionError::new(format!("{} is gone", self.name)).into());
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.record("close".to_string()).closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn change_user(&self, user: &str, _password: Option<&str>) -> Result<()> {
        self.record(format!("change_user({user})")).user = Some(user.to_string());
        Ok(())
    }

    fn set_session_comment(&self, comment: Option<&str>) -> Result<()> {
        self.record(format!("set_session_comment({comment:?})")).comment =
            comment.map(str::to_string);
        Ok(())
    }
}
