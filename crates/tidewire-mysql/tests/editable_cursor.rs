//! Editable cursor against a table-backed mock connection.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use common::{
    FailingMetadata, FixedMetadata, MockConnection, TableState, fetched, order_columns, order_rows,
    order_table,
};
use tidewire_core::{Error, MetadataSource, NotUpdatableReason, SqlExecutionError, Value};
use tidewire_mysql::types::column_flags;
use tidewire_mysql::{
    ColumnDef, CursorState, DateTimePolicy, DriverConfig, EditableCursor, FieldType,
};

fn open(conn: &MockConnection) -> EditableCursor<&MockConnection> {
    let rows = fetched(&conn.state().rows);
    EditableCursor::open(conn, order_columns(), rows, &DriverConfig::new(), None).unwrap()
}

fn executed_kinds(conn: &MockConnection) -> Vec<String> {
    conn.state()
        .executed
        .iter()
        .map(|(sql, _)| sql.split_whitespace().next().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_two_tables_are_never_updatable() {
    let conn = MockConnection::new(order_table());
    let mut columns = order_columns();
    columns[1] = ColumnDef::new("name", FieldType::VarString)
        .from_table("shop", "customers")
        .with_flags(column_flags::PRIMARY_KEY);
    let cursor =
        EditableCursor::open(&conn, columns, fetched(&order_rows()), &DriverConfig::new(), None)
            .unwrap();

    assert!(!cursor.is_updatable());
    assert_eq!(
        cursor.not_updatable_reason(),
        Some(&NotUpdatableReason::MultipleTables)
    );

    // reading still works
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get::<i64>(0).unwrap(), 1);

    let err = cursor.update_value(1, "zed").unwrap_err();
    assert!(matches!(err, Error::NotUpdatable(NotUpdatableReason::MultipleTables)));
    assert!(matches!(cursor.delete_row(), Err(Error::NotUpdatable(_))));
    assert!(matches!(cursor.move_to_insert_row(), Err(Error::NotUpdatable(_))));
    assert!(conn.state().prepared.is_empty());
}

#[test]
fn test_update_row_writes_back_and_stays_positioned() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    assert!(cursor.next().unwrap());

    cursor.update_value(1, "anne").unwrap();
    assert_eq!(cursor.state().unwrap(), CursorState::PositionedUpdate);
    // the stored row is untouched until update_row
    assert_eq!(cursor.get::<String>(1).unwrap(), "ann");

    cursor.update_row().unwrap();
    assert_eq!(cursor.get::<String>(1).unwrap(), "anne");
    assert_eq!(conn.state().rows[0][1].as_deref(), Some("anne"));

    let sql = cursor.synthesized_sql().unwrap().unwrap();
    assert_eq!(
        sql.update,
        "UPDATE `shop`.`orders` SET `id` = ?, `customer` = ?, `placed` = ? WHERE `id` <=> ?"
    );

    // repeating without edits writes the same values again
    cursor.update_row().unwrap();
    let state = conn.state();
    let updates: Vec<&Vec<Value>> = state
        .executed
        .iter()
        .filter(|(sql, _)| sql.starts_with("UPDATE"))
        .map(|(_, params)| params)
        .collect();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0], updates[1]);
    assert_eq!(updates[0][1], Value::Text("anne".to_string()));
    assert_eq!(updates[0][3], Value::BigInt(1));
}

#[test]
fn test_update_binds_timestamps_and_nulls() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    cursor.absolute(2).unwrap();
    cursor.update_value(1, "robert").unwrap();
    cursor.update_row().unwrap();

    let state = conn.state();
    let (_, params) = state
        .executed
        .iter()
        .find(|(sql, _)| sql.starts_with("UPDATE"))
        .unwrap();
    assert_eq!(params[0], Value::BigInt(2));
    assert_eq!(params[2], Value::Null);
    drop(state);

    cursor.first().unwrap();
    cursor.update_value(1, "annie").unwrap();
    cursor.update_row().unwrap();
    let state = conn.state();
    let (_, params) = state
        .executed
        .iter()
        .rfind(|(sql, _)| sql.starts_with("UPDATE"))
        .unwrap();
    assert!(matches!(params[2], Value::Timestamp(_)));
}

#[test]
fn test_insert_row_back_fills_auto_increment() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    assert!(cursor.next().unwrap());

    cursor.move_to_insert_row().unwrap();
    assert_eq!(cursor.state().unwrap(), CursorState::InsertRow);
    cursor.update_value(1, "dee").unwrap();
    assert_eq!(cursor.get::<String>(1).unwrap(), "dee");
    cursor.insert_row().unwrap();

    let (insert_sql, insert_params) = conn
        .state()
        .executed
        .iter()
        .find(|(sql, _)| sql.starts_with("INSERT"))
        .cloned()
        .unwrap();
    assert_eq!(
        insert_sql,
        "INSERT INTO `shop`.`orders` (`id`, `customer`, `placed`) VALUES (?, ?, ?)"
    );
    assert_eq!(
        insert_params,
        vec![Value::Default, Value::Text("dee".to_string()), Value::Default]
    );

    // back at the saved row
    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert_eq!(cursor.row_number().unwrap(), Some(1));
    assert_eq!(cursor.row_count().unwrap(), 4);

    assert!(cursor.last().unwrap());
    assert_eq!(cursor.get::<i64>(0).unwrap(), 10);
    cursor.refresh_row().unwrap();
    assert_eq!(cursor.get::<i64>(0).unwrap(), 10);
    assert_eq!(cursor.get::<String>(1).unwrap(), "dee");
}

#[test]
fn test_insert_row_keeps_local_values_when_reread_misses() {
    let conn = MockConnection::new(TableState {
        hide_rows: true,
        ..order_table()
    });
    let cursor = open(&conn);
    cursor.move_to_insert_row().unwrap();
    cursor.update_value(1, "eve").unwrap();
    cursor.insert_row().unwrap();

    assert!(cursor.last().unwrap());
    assert_eq!(cursor.get::<i64>(0).unwrap(), 10);
    assert_eq!(cursor.get::<String>(1).unwrap(), "eve");
    assert_eq!(cursor.get_value(2).unwrap(), Value::Null);
}

#[test]
fn test_insert_row_with_server_defaults() {
    let conn = MockConnection::new(order_table());
    let mut defaults = HashMap::new();
    defaults.insert("customer".to_string(), Some(b"walk-in".to_vec()));
    defaults.insert("placed".to_string(), Some(b"CURRENT_TIMESTAMP".to_vec()));
    let metadata: Arc<dyn MetadataSource> = Arc::new(FixedMetadata {
        keys: vec!["id".to_string()],
        defaults,
    });
    let config = DriverConfig::new().populate_insert_row_defaults(true);
    let cursor =
        EditableCursor::open(&conn, order_columns(), fetched(&order_rows()), &config, Some(metadata))
            .unwrap();

    cursor.move_to_insert_row().unwrap();
    assert_eq!(cursor.get::<String>(1).unwrap(), "walk-in");
    assert_eq!(cursor.get_value(0).unwrap(), Value::Null);
    cursor.insert_row().unwrap();

    let state = conn.state();
    let (_, params) = state
        .executed
        .iter()
        .find(|(sql, _)| sql.starts_with("INSERT"))
        .unwrap();
    assert_eq!(params[0], Value::Default);
    assert_eq!(params[1], Value::Text("walk-in".to_string()));
    assert_eq!(params[2], Value::Raw(b"CURRENT_TIMESTAMP".to_vec()));
}

#[test]
fn test_move_to_current_row_discards_insert() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    cursor.absolute(3).unwrap();
    cursor.move_to_insert_row().unwrap();
    cursor.update_value(1, "ghost").unwrap();
    cursor.move_to_current_row().unwrap();

    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert_eq!(cursor.row_number().unwrap(), Some(3));
    assert!(matches!(cursor.insert_row(), Err(Error::InvalidCursorState(_))));
    assert_eq!(conn.state().rows.len(), 3);
}

#[test]
fn test_delete_row_moves_to_preceding_row() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    assert!(cursor.absolute(2).unwrap());

    cursor.delete_row().unwrap();
    assert_eq!(cursor.row_count().unwrap(), 2);
    assert_eq!(conn.state().rows.len(), 2);
    assert_eq!(cursor.row_number().unwrap(), Some(1));
    assert_eq!(cursor.get::<i64>(0).unwrap(), 1);

    // deleting the first row leaves the cursor before the first row
    cursor.delete_row().unwrap();
    assert!(cursor.is_before_first().unwrap());
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.get::<i64>(0).unwrap(), 3);

    let state = conn.state();
    let deletes: Vec<&Vec<Value>> = state
        .executed
        .iter()
        .filter(|(sql, _)| sql.starts_with("DELETE"))
        .map(|(_, params)| params)
        .collect();
    assert_eq!(deletes, vec![&vec![Value::BigInt(2)], &vec![Value::BigInt(1)]]);
}

#[test]
fn test_delete_row_rejects_invalid_positions() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    assert!(matches!(cursor.delete_row(), Err(Error::InvalidCursorState(_))));

    cursor.move_to_insert_row().unwrap();
    assert!(matches!(cursor.delete_row(), Err(Error::InvalidCursorState(_))));

    let empty = MockConnection::new(TableState {
        rows: Vec::new(),
        ..order_table()
    });
    let cursor = open(&empty);
    assert!(!cursor.next().unwrap());
    assert!(matches!(cursor.delete_row(), Err(Error::InvalidCursorState(_))));
}

#[test]
fn test_cancel_row_updates_only_when_positioned() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    cursor.next().unwrap();
    assert!(matches!(cursor.cancel_row_updates(), Err(Error::InvalidCursorState(_))));

    cursor.update_value(1, "nobody").unwrap();
    cursor.cancel_row_updates().unwrap();
    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert_eq!(cursor.get::<String>(1).unwrap(), "ann");
    assert!(executed_kinds(&conn).is_empty());

    cursor.move_to_insert_row().unwrap();
    assert!(matches!(cursor.cancel_row_updates(), Err(Error::InvalidCursorState(_))));
}

#[test]
fn test_refresh_row_reads_server_state() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    cursor.next().unwrap();
    conn.state().rows[0][1] = Some("changed elsewhere".to_string());

    cursor.update_value(1, "pending").unwrap();
    cursor.refresh_row().unwrap();
    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert_eq!(cursor.get::<String>(1).unwrap(), "changed elsewhere");

    conn.state().rows.remove(0);
    assert!(matches!(cursor.refresh_row(), Err(Error::InvalidCursorState(_))));

    cursor.move_to_insert_row().unwrap();
    assert!(matches!(cursor.refresh_row(), Err(Error::InvalidCursorState(_))));
}

#[test]
fn test_navigation_discards_pending_edits() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    assert!(cursor.is_before_first().unwrap());
    assert_eq!(cursor.row_number().unwrap(), None);

    cursor.next().unwrap();
    cursor.update_value(1, "dropped").unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert!(cursor.previous().unwrap());
    assert_eq!(cursor.get::<String>(1).unwrap(), "ann");

    assert!(cursor.absolute(-1).unwrap());
    assert_eq!(cursor.row_number().unwrap(), Some(3));
    assert!(!cursor.next().unwrap());
    assert!(cursor.is_after_last().unwrap());
    assert!(cursor.previous().unwrap());
    assert!(!cursor.absolute(7).unwrap());
    assert!(!cursor.absolute(0).unwrap());
    cursor.after_last().unwrap();
    assert!(cursor.is_after_last().unwrap());
    cursor.before_first().unwrap();
    assert!(matches!(cursor.get_value(0), Err(Error::InvalidCursorState(_))));
    assert!(executed_kinds(&conn).is_empty());
}

#[test]
fn test_helper_statements_closed_exactly_once() {
    let conn = MockConnection::new(order_table());
    {
        let cursor = open(&conn);
        cursor.next().unwrap();
        cursor.update_value(1, "x").unwrap();
        cursor.update_row().unwrap();
        cursor.delete_row().unwrap();
        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next(), Err(Error::InvalidCursorState(_))));
    }
    let mut closed = conn.state().closed.clone();
    closed.sort();
    let mut prepared = conn.state().prepared.clone();
    prepared.sort();
    assert_eq!(prepared.len(), 3);
    assert_eq!(closed, prepared);

    // dropping without close releases too
    let conn = MockConnection::new(order_table());
    {
        let cursor = open(&conn);
        cursor.move_to_insert_row().unwrap();
        cursor.insert_row().unwrap();
    }
    assert_eq!(conn.state().closed.len(), 2);
}

#[test]
fn test_execution_errors_pass_through() {
    let conn = MockConnection::new(order_table());
    let cursor = open(&conn);
    cursor.next().unwrap();
    cursor.update_value(1, "dup").unwrap();

    let mut failure = SqlExecutionError::new("Duplicate entry 'dup' for key 'customer'");
    failure.sqlstate = Some("23000".to_string());
    failure.vendor_code = Some(1062);
    conn.state().fail_next = Some(failure);

    let err = cursor.update_row().unwrap_err();
    assert_eq!(err.sqlstate(), Some("23000"));
    match err {
        Error::Execution(e) => {
            assert!(e.is_duplicate_key());
            assert_eq!(e.vendor_code, Some(1062));
        }
        other => panic!("unexpected error {other:?}"),
    }
    // still positioned with the edit pending
    assert_eq!(cursor.state().unwrap(), CursorState::PositionedUpdate);
}

#[test]
fn test_strict_updates_check_live_primary_key() {
    let conn = MockConnection::new(order_table());
    let metadata: Arc<dyn MetadataSource> = Arc::new(FixedMetadata {
        keys: vec!["id".to_string(), "region".to_string()],
        defaults: HashMap::new(),
    });
    let cursor = EditableCursor::open(
        &conn,
        order_columns(),
        fetched(&order_rows()),
        &DriverConfig::new(),
        Some(Arc::clone(&metadata)),
    )
    .unwrap();
    assert!(matches!(
        cursor.not_updatable_reason(),
        Some(NotUpdatableReason::PrimaryKeyMismatch { .. })
    ));

    let lenient = EditableCursor::open(
        &conn,
        order_columns(),
        fetched(&order_rows()),
        &DriverConfig::new().strict_updates(false),
        Some(metadata),
    )
    .unwrap();
    assert!(lenient.is_updatable());
}

#[test]
fn test_unquoted_identifiers_without_server_quoting() {
    let mut conn = MockConnection::new(order_table());
    conn.quote = None;
    let cursor = open(&conn);
    cursor.next().unwrap();
    cursor.delete_row().unwrap();
    let sql = cursor.synthesized_sql().unwrap().unwrap();
    assert_eq!(sql.delete, "DELETE FROM shop.orders WHERE id <=> ?");
}

#[test]
fn test_cursor_over_arc_connection() {
    let conn = Arc::new(MockConnection::new(order_table()));
    let cursor = EditableCursor::open(
        Arc::clone(&conn),
        order_columns(),
        fetched(&order_rows()),
        &DriverConfig::new(),
        None,
    )
    .unwrap();
    cursor.last().unwrap();
    cursor.update_null(2).unwrap();
    cursor.update_row().unwrap();
    assert_eq!(conn.state().rows[2][2], None);
    assert_eq!(cursor.get::<Option<String>>(2).unwrap(), None);
}

#[test]
fn test_failed_move_to_insert_row_keeps_pending_update() {
    let conn = MockConnection::new(order_table());
    let metadata: Arc<dyn MetadataSource> = Arc::new(FailingMetadata);
    let config = DriverConfig::new().populate_insert_row_defaults(true);
    let cursor =
        EditableCursor::open(&conn, order_columns(), fetched(&order_rows()), &config, Some(metadata))
            .unwrap();

    // from browsing
    cursor.first().unwrap();
    assert!(matches!(cursor.move_to_insert_row(), Err(Error::Execution(_))));
    assert_eq!(cursor.state().unwrap(), CursorState::Browsing);
    assert_eq!(cursor.row_number().unwrap(), Some(1));

    // from a positioned update
    cursor.update_value(1, "x").unwrap();
    assert!(matches!(cursor.move_to_insert_row(), Err(Error::Execution(_))));
    assert_eq!(cursor.state().unwrap(), CursorState::PositionedUpdate);

    cursor.update_value(1, "y").unwrap();
    cursor.update_row().unwrap();
    assert_eq!(cursor.get::<String>(1).unwrap(), "y");
    assert_eq!(conn.state().rows[0][1].as_deref(), Some("y"));
    assert_eq!(cursor.row_number().unwrap(), Some(1));
}

#[test]
fn test_insert_row_default_decoded_with_column_charset() {
    let conn = MockConnection::new(order_table());
    let mut columns = order_columns();
    // latin1_swedish_ci
    columns[1] = columns[1].clone().with_charset(8);
    let mut defaults = HashMap::new();
    defaults.insert("customer".to_string(), Some(b"caf\xe9".to_vec()));
    let metadata: Arc<dyn MetadataSource> = Arc::new(FixedMetadata {
        keys: vec!["id".to_string()],
        defaults,
    });
    let config = DriverConfig::new().populate_insert_row_defaults(true);
    let cursor =
        EditableCursor::open(&conn, columns, fetched(&order_rows()), &config, Some(metadata)).unwrap();

    cursor.move_to_insert_row().unwrap();
    assert_eq!(cursor.get::<String>(1).unwrap(), "café");
    cursor.insert_row().unwrap();

    let state = conn.state();
    let (_, params) = state
        .executed
        .iter()
        .find(|(sql, _)| sql.starts_with("INSERT"))
        .unwrap();
    assert_eq!(params[1], Value::Text("café".to_string()));
}

fn server_tz() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

fn client_tz() -> FixedOffset {
    FixedOffset::west_opt(5 * 3600).unwrap()
}

fn cross_zone_config() -> DriverConfig {
    DriverConfig::new()
        .server_timezone(server_tz())
        .client_timezone(client_tz())
        .use_timezone(true)
        .datetime_policy(DateTimePolicy::Fast)
}

fn cross_zone_table(hide_rows: bool) -> TableState {
    TableState {
        hide_rows,
        server_tz: Some(server_tz()),
        ..order_table()
    }
}

#[test]
fn test_update_row_keeps_timestamps_across_zones() {
    for hide_rows in [false, true] {
        let conn = MockConnection::new(cross_zone_table(hide_rows));
        let cursor = EditableCursor::open(
            &conn,
            order_columns(),
            fetched(&order_rows()),
            &cross_zone_config(),
            None,
        )
        .unwrap();
        cursor.first().unwrap();
        let placed = cursor.get_value(2).unwrap();
        let expected = client_tz().with_ymd_and_hms(2024, 1, 1, 3, 0, 0).single().unwrap();
        assert_eq!(placed, Value::Timestamp(expected));

        for name in ["anne", "annie"] {
            cursor.update_value(1, name).unwrap();
            cursor.update_row().unwrap();
            assert_eq!(cursor.get_value(2).unwrap(), placed, "hide_rows={hide_rows}");
            assert_eq!(cursor.get::<String>(1).unwrap(), name);
        }
        assert_eq!(
            conn.state().rows[0][2].as_deref(),
            Some("2024-01-01 10:00:00"),
            "hide_rows={hide_rows}"
        );
    }
}

#[test]
fn test_insert_row_keeps_timestamps_across_zones() {
    for hide_rows in [false, true] {
        let conn = MockConnection::new(cross_zone_table(hide_rows));
        let cursor = EditableCursor::open(
            &conn,
            order_columns(),
            fetched(&order_rows()),
            &cross_zone_config(),
            None,
        )
        .unwrap();
        let placed = client_tz().with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().unwrap();

        cursor.move_to_insert_row().unwrap();
        cursor.update_value(1, "zed").unwrap();
        cursor.update_value(2, Value::Timestamp(placed)).unwrap();
        assert_eq!(cursor.get_value(2).unwrap(), Value::Timestamp(placed));
        cursor.insert_row().unwrap();

        assert_eq!(
            conn.state().rows[3][2].as_deref(),
            Some("2024-06-01 16:00:00"),
            "hide_rows={hide_rows}"
        );
        assert!(cursor.last().unwrap());
        assert_eq!(cursor.get::<i64>(0).unwrap(), 10);
        assert_eq!(
            cursor.get_value(2).unwrap(),
            Value::Timestamp(placed),
            "hide_rows={hide_rows}"
        );
    }
}
