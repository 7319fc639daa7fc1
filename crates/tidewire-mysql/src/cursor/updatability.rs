//! Decides once, at cursor construction, whether a result set can be edited.

use std::collections::BTreeSet;

use tidewire_core::{MetadataSource, NotUpdatableReason, Result};

use crate::types::ColumnDef;

/// The single table an editable cursor writes back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub database: Option<String>,
    pub table: String,
    /// Ordinals of the projected primary-key columns, never empty.
    pub primary_key: Vec<usize>,
}

/// Inspect the projection and, in strict mode, the live primary key.
///
/// The outer `Result` carries metadata lookup failures; the inner one the
/// permanent verdict.
pub fn analyze(
    columns: &[ColumnDef],
    connection_database: Option<String>,
    strict: bool,
    metadata: Option<&dyn MetadataSource>,
) -> Result<std::result::Result<TableTarget, NotUpdatableReason>> {
    let Some(first) = columns.first() else {
        return Ok(Err(NotUpdatableReason::MissingTableName));
    };

    let mut table = None;
    for column in columns {
        let Some(name) = column.origin_table() else {
            return Ok(Err(NotUpdatableReason::MissingTableName));
        };
        match table {
            None => table = Some(name),
            Some(seen) if seen != name => return Ok(Err(NotUpdatableReason::MultipleTables)),
            Some(_) => {}
        }
    }
    let Some(table) = table else {
        return Ok(Err(NotUpdatableReason::MissingTableName));
    };

    let first_db = first.origin_database();
    if columns.iter().any(|c| c.origin_database() != first_db) {
        return Ok(Err(NotUpdatableReason::MultipleDatabases));
    }
    let database = first_db.map(str::to_string).or(connection_database);

    let primary_key: Vec<usize> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_primary_key())
        .map(|(i, _)| i)
        .collect();
    if primary_key.is_empty() {
        return Ok(Err(NotUpdatableReason::NoPrimaryKey));
    }

    if let Some(metadata) = metadata.filter(|_| strict) {
        let live = metadata.primary_key_columns(database.as_deref(), table)?;
        let projected: Vec<String> = primary_key
            .iter()
            .map(|&i| columns[i].origin_name().to_string())
            .collect();
        let fold = |names: &[String]| -> BTreeSet<String> {
            names.iter().map(|n| n.to_ascii_lowercase()).collect()
        };
        if fold(&projected) != fold(&live) {
            tracing::debug!(table, ?projected, ?live, "projected primary key differs from table");
            return Ok(Err(NotUpdatableReason::PrimaryKeyMismatch { projected, live }));
        }
    }

    Ok(Ok(TableTarget {
        database,
        table: table.to_string(),
        primary_key,
    }))
}
