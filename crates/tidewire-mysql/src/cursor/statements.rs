//! SQL synthesis for the cursor's helper statements, and their ownership.

use tidewire_core::{Connection, Result, StatementExecutor};

use super::updatability::TableTarget;
use crate::types::ColumnDef;

/// Quote an identifier with the server's quote string, doubling embedded
/// quotes. Unquoted when the server cannot quote.
pub fn quote_ident(quote: Option<&str>, name: &str) -> String {
    match quote {
        Some(q) if !q.is_empty() => format!("{q}{}{q}", name.replace(q, &format!("{q}{q}"))),
        _ => name.to_string(),
    }
}

/// The four statements an editable cursor runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSql {
    pub update: String,
    pub insert: String,
    pub delete: String,
    pub refresh: String,
}

impl SynthesizedSql {
    /// Build all four texts from column metadata.
    ///
    /// Parameter order: UPDATE binds every column then every key column;
    /// INSERT binds every column; DELETE and the refresh SELECT bind the key.
    pub fn build(quote: Option<&str>, target: &TableTarget, columns: &[ColumnDef]) -> Self {
        let ident = |name: &str| quote_ident(quote, name);
        let table = match &target.database {
            Some(db) => format!("{}.{}", ident(db), ident(&target.table)),
            None => ident(&target.table),
        };
        let names: Vec<String> = columns.iter().map(|c| ident(c.origin_name())).collect();
        let key_clause = target
            .primary_key
            .iter()
            .map(|&i| format!("{} <=> ?", names[i]))
            .collect::<Vec<_>>()
            .join(" AND ");

        let assignments = names
            .iter()
            .map(|n| format!("{n} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; names.len()].join(", ");
        let list = names.join(", ");

        Self {
            update: format!("UPDATE {table} SET {assignments} WHERE {key_clause}"),
            insert: format!("INSERT INTO {table} ({list}) VALUES ({placeholders})"),
            delete: format!("DELETE FROM {table} WHERE {key_clause}"),
            refresh: format!("SELECT {list} FROM {table} WHERE {key_clause}"),
        }
    }

    pub fn text(&self, kind: HelperKind) -> &str {
        match kind {
            HelperKind::Updater => &self.update,
            HelperKind::Inserter => &self.insert,
            HelperKind::Deleter => &self.delete,
            HelperKind::Refresher => &self.refresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    Updater,
    Inserter,
    Deleter,
    Refresher,
}

/// Lazily prepared helper statements, each released at most once.
pub struct HelperStatements<S: StatementExecutor> {
    updater: Option<S>,
    inserter: Option<S>,
    deleter: Option<S>,
    refresher: Option<S>,
}

impl<S: StatementExecutor> Default for HelperStatements<S> {
    fn default() -> Self {
        Self {
            updater: None,
            inserter: None,
            deleter: None,
            refresher: None,
        }
    }
}

impl<S: StatementExecutor> HelperStatements<S> {
    fn slot(&mut self, kind: HelperKind) -> &mut Option<S> {
        match kind {
            HelperKind::Updater => &mut self.updater,
            HelperKind::Inserter => &mut self.inserter,
            HelperKind::Deleter => &mut self.deleter,
            HelperKind::Refresher => &mut self.refresher,
        }
    }

    /// The helper for `kind`, preparing it on first use.
    pub fn get_or_prepare<C>(&mut self, connection: &C, kind: HelperKind, sql: &str) -> Result<&mut S>
    where
        C: Connection<Statement = S>,
    {
        let slot = self.slot(kind);
        if slot.is_none() {
            tracing::debug!(?kind, sql, "preparing cursor helper statement");
            *slot = Some(connection.prepare(sql)?);
        }
        slot.as_mut()
            .ok_or_else(|| tidewire_core::Error::invalid_state("helper statement missing"))
    }

    /// Close every prepared helper. All are attempted; the first failure is
    /// returned.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for kind in [
            HelperKind::Updater,
            HelperKind::Inserter,
            HelperKind::Deleter,
            HelperKind::Refresher,
        ] {
            if let Some(mut statement) = self.slot(kind).take() {
                if let Err(e) = statement.close() {
                    tracing::warn!(?kind, error = %e, "failed to close cursor helper statement");
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
