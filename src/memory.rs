//! In-memory `DataConnector`.
//!
//! A complete reference implementation backed by plain collections. The
//! test suite runs against it, and it doubles as a scratch backend for
//! exercising migration scripts without a database. State lives behind a
//! mutex so the connector can be shared by reference like any other
//! backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use crate::config::ConnectorConfig;
use crate::connector::DataConnector;
use crate::error::BackendError;
use crate::schema::{ColumnDefinition, ColumnType, IndexDefinition};
use crate::value::Value;

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<ColumnDefinition>,
    indices: BTreeMap<String, IndexDefinition>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name_matches(name))
    }
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
    update_table_calls: AtomicUsize,
}

impl MemoryConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the structural-update hook has run, across all
    /// tables. Lets tests observe the repair path directly.
    #[must_use]
    pub fn update_table_calls(&self) -> usize {
        self.update_table_calls.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_table<R>(
        &self,
        table: &str,
        body: impl FnOnce(&mut MemoryTable) -> Result<R, BackendError>,
    ) -> Result<R, BackendError> {
        let mut tables = self.lock();
        match tables.get_mut(table) {
            Some(entry) => body(entry),
            None => Err(unknown_table(table)),
        }
    }
}

fn unknown_table(table: &str) -> BackendError {
    BackendError::Statement(format!("no such table: {table}"))
}

fn unknown_column(column: &str) -> BackendError {
    BackendError::Statement(format!("no such column: {column}"))
}

/// Resolve `(column, value)` pairs to `(position, value)` against a table.
fn positions<'v>(
    table: &MemoryTable,
    pairs: &'v [(&str, Value)],
) -> Result<Vec<(usize, &'v Value)>, BackendError> {
    pairs
        .iter()
        .map(|(name, value)| {
            table
                .column_position(name)
                .map(|position| (position, value))
                .ok_or_else(|| unknown_column(name))
        })
        .collect()
}

fn value_fits(column_type: ColumnType, value: &Value) -> bool {
    match column_type {
        ColumnType::Integer => matches!(value, Value::Integer(_) | Value::Null),
        ColumnType::Date => matches!(value, Value::Date(_) | Value::Null),
        // Every string class accepts text; declared widths are not
        // enforced here, mirroring permissive engines.
        _ => matches!(value, Value::Text(_) | Value::Null),
    }
}

fn check_row(table: &str, entry: &MemoryTable, values: &[Value]) -> Result<(), BackendError> {
    if values.len() != entry.columns.len() {
        return Err(BackendError::Statement(format!(
            "table {table} expects {} values per row, got {}",
            entry.columns.len(),
            values.len()
        )));
    }
    for (column, value) in entry.columns.iter().zip(values) {
        if !value_fits(column.column_type, value) {
            return Err(BackendError::Constraint(format!(
                "value for {table}.{} does not fit {:?}",
                column.name, column.column_type
            )));
        }
    }
    Ok(())
}

fn compare_values(a: &Value, b: &Value) -> std::cmp::Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Integer(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl DataConnector for MemoryConnector {
    fn identifier(&self) -> &str {
        "memory"
    }

    fn connect(&mut self, _config: &ConnectorConfig) -> Result<(), BackendError> {
        // Nothing to open; the connection string is accepted as-is.
        Ok(())
    }

    fn query(
        &self,
        table: &str,
        wanted: &[&str],
        filter: &[(&str, Value)],
        order: Option<&str>,
    ) -> Result<Vec<Vec<Value>>, BackendError> {
        let tables = self.lock();
        let entry = tables.get(table).ok_or_else(|| unknown_table(table))?;

        let wanted_positions = wanted
            .iter()
            .map(|name| entry.column_position(name).ok_or_else(|| unknown_column(name)))
            .collect::<Result<Vec<_>, _>>()?;
        let filter_positions = positions(entry, filter)?;

        let mut hits: Vec<&Vec<Value>> = entry
            .rows
            .iter()
            .filter(|row| {
                filter_positions
                    .iter()
                    .all(|(position, value)| row[*position] == **value)
            })
            .collect();

        if let Some(order_column) = order {
            let position = entry
                .column_position(order_column)
                .ok_or_else(|| unknown_column(order_column))?;
            hits.sort_by(|a, b| compare_values(&a[position], &b[position]));
        }

        Ok(hits
            .into_iter()
            .map(|row| {
                wanted_positions
                    .iter()
                    .map(|position| row[*position].clone())
                    .collect()
            })
            .collect())
    }

    fn insert(&self, table: &str, values: &[Value]) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            check_row(table, entry, values)?;
            entry.rows.push(values.to_vec());
            Ok(1)
        })
    }

    fn insert_multiple(&self, table: &str, rows: &[Vec<Value>]) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            for values in rows {
                check_row(table, entry, values)?;
            }
            for values in rows {
                entry.rows.push(values.clone());
            }
            Ok(rows.len() as u64)
        })
    }

    fn update(
        &self,
        table: &str,
        assignments: &[(&str, Value)],
        filter: &[(&str, Value)],
    ) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            let assignment_positions = positions(entry, assignments)?;
            for (position, value) in &assignment_positions {
                let column = &entry.columns[*position];
                if !value_fits(column.column_type, value) {
                    return Err(BackendError::Constraint(format!(
                        "value for {table}.{} does not fit {:?}",
                        column.name, column.column_type
                    )));
                }
            }
            let filter_positions = positions(entry, filter)?;

            let mut touched = 0;
            for row in &mut entry.rows {
                if filter_positions
                    .iter()
                    .all(|(position, value)| row[*position] == **value)
                {
                    for (position, value) in &assignment_positions {
                        row[*position] = (*value).clone();
                    }
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }

    fn delete(&self, table: &str, filter: &[(&str, Value)]) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            let filter_positions = positions(entry, filter)?;
            let before = entry.rows.len();
            entry.rows.retain(|row| {
                !filter_positions
                    .iter()
                    .all(|(position, value)| row[*position] == **value)
            });
            Ok((before - entry.rows.len()) as u64)
        })
    }

    fn delete_by_time(
        &self,
        table: &str,
        column: &str,
        cutoff: NaiveDateTime,
    ) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            let position = entry
                .column_position(column)
                .ok_or_else(|| unknown_column(column))?;
            let before = entry.rows.len();
            entry.rows.retain(|row| match &row[position] {
                Value::Date(stamp) => *stamp >= cutoff,
                _ => true,
            });
            Ok((before - entry.rows.len()) as u64)
        })
    }

    fn replace(
        &self,
        table: &str,
        columns: &[&str],
        values: &[Value],
    ) -> Result<u64, BackendError> {
        self.with_table(table, |entry| {
            if columns.len() != values.len() {
                return Err(BackendError::Statement(format!(
                    "replace into {table}: {} columns but {} values",
                    columns.len(),
                    values.len()
                )));
            }

            // Project the named values into a full row in table order.
            let mut row = vec![Value::Null; entry.columns.len()];
            for (name, value) in columns.iter().zip(values) {
                let position = entry
                    .column_position(name)
                    .ok_or_else(|| unknown_column(name))?;
                row[position] = value.clone();
            }
            check_row(table, entry, &row)?;

            // A row sharing the full primary key is superseded.
            let key_positions: Vec<usize> = entry
                .columns
                .iter()
                .enumerate()
                .filter(|(_, column)| column.is_primary)
                .map(|(position, _)| position)
                .collect();

            let mut affected = 1;
            if !key_positions.is_empty() {
                let before = entry.rows.len();
                entry.rows.retain(|existing| {
                    !key_positions
                        .iter()
                        .all(|position| existing[*position] == row[*position])
                });
                affected += (before - entry.rows.len()) as u64;
            }
            entry.rows.push(row);
            Ok(affected)
        })
    }

    fn table_exists(&self, table: &str) -> Result<bool, BackendError> {
        Ok(self.lock().contains_key(table))
    }

    fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
    ) -> Result<(), BackendError> {
        let mut tables = self.lock();
        if tables.contains_key(table) {
            return Err(BackendError::Statement(format!(
                "table {table} already exists"
            )));
        }
        tables.insert(
            table.to_string(),
            MemoryTable {
                columns: columns.to_vec(),
                indices: indices
                    .iter()
                    .map(|index| (index.name.clone(), index.clone()))
                    .collect(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn drop_table(&self, table: &str) -> Result<(), BackendError> {
        self.lock()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| unknown_table(table))
    }

    fn force_rename_table(&self, old: &str, new: &str) -> Result<(), BackendError> {
        let mut tables = self.lock();
        if tables.contains_key(new) {
            return Err(BackendError::Statement(format!(
                "table {new} already exists"
            )));
        }
        let entry = tables.remove(old).ok_or_else(|| unknown_table(old))?;
        tables.insert(new.to_string(), entry);
        Ok(())
    }

    fn update_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
        renames: &HashMap<String, String>,
    ) -> Result<(), BackendError> {
        self.update_table_calls.fetch_add(1, Ordering::Relaxed);
        self.with_table(table, |entry| {
            // Renames first, so renamed data survives the add/remove passes.
            for (old, new) in renames {
                if let Some(position) = entry.column_position(old) {
                    entry.columns[position].name = new.clone();
                }
            }

            // Converge on the desired column list: keep data for columns
            // that survive by name, backfill new columns with NULL, drop
            // the rest by omission.
            let mut rebuilt: Vec<Vec<Value>> =
                entry.rows.iter().map(|_| Vec::with_capacity(columns.len())).collect();
            for desired in columns {
                match entry.column_position(&desired.name) {
                    Some(position) => {
                        for (row, new_row) in entry.rows.iter().zip(&mut rebuilt) {
                            new_row.push(row[position].clone());
                        }
                    }
                    None => {
                        for new_row in &mut rebuilt {
                            new_row.push(Value::Null);
                        }
                    }
                }
            }

            entry.columns = columns.to_vec();
            entry.rows = rebuilt;
            entry.indices = indices
                .iter()
                .map(|index| (index.name.clone(), index.clone()))
                .collect();
            Ok(())
        })
    }

    fn extract_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>, BackendError> {
        let tables = self.lock();
        let entry = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(entry.columns.clone())
    }

    fn extract_indices(
        &self,
        table: &str,
    ) -> Result<BTreeMap<String, IndexDefinition>, BackendError> {
        let tables = self.lock();
        let entry = tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(entry.indices.clone())
    }

    fn copy_rows(
        &self,
        source: &str,
        destination: &str,
        columns: &[ColumnDefinition],
    ) -> Result<u64, BackendError> {
        let mut tables = self.lock();

        let (projected, destination_positions, destination_width) = {
            let source_table = tables.get(source).ok_or_else(|| unknown_table(source))?;
            let destination_table = tables
                .get(destination)
                .ok_or_else(|| unknown_table(destination))?;

            let source_positions = columns
                .iter()
                .map(|column| {
                    source_table
                        .column_position(&column.name)
                        .ok_or_else(|| unknown_column(&column.name))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let destination_positions = columns
                .iter()
                .map(|column| {
                    destination_table
                        .column_position(&column.name)
                        .ok_or_else(|| unknown_column(&column.name))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let projected: Vec<Vec<Value>> = source_table
                .rows
                .iter()
                .map(|row| {
                    source_positions
                        .iter()
                        .map(|position| row[*position].clone())
                        .collect()
                })
                .collect();
            (projected, destination_positions, destination_table.columns.len())
        };

        let destination_table = tables
            .get_mut(destination)
            .ok_or_else(|| unknown_table(destination))?;
        let copied = projected.len() as u64;
        for values in projected {
            let mut row = vec![Value::Null; destination_width];
            for (position, value) in destination_positions.iter().zip(values) {
                row[*position] = value;
            }
            destination_table.rows.push(row);
        }
        Ok(copied)
    }

    fn native_type_symbol(&self, column_type: ColumnType) -> String {
        match column_type {
            ColumnType::Integer => "INTEGER",
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
            ColumnType::String1 => "CHAR(1)",
            ColumnType::String2 => "CHAR(2)",
            ColumnType::String45 => "VARCHAR(45)",
            ColumnType::String50 => "VARCHAR(50)",
            ColumnType::String100 => "VARCHAR(100)",
            ColumnType::String512 => "VARCHAR(512)",
            ColumnType::String1024 => "VARCHAR(1024)",
        }
        .to_string()
    }
}
