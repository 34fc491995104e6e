//! The `DataConnector` trait, the seam a storage engine implements.
//!
//! Everything above this trait (reconciliation, migration, the version
//! ledger, domain query plugins) is engine-agnostic; everything below it
//! (SQL rendering, connections, introspection queries) belongs to the
//! backend. Each primitive is assumed atomic at the statement level, and
//! any of them may fail with a `BackendError` which the core propagates
//! untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::config::ConnectorConfig;
use crate::error::BackendError;
use crate::schema::{ColumnDefinition, ColumnType, IndexDefinition};
use crate::value::Value;

/// Primitive operations a concrete backend must supply.
///
/// The trait is object safe, so orchestration code can hold a
/// `&dyn DataConnector` when the engine is chosen at runtime.
///
/// # Examples
///
/// ```
/// use groundskeeper::{ColumnDefinition, ColumnType, DataConnector, MemoryConnector, Value};
///
/// # fn main() -> Result<(), groundskeeper::BackendError> {
/// let connector = MemoryConnector::new();
/// let columns = [
///     ColumnDefinition::primary("id", ColumnType::Integer),
///     ColumnDefinition::new("name", ColumnType::String50),
/// ];
/// connector.create_table("agents", &columns, &[])?;
/// connector.insert("agents", &[Value::from(1), Value::from("Ruth")])?;
///
/// let rows = connector.query("agents", &["name"], &[("id", Value::from(1))], None)?;
/// assert_eq!(rows[0][0].as_text(), Some("Ruth"));
/// # Ok(())
/// # }
/// ```
pub trait DataConnector {
    // --- connection lifecycle ---

    /// Short tag identifying the backend, used in log messages.
    fn identifier(&self) -> &str;

    /// Open the backend connection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Connection` when the backend cannot be
    /// reached or refuses the connection string.
    fn connect(&mut self, config: &ConnectorConfig) -> Result<(), BackendError>;

    /// Close the backend connection. Dropping the connector must release it
    /// as well; this hook exists for callers that want to close eagerly.
    fn close(&mut self) {}

    // --- generic CRUD ---

    /// Select `wanted` columns from rows of `table` matching every
    /// `(column, value)` pair in `filter`, optionally sorted ascending by
    /// the `order` column. An empty filter selects every row.
    fn query(
        &self,
        table: &str,
        wanted: &[&str],
        filter: &[(&str, Value)],
        order: Option<&str>,
    ) -> Result<Vec<Vec<Value>>, BackendError>;

    /// Insert one row given positionally, one value per column in table
    /// order. Returns the number of rows written.
    fn insert(&self, table: &str, values: &[Value]) -> Result<u64, BackendError>;

    /// Insert several positional rows. Returns the number of rows written.
    fn insert_multiple(&self, table: &str, rows: &[Vec<Value>]) -> Result<u64, BackendError>;

    /// Set each `(column, value)` assignment on every row matching
    /// `filter`. Returns the number of rows touched.
    fn update(
        &self,
        table: &str,
        assignments: &[(&str, Value)],
        filter: &[(&str, Value)],
    ) -> Result<u64, BackendError>;

    /// Delete rows matching every `(column, value)` pair in `filter`. An
    /// empty filter deletes every row. Returns the number of rows removed.
    fn delete(&self, table: &str, filter: &[(&str, Value)]) -> Result<u64, BackendError>;

    /// Delete rows whose date `column` is older than `cutoff`.
    fn delete_by_time(
        &self,
        table: &str,
        column: &str,
        cutoff: NaiveDateTime,
    ) -> Result<u64, BackendError>;

    /// Insert a row given as `(columns, values)`, superseding any existing
    /// row with the same primary key.
    fn replace(
        &self,
        table: &str,
        columns: &[&str],
        values: &[Value],
    ) -> Result<u64, BackendError>;

    // --- schema primitives ---

    fn table_exists(&self, table: &str) -> Result<bool, BackendError>;

    /// Physically create `table` with the given shape.
    fn create_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
    ) -> Result<(), BackendError>;

    /// Physically drop `table`.
    fn drop_table(&self, table: &str) -> Result<(), BackendError>;

    /// Unconditional physical rename. Callers wanting the guarded variant
    /// use `Migrator::rename_table`.
    fn force_rename_table(&self, old: &str, new: &str) -> Result<(), BackendError>;

    /// Structural-update hook: alter the live `table` in place until it has
    /// exactly the desired columns and indices. `renames` maps old to new
    /// names for columns being renamed rather than dropped and recreated.
    ///
    /// How the convergence is performed (ALTER statements, shadow table,
    /// etc.) is entirely the backend's business.
    fn update_table(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
        renames: &HashMap<String, String>,
    ) -> Result<(), BackendError>;

    /// Live column structure of `table`, as the backend observes it.
    fn extract_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>, BackendError>;

    /// Live indices of `table`, keyed by the backend's index name.
    fn extract_indices(
        &self,
        table: &str,
    ) -> Result<BTreeMap<String, IndexDefinition>, BackendError>;

    /// Bulk-copy only the given columns from `source` to `destination`, in
    /// existing data order. Returns the number of rows copied.
    fn copy_rows(
        &self,
        source: &str,
        destination: &str,
        columns: &[ColumnDefinition],
    ) -> Result<u64, BackendError>;

    /// The backend's rendering of an abstract column type, e.g.
    /// `VARCHAR(50)`. Two column types rendering to the same symbol are
    /// indistinguishable in storage, which is what reconciliation's alias
    /// tolerance relies on.
    fn native_type_symbol(&self, column_type: ColumnType) -> String;
}
