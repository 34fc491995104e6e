//! Migration orchestration over a `DataConnector`.
//!
//! The orchestrator sequences reconciliation, creation, renaming and data
//! copy into higher-level procedures that are safe to call repeatedly. It
//! holds no state of its own and performs no locking; callers are expected
//! to serialize migration runs, typically one runner per process at
//! startup.

use std::collections::HashMap;

use log::info;

use crate::connector::DataConnector;
use crate::error::{MigrationError, MigrationOperationError};
use crate::reconcile::verify_table_matches;
use crate::schema::{ColumnDefinition, IndexDefinition};

/// What `Migrator::ensure_table_exists` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The table was absent and has been created with the desired shape.
    Created,
    /// The table existed but diverged; the structural-update hook ran.
    Updated,
    /// The table already matched the desired shape.
    Unchanged,
}

/// Sequences schema operations into safe higher-level procedures.
pub struct Migrator<'a, C: DataConnector + ?Sized> {
    connector: &'a C,
}

impl<'a, C: DataConnector + ?Sized> Migrator<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        Self { connector }
    }

    /// Make sure `table` exists with exactly the desired shape.
    ///
    /// An absent table is created. A present table that diverges from the
    /// desired columns/indices is converged in place through the backend's
    /// structural-update hook; `renames` maps old to new names for columns
    /// being renamed rather than dropped and recreated. A matching table is
    /// left untouched, so the call is idempotent.
    ///
    /// # Errors
    ///
    /// Propagates any `BackendError` from introspection, creation or the
    /// update hook. Partial structural updates are not rolled back.
    pub fn ensure_table_exists(
        &self,
        table: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
        renames: &HashMap<String, String>,
    ) -> Result<EnsureOutcome, MigrationError> {
        if self.connector.table_exists(table)? {
            let report = verify_table_matches(self.connector, table, columns, indices)?;
            if report.is_match() {
                return Ok(EnsureOutcome::Unchanged);
            }
            info!(
                "[{}] updating table {table} ({} findings)",
                self.connector.identifier(),
                report.findings().len()
            );
            self.connector.update_table(table, columns, indices, renames)?;
            return Ok(EnsureOutcome::Updated);
        }

        self.connector.create_table(table, columns, indices)?;
        Ok(EnsureOutcome::Created)
    }

    /// Copy `source` into a freshly created `destination`.
    ///
    /// Copying from a table of unknown shape is refused rather than
    /// attempted: the source must exist and its live structure must match
    /// `columns`/`indices`, both checked before the destination is touched.
    /// An existing destination is dropped first; a destination that still
    /// exists after its drop is fatal rather than silently overwritten.
    ///
    /// Returns the number of rows copied. A backend failure mid-copy
    /// leaves the destination partially populated; it is surfaced, not
    /// repaired.
    ///
    /// # Errors
    ///
    /// `MigrationOperationError` when a precondition is violated;
    /// `BackendError` from any primitive.
    pub fn copy_table_to_table(
        &self,
        source: &str,
        destination: &str,
        columns: &[ColumnDefinition],
        indices: &[IndexDefinition],
    ) -> Result<u64, MigrationError> {
        if !self.connector.table_exists(source)? {
            return Err(MigrationOperationError::SourceTableMissing {
                table: source.to_string(),
            }
            .into());
        }

        let report = verify_table_matches(self.connector, source, columns, indices)?;
        if !report.is_match() {
            return Err(MigrationOperationError::SourceShapeMismatch {
                table: source.to_string(),
            }
            .into());
        }

        if self.connector.table_exists(destination)? {
            self.connector.drop_table(destination)?;
            if self.connector.table_exists(destination)? {
                return Err(MigrationOperationError::DestinationNotRemovable {
                    table: destination.to_string(),
                }
                .into());
            }
        }

        self.connector.create_table(destination, columns, indices)?;
        let copied = self.connector.copy_rows(source, destination, columns)?;
        info!(
            "[{}] copied {copied} rows from {source} to {destination}",
            self.connector.identifier()
        );
        Ok(copied)
    }

    /// Guarded rename: executes only when `old` exists and `new` does not.
    ///
    /// The guard failing is a silent no-op rather than an error; the call
    /// never clobbers an existing table. Returns whether a rename actually
    /// happened.
    pub fn rename_table(&self, old: &str, new: &str) -> Result<bool, MigrationError> {
        if self.connector.table_exists(old)? && !self.connector.table_exists(new)? {
            self.connector.force_rename_table(old, new)?;
            return Ok(true);
        }
        Ok(false)
    }
}
