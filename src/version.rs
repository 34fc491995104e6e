//! Per-consumer schema version ledger.
//!
//! The ledger is an ordinary table, created lazily on first use and never
//! dropped by this layer. Writes keep at most one logical row per
//! migration name via delete-then-insert; nothing enforces uniqueness at
//! the table level, so reads treat the maximum parsed version across all
//! surviving rows as authoritative.

use std::fmt;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use crate::connector::DataConnector;
use crate::error::BackendError;
use crate::schema::{ColumnDefinition, ColumnType};
use crate::value::Value;

/// Name of the ledger table, shared by every consumer of a database.
pub const VERSION_TABLE: &str = "migrator_versions";

const VERSION_COLUMN: &str = "version";
const NAME_COLUMN: &str = "name";

/// A dotted numeric schema version such as `1.4.2`.
///
/// Ordering is lexicographic over the component list, so a version with a
/// trailing component sorts above the same version without it
/// (`1.4 < 1.4.0`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion {
    parts: Vec<u32>,
}

impl SchemaVersion {
    /// Build a version from its numeric components.
    ///
    /// # Panics
    ///
    /// Panics when `parts` is empty.
    #[must_use]
    pub fn new(parts: impl Into<Vec<u32>>) -> Self {
        let parts = parts.into();
        assert!(!parts.is_empty(), "a schema version needs at least one component");
        Self { parts }
    }

    pub fn parts(&self) -> &[u32] {
        &self.parts
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, part) in self.parts.iter().enumerate() {
            if position > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Error parsing a `SchemaVersion` from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    #[error("version string is blank")]
    Blank,
    #[error("invalid version component `{0}`")]
    InvalidComponent(String),
}

impl FromStr for SchemaVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseVersionError::Blank);
        }
        let parts = trimmed
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| ParseVersionError::InvalidComponent(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { parts })
    }
}

/// Read/write access to the version ledger for one connector.
pub struct VersionLedger<'a, C: DataConnector + ?Sized> {
    connector: &'a C,
}

impl<'a, C: DataConnector + ?Sized> VersionLedger<'a, C> {
    pub fn new(connector: &'a C) -> Self {
        Self { connector }
    }

    /// The highest version ever recorded for `migrator_name`, if any.
    ///
    /// Blank and unparseable rows are skipped rather than treated as
    /// failures, so a ledger polluted by older writers still yields the
    /// best available answer. Returns `None` when no parseable row exists,
    /// including right after the ledger table is first created.
    ///
    /// # Errors
    ///
    /// Propagates `BackendError` from table creation or the query.
    pub fn read(&self, migrator_name: &str) -> Result<Option<SchemaVersion>, BackendError> {
        self.ensure_ledger_table()?;

        let rows = self.connector.query(
            VERSION_TABLE,
            &[VERSION_COLUMN],
            &[(NAME_COLUMN, Value::from(migrator_name))],
            None,
        )?;

        let mut highest: Option<SchemaVersion> = None;
        for row in rows {
            let Some(text) = row.first().and_then(Value::as_text) else {
                continue;
            };
            match text.parse::<SchemaVersion>() {
                Ok(version) => {
                    if highest.as_ref().map_or(true, |current| version > *current) {
                        highest = Some(version);
                    }
                }
                Err(_) => {
                    debug!("skipping unparseable ledger row `{text}` for {migrator_name}");
                }
            }
        }
        Ok(highest)
    }

    /// Record `version` as the current version for `migrator_name`.
    ///
    /// # Errors
    ///
    /// Propagates `BackendError` from any step. The delete and the insert
    /// are two separate statements; a concurrent reader can observe the
    /// gap, and callers must serialize writers per migration name.
    pub fn write(&self, migrator_name: &str, version: &SchemaVersion) -> Result<(), BackendError> {
        self.ensure_ledger_table()?;

        // Logical uniqueness per name comes from this delete-then-insert,
        // not from any constraint on the table.
        self.connector
            .delete(VERSION_TABLE, &[(NAME_COLUMN, Value::from(migrator_name))])?;
        self.connector.insert(
            VERSION_TABLE,
            &[Value::from(version.to_string()), Value::from(migrator_name)],
        )?;
        Ok(())
    }

    fn ensure_ledger_table(&self) -> Result<(), BackendError> {
        if self.connector.table_exists(VERSION_TABLE)? {
            return Ok(());
        }
        let columns = [
            ColumnDefinition::primary(VERSION_COLUMN, ColumnType::String100),
            ColumnDefinition::new(NAME_COLUMN, ColumnType::String100),
        ];
        self.connector.create_table(VERSION_TABLE, &columns, &[])
    }
}
