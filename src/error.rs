//! Error taxonomy for the data-access core.
//!
//! `BackendError` carries failures from the primitive connector; the core
//! never catches or retries these, recovery strategy belongs to the caller
//! and the deployment. `MigrationOperationError` marks a violated
//! precondition of a structural operation and is fatal to that operation.
//! Reconciliation mismatches are not errors at all: they are reported as
//! data (`reconcile::TableReport`) and drive the repair-vs-noop branch.

use thiserror::Error;

/// Failure reported by a concrete backend driver.
///
/// Drivers must map their native error types into this enum; nothing
/// engine-specific may leak past the `DataConnector` boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The connection was lost or could not be established.
    #[error("connection failure: {0}")]
    Connection(String),
    /// The backend rejected a statement.
    #[error("statement rejected: {0}")]
    Statement(String),
    /// A constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Any other backend failure.
    #[error("backend failure: {0}")]
    Other(String),
}

/// A precondition of a structural migration operation was violated.
///
/// These are never retried; the affected table's migration aborts and the
/// message names the table and the violated condition.
#[derive(Debug, Error)]
pub enum MigrationOperationError {
    #[error("cannot copy from `{table}`: source table does not exist")]
    SourceTableMissing { table: String },
    #[error("cannot copy from `{table}`: live table shape does not match the requested definition")]
    SourceShapeMismatch { table: String },
    #[error("cannot copy into `{table}`: existing table could not be dropped")]
    DestinationNotRemovable { table: String },
}

/// Union error returned by the migration orchestrator.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Operation(#[from] MigrationOperationError),
}
