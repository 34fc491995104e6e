//! # Groundskeeper
//!
//! Backend-agnostic data access and schema migration.
//!
//! Storage engines implement the narrow [`DataConnector`] trait; everything
//! above it is engine-agnostic orchestration: schema reconciliation
//! ([`verify_table_matches`]), guarded migration procedures ([`Migrator`])
//! and the per-consumer version ledger ([`VersionLedger`]).
//!
//! The crate performs no locking or transactions of its own. Operations
//! are synchronous and blocking; any atomicity comes from the backend, and
//! migration runs are expected to be serialized externally (one runner per
//! process, typically at startup).

pub mod config;
pub mod connector;
pub mod error;
pub mod memory;
pub mod migrator;
pub mod reconcile;
pub mod schema;
pub mod value;
pub mod version;

pub use config::ConnectorConfig;
pub use connector::DataConnector;
pub use error::{BackendError, MigrationError, MigrationOperationError};
pub use memory::MemoryConnector;
pub use migrator::{EnsureOutcome, Migrator};
pub use reconcile::{verify_table_matches, SchemaMismatch, TableReport};
pub use schema::{ColumnDefinition, ColumnType, IndexDefinition, IndexKind};
pub use value::Value;
pub use version::{SchemaVersion, VersionLedger, VERSION_TABLE};
