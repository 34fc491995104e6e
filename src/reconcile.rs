//! Schema reconciliation: compare a table's live structure against a
//! desired structure.
//!
//! A mismatch here is data, not an error. The orchestrator reads the
//! report to choose between repairing the table and leaving it alone, and
//! callers can surface the findings however they like. Log output from
//! this module is advisory only and must never be parsed as a control
//! signal.

use std::fmt;

use log::{debug, warn};

use crate::connector::DataConnector;
use crate::error::BackendError;
use crate::schema::{ColumnDefinition, IndexDefinition};

/// A single divergence between desired and live structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// The table itself does not exist.
    TableMissing,
    /// A desired column has no live counterpart.
    ColumnMissing { column: String },
    /// A live column is not accounted for by the desired set.
    ColumnUnexpected { column: String },
    /// Exactly one side has no indices at all.
    IndexCountDiverged { live: usize, desired: usize },
    /// A desired index has no structurally equal live counterpart.
    IndexMissing { name: String },
    /// A live index has no structurally equal desired counterpart.
    IndexUnexpected { name: String },
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::TableMissing => write!(f, "table does not exist"),
            SchemaMismatch::ColumnMissing { column } => {
                write!(f, "column {column} is missing")
            }
            SchemaMismatch::ColumnUnexpected { column } => {
                write!(f, "column {column} is not in the desired schema")
            }
            SchemaMismatch::IndexCountDiverged { live, desired } => {
                write!(f, "{live} live indices vs {desired} desired")
            }
            SchemaMismatch::IndexMissing { name } => {
                write!(f, "index {name} has no live counterpart")
            }
            SchemaMismatch::IndexUnexpected { name } => {
                write!(f, "live index {name} has no desired counterpart")
            }
        }
    }
}

/// Outcome of reconciling one table.
#[derive(Debug, Clone)]
pub struct TableReport {
    table: String,
    findings: Vec<SchemaMismatch>,
}

impl TableReport {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// True when the live table matches the desired structure.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.findings.is_empty()
    }

    /// Every divergence found, in discovery order.
    pub fn findings(&self) -> &[SchemaMismatch] {
        &self.findings
    }
}

/// Items of `probe` with no counterpart in `against` under either the
/// equality or the alias predicate.
///
/// This is the one two-way comparison primitive in the crate: it is called
/// once per direction, for columns and again for indices. Passing a
/// constant-false alias predicate degrades it to plain membership.
fn unmatched<'a, T>(
    probe: &'a [T],
    against: &[T],
    equals: impl Fn(&T, &T) -> bool,
    alias: impl Fn(&T, &T) -> bool,
) -> Vec<&'a T> {
    probe
        .iter()
        .filter(|&candidate| {
            !against
                .iter()
                .any(|other| equals(candidate, other) || alias(candidate, other))
        })
        .collect()
}

/// Compare the live structure of `table` against the desired columns and
/// indices.
///
/// The check is two-way in both passes: every desired column must be
/// present live (exactly, or under the alias rule below), every live
/// column must be accounted for by the desired set, and the live and
/// desired index sets must match structurally in both directions. A table
/// with correct columns but divergent indices still fails.
///
/// The alias rule: a column whose name matches case-insensitively is
/// accepted as long as the backend renders both declared types to the same
/// native symbol, even when the declarations themselves differ. A column
/// kept under review with a different declaration but the same physical
/// type therefore passes.
///
/// # Errors
///
/// Returns `BackendError` when introspection fails; a structural mismatch
/// is not an error but a report with findings.
pub fn verify_table_matches<C>(
    connector: &C,
    table: &str,
    desired_columns: &[ColumnDefinition],
    desired_indices: &[IndexDefinition],
) -> Result<TableReport, BackendError>
where
    C: DataConnector + ?Sized,
{
    let mut findings = Vec::new();

    if !connector.table_exists(table)? {
        warn!("[{}] table {table} not found during verification", connector.identifier());
        return Ok(TableReport {
            table: table.to_string(),
            findings: vec![SchemaMismatch::TableMissing],
        });
    }

    let live_columns = connector.extract_columns(table)?;

    let equals = |a: &ColumnDefinition, b: &ColumnDefinition| {
        a.name_matches(&b.name) && a.column_type == b.column_type && a.is_primary == b.is_primary
    };
    let aliased = |a: &ColumnDefinition, b: &ColumnDefinition| {
        a.name_matches(&b.name)
            && connector.native_type_symbol(a.column_type)
                == connector.native_type_symbol(b.column_type)
    };

    for column in unmatched(desired_columns, &live_columns, &equals, &aliased) {
        warn!("table {table} is missing column {}", column.name);
        findings.push(SchemaMismatch::ColumnMissing {
            column: column.name.clone(),
        });
    }
    // Extra live columns were historically a softer concern, hence the
    // quieter log level; the outcome is a mismatch all the same.
    for column in unmatched(&live_columns, desired_columns, &equals, &aliased) {
        debug!("table {table} carries unexpected column {}", column.name);
        findings.push(SchemaMismatch::ColumnUnexpected {
            column: column.name.clone(),
        });
    }

    let live_indices: Vec<IndexDefinition> =
        connector.extract_indices(table)?.into_values().collect();
    debug!(
        "table {table}: {} live indices, {} desired",
        live_indices.len(),
        desired_indices.len()
    );

    // Both sides must agree on having indices at all before membership is
    // worth checking.
    if live_indices.is_empty() != desired_indices.is_empty() {
        findings.push(SchemaMismatch::IndexCountDiverged {
            live: live_indices.len(),
            desired: desired_indices.len(),
        });
        return Ok(TableReport {
            table: table.to_string(),
            findings,
        });
    }

    let structurally = |a: &IndexDefinition, b: &IndexDefinition| a.equivalent(b);
    let never = |_: &IndexDefinition, _: &IndexDefinition| false;

    for index in unmatched(desired_indices, &live_indices, &structurally, &never) {
        warn!("table {table} is missing an index equivalent to {}", index.name);
        findings.push(SchemaMismatch::IndexMissing {
            name: index.name.clone(),
        });
    }
    for index in unmatched(&live_indices, desired_indices, &structurally, &never) {
        debug!("table {table} carries unexpected index {}", index.name);
        findings.push(SchemaMismatch::IndexUnexpected {
            name: index.name.clone(),
        });
    }

    Ok(TableReport {
        table: table.to_string(),
        findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;
    use crate::schema::{ColumnType, IndexKind};

    fn estate_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::primary("id", ColumnType::Integer),
            ColumnDefinition::new("owner", ColumnType::String45),
            ColumnDefinition::new("created", ColumnType::Date),
        ]
    }

    fn connector_with(columns: &[ColumnDefinition], indices: &[IndexDefinition]) -> MemoryConnector {
        let connector = MemoryConnector::new();
        connector.create_table("estates", columns, indices).unwrap();
        connector
    }

    #[test]
    fn identical_shapes_match() {
        let columns = estate_columns();
        let connector = connector_with(&columns, &[]);
        let report = verify_table_matches(&connector, "estates", &columns, &[]).unwrap();
        assert!(report.is_match());
        assert!(report.findings().is_empty());
    }

    #[test]
    fn missing_table_reports_mismatch() {
        let connector = MemoryConnector::new();
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert!(!report.is_match());
        assert_eq!(report.findings(), &[SchemaMismatch::TableMissing]);
    }

    #[test]
    fn missing_desired_column_fails() {
        let mut live = estate_columns();
        live.pop();
        let connector = connector_with(&live, &[]);
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert_eq!(
            report.findings(),
            &[SchemaMismatch::ColumnMissing {
                column: "created".to_string()
            }]
        );
    }

    #[test]
    fn extra_live_column_fails() {
        let mut live = estate_columns();
        live.push(ColumnDefinition::new("abandoned", ColumnType::Integer));
        let connector = connector_with(&live, &[]);
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert_eq!(
            report.findings(),
            &[SchemaMismatch::ColumnUnexpected {
                column: "abandoned".to_string()
            }]
        );
    }

    #[test]
    fn case_renamed_column_of_same_type_matches() {
        let mut live = estate_columns();
        live[1].name = "OWNER".to_string();
        let connector = connector_with(&live, &[]);
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert!(report.is_match());
    }

    #[test]
    fn primary_flag_drift_passes_through_alias_rule() {
        // Same name and physical type, different primary flag: structural
        // equality fails but the alias rule accepts it.
        let mut live = estate_columns();
        live[1].is_primary = true;
        let connector = connector_with(&live, &[]);
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert!(report.is_match());
    }

    #[test]
    fn retyped_column_fails_both_directions() {
        let mut live = estate_columns();
        live[1].column_type = ColumnType::Integer;
        let connector = connector_with(&live, &[]);
        let report = verify_table_matches(&connector, "estates", &estate_columns(), &[]).unwrap();
        assert!(!report.is_match());
        // The retyped column surfaces from both passes.
        assert!(report
            .findings()
            .contains(&SchemaMismatch::ColumnMissing { column: "owner".to_string() }));
        assert!(report
            .findings()
            .contains(&SchemaMismatch::ColumnUnexpected { column: "owner".to_string() }));
    }

    #[test]
    fn zero_vs_nonzero_index_counts_fail_immediately() {
        let columns = estate_columns();
        let connector = connector_with(&columns, &[]);
        let desired = [IndexDefinition::new("ix_owner", ["owner"], IndexKind::Index)];
        let report = verify_table_matches(&connector, "estates", &columns, &desired).unwrap();
        assert_eq!(
            report.findings(),
            &[SchemaMismatch::IndexCountDiverged { live: 0, desired: 1 }]
        );
    }

    #[test]
    fn unmatched_index_fails_even_with_correct_columns() {
        let columns = estate_columns();
        let live_indices = [IndexDefinition::new("ix_created", ["created"], IndexKind::Index)];
        let connector = connector_with(&columns, &live_indices);
        let desired = [IndexDefinition::new("ix_owner", ["owner"], IndexKind::Index)];
        let report = verify_table_matches(&connector, "estates", &columns, &desired).unwrap();
        assert!(!report.is_match());
        assert!(report
            .findings()
            .contains(&SchemaMismatch::IndexMissing { name: "ix_owner".to_string() }));
        assert!(report
            .findings()
            .contains(&SchemaMismatch::IndexUnexpected { name: "ix_created".to_string() }));
    }

    #[test]
    fn index_names_are_irrelevant_when_shape_matches() {
        let columns = estate_columns();
        let live_indices = [IndexDefinition::new("PRIMARY", ["id"], IndexKind::Primary)];
        let connector = connector_with(&columns, &live_indices);
        let desired = [IndexDefinition::new("pk_estates", ["id"], IndexKind::Primary)];
        let report = verify_table_matches(&connector, "estates", &columns, &desired).unwrap();
        assert!(report.is_match());
    }
}
