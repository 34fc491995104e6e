//! End-to-end migration scenarios against the in-memory backend.

use std::collections::HashMap;

use groundskeeper::{
    verify_table_matches, ColumnDefinition, ColumnType, DataConnector, EnsureOutcome,
    IndexDefinition, IndexKind, MemoryConnector, Migrator, SchemaVersion, Value, VersionLedger,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn base_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::primary("id", ColumnType::Integer),
        ColumnDefinition::new("name", ColumnType::Text),
    ]
}

#[test]
fn ensure_is_idempotent_then_repairs_on_drift() {
    init_logging();
    let connector = MemoryConnector::new();
    let migrator = Migrator::new(&connector);

    let outcome = migrator
        .ensure_table_exists("t1", &base_columns(), &[], &HashMap::new())
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::Created);
    connector
        .insert("t1", &[Value::from(1), Value::from("Lbsa Plaza")])
        .unwrap();

    // Same shape again: no structural change, the hook never runs.
    let outcome = migrator
        .ensure_table_exists("t1", &base_columns(), &[], &HashMap::new())
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::Unchanged);
    assert_eq!(connector.update_table_calls(), 0);

    // A grown schema triggers the structural-update hook exactly once.
    let mut grown = base_columns();
    grown.push(ColumnDefinition::new("age", ColumnType::Integer));
    let outcome = migrator
        .ensure_table_exists("t1", &grown, &[], &HashMap::new())
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::Updated);
    assert_eq!(connector.update_table_calls(), 1);

    let report = verify_table_matches(&connector, "t1", &grown, &[]).unwrap();
    assert!(report.is_match(), "repaired table should verify clean");

    // Existing data survived the update, new column backfilled with NULL.
    let rows = connector
        .query("t1", &["name", "age"], &[("id", Value::from(1))], None)
        .unwrap();
    assert_eq!(rows, vec![vec![Value::from("Lbsa Plaza"), Value::Null]]);
}

#[test]
fn ensure_repairs_indices_too() {
    init_logging();
    let connector = MemoryConnector::new();
    let migrator = Migrator::new(&connector);
    let columns = base_columns();
    let desired_indices = [IndexDefinition::new("ix_name", ["name"], IndexKind::Index)];

    migrator
        .ensure_table_exists("t2", &columns, &[], &HashMap::new())
        .unwrap();

    // Correct columns, divergent indices: still drift, still repaired.
    let outcome = migrator
        .ensure_table_exists("t2", &columns, &desired_indices, &HashMap::new())
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::Updated);

    let report = verify_table_matches(&connector, "t2", &columns, &desired_indices).unwrap();
    assert!(report.is_match());
}

#[test]
fn ensure_renames_columns_instead_of_dropping_them() {
    init_logging();
    let connector = MemoryConnector::new();
    let migrator = Migrator::new(&connector);

    migrator
        .ensure_table_exists("profiles", &base_columns(), &[], &HashMap::new())
        .unwrap();
    connector
        .insert("profiles", &[Value::from(7), Value::from("Imogen")])
        .unwrap();

    let desired = vec![
        ColumnDefinition::primary("id", ColumnType::Integer),
        ColumnDefinition::new("display_name", ColumnType::Text),
    ];
    let renames: HashMap<String, String> =
        [("name".to_string(), "display_name".to_string())].into();
    migrator
        .ensure_table_exists("profiles", &desired, &[], &renames)
        .unwrap();

    let rows = connector
        .query("profiles", &["display_name"], &[("id", Value::from(7))], None)
        .unwrap();
    assert_eq!(rows, vec![vec![Value::from("Imogen")]]);
}

#[test]
fn copy_table_end_to_end() {
    init_logging();
    let connector = MemoryConnector::new();
    let migrator = Migrator::new(&connector);
    let columns = base_columns();

    migrator
        .ensure_table_exists("t1", &columns, &[], &HashMap::new())
        .unwrap();
    connector
        .insert_multiple(
            "t1",
            &[
                vec![Value::from(1), Value::from("first")],
                vec![Value::from(2), Value::from("second")],
            ],
        )
        .unwrap();

    let copied = migrator
        .copy_table_to_table("t1", "t1_backup", &columns, &[])
        .unwrap();
    assert_eq!(copied, 2);

    let report = verify_table_matches(&connector, "t1_backup", &columns, &[]).unwrap();
    assert!(report.is_match());
    let rows = connector
        .query("t1_backup", &["name"], &[], Some("id"))
        .unwrap();
    assert_eq!(rows, vec![vec![Value::from("first")], vec![Value::from("second")]]);
}

#[test]
fn ledger_reads_the_maximum_ever_written() {
    init_logging();
    let connector = MemoryConnector::new();
    let ledger = VersionLedger::new(&connector);

    ledger.write("estates", &SchemaVersion::new([1, 4])).unwrap();
    assert_eq!(
        ledger.read("estates").unwrap(),
        Some(SchemaVersion::new([1, 4]))
    );

    // Writing a lower version replaces the row, but a stray higher row
    // left by history still wins on read: the ledger reports the maximum
    // of all surviving rows, not the last write.
    ledger.write("estates", &SchemaVersion::new([1, 2])).unwrap();
    connector
        .insert(
            groundskeeper::VERSION_TABLE,
            &[Value::from("1.3"), Value::from("estates")],
        )
        .unwrap();
    assert_eq!(
        ledger.read("estates").unwrap(),
        Some(SchemaVersion::new([1, 3]))
    );
}

#[test]
fn migration_runner_gates_on_ledger_version() {
    init_logging();
    let connector = MemoryConnector::new();
    let migrator = Migrator::new(&connector);
    let ledger = VersionLedger::new(&connector);

    let target = SchemaVersion::new([2, 0]);
    let columns = base_columns();

    // First run: nothing recorded, migrate and stamp.
    if ledger.read("regions").unwrap().map_or(true, |v| v < target) {
        migrator
            .ensure_table_exists("regions", &columns, &[], &HashMap::new())
            .unwrap();
        ledger.write("regions", &target).unwrap();
    }

    // Second run: ledger says up to date, nothing to do.
    assert_eq!(ledger.read("regions").unwrap(), Some(target.clone()));
    assert!(!ledger.read("regions").unwrap().map_or(true, |v| v < target));
}
