//! Column and index descriptors.
//!
//! These are the value objects passed across the `DataConnector` boundary
//! for every schema operation. Callers construct them per call; only their
//! effects (tables, columns, indices) are ever persisted.

/// Abstract column storage types.
///
/// This is a closed alphabet: a backend renders each variant to its native
/// type syntax via `DataConnector::native_type_symbol`, and nothing outside
/// the backend ever sees the native spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Date,
    /// Unbounded text.
    Text,
    String1,
    String2,
    String45,
    String50,
    String100,
    String512,
    String1024,
}

/// Definition of a single table column.
///
/// Equality is structural: name, type and primary flag must all match.
/// Reconciliation compares names case-insensitively and tolerates type
/// aliasing on top of this; see `reconcile::verify_table_matches`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub is_primary: bool,
}

impl ColumnDefinition {
    /// A plain (non-primary) column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_primary: false,
        }
    }

    /// A primary-key column.
    pub fn primary(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            is_primary: true,
        }
    }

    /// Case-insensitive name comparison, the rule used throughout
    /// reconciliation.
    #[must_use]
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Index categories a backend can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Index,
}

/// Definition of a named index over an ordered set of columns.
///
/// `PartialEq` is full structural equality including the name.
/// Reconciliation identifies indices by membership instead: [`equivalent`]
/// ignores the name, because backends assign their own names to physically
/// identical indices.
///
/// [`equivalent`]: IndexDefinition::equivalent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

impl IndexDefinition {
    pub fn new<I, S>(name: impl Into<String>, columns: I, kind: IndexKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Structural comparison ignoring the index name.
    ///
    /// Two indices are equivalent when they have the same kind and cover the
    /// same columns in the same order, with column names compared
    /// case-insensitively.
    #[must_use]
    pub fn equivalent(&self, other: &IndexDefinition) -> bool {
        self.kind == other.kind
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}
