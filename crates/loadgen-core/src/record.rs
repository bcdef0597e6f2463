//! Rows written by the driver and the statements that carry them.

/// Primary key column of the target table.
pub const ID_COLUMN: &str = "id";

/// Table written to when none is configured.
pub const DEFAULT_TABLE: &str = "test";

/// One row inserted by the workload driver.
///
/// `name` always carries the same value as `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub time: String,
}

impl Record {
    pub fn new(id: String, time: String) -> Self {
        Self {
            name: id.clone(),
            id,
            time,
        }
    }
}

/// A parameterized single-row INSERT.
///
/// Stores render the SQL in their own dialect and bind `values` as
/// parameters in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: String,
    pub values: Vec<(String, String)>,
}

impl InsertStatement {
    /// Build the `(id, name, time)` insert for a record.
    pub fn for_record(table: &str, record: &Record) -> Self {
        Self {
            table: table.to_string(),
            values: vec![
                (ID_COLUMN.to_string(), record.id.clone()),
                ("name".to_string(), record.name.clone()),
                ("time".to_string(), record.time.clone()),
            ],
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(column, _)| column.as_str())
    }

    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(_, value)| value.as_str())
    }

    /// Value bound to the primary key column, if present.
    pub fn key(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|(column, _)| column == ID_COLUMN)
            .map(|(_, value)| value.as_str())
    }
}

/// Rows addressed by a delete mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySet {
    /// Every row of the table.
    All,
    /// Rows whose primary key is in the list.
    Keys(Vec<String>),
}

/// Unconditional write applied outside any transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Delete { table: String, keys: KeySet },
}

impl Mutation {
    pub fn delete_all(table: impl Into<String>) -> Self {
        Mutation::Delete {
            table: table.into(),
            keys: KeySet::All,
        }
    }
}
