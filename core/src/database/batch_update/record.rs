use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::database::sql_type_wrapper::SqlValue;

/// Column values already extracted from an application record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values.get(column)
    }

    /// A column the record does not carry counts as null.
    pub fn is_null(&self, column: &str) -> bool {
        self.get(column).map_or(true, SqlValue::is_null)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Builds a row from a JSON object, `None` for any other JSON shape.
    pub fn from_json(value: &Value) -> Option<Row> {
        let object = value.as_object()?;
        let values = object.iter().map(|(k, v)| (k.clone(), SqlValue::from_json(v))).collect();
        Some(Row { values })
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// A record that reports which columns it changed since it was loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedRow {
    row: Row,
    updated_columns: BTreeSet<String>,
}

impl TrackedRow {
    pub fn new<I, S>(row: Row, updated_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TrackedRow { row, updated_columns: updated_columns.into_iter().map(Into::into).collect() }
    }

    /// Loaded, unchanged value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.row.insert(column, value);
        self
    }

    /// Sets a value and records the column as changed.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let column = column.into();
        self.updated_columns.insert(column.clone());
        self.row.insert(column, value);
        self
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn updated_columns(&self) -> &BTreeSet<String> {
        &self.updated_columns
    }

    pub fn is_updated(&self, column: &str) -> bool {
        self.updated_columns.contains(column)
    }
}

/// The records of one batch update, all of the same kind.
///
/// The variant decides how unchanged columns are detected: `Tracked` records
/// report their changed columns, `Plain` records are inspected for nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBatch {
    Plain(Vec<Row>),
    Tracked(Vec<TrackedRow>),
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Plain(rows) => rows.len(),
            RecordBatch::Tracked(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, RecordBatch::Tracked(_))
    }

    /// Column values of every record, in batch order.
    pub fn rows(&self) -> Box<dyn Iterator<Item = &Row> + '_> {
        match self {
            RecordBatch::Plain(rows) => Box::new(rows.iter()),
            RecordBatch::Tracked(rows) => Box::new(rows.iter().map(TrackedRow::row)),
        }
    }
}
