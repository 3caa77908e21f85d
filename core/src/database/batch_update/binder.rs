use tokio_postgres::types::ToSql;

use super::{
    classifier::ColumnStatus,
    error::BatchUpdateError,
    record::{RecordBatch, Row},
    template::SqlTemplate,
    version::VersionGuard,
};
use crate::{database::sql_type_wrapper::SqlValue, manifest::table::TableDescriptor};

/// Parameters of one row, in template placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    values: Vec<SqlValue>,
}

impl ParameterSet {
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    pub fn as_params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values.iter().map(|param| param as &(dyn ToSql + Sync)).collect()
    }
}

impl From<Vec<SqlValue>> for ParameterSet {
    fn from(values: Vec<SqlValue>) -> Self {
        ParameterSet { values }
    }
}

fn required_value(row_index: usize, row: &Row, column: &str) -> Result<SqlValue, BatchUpdateError> {
    row.get(column).cloned().ok_or_else(|| BatchUpdateError::MissingColumnValue {
        row: row_index,
        column: column.to_string(),
    })
}

/// Binds one parameter set per record. `changed` tells whether the record at an
/// index changed a column; unchanged conditional columns get the null sentinel.
fn bind_row(
    row_index: usize,
    row: &Row,
    changed: impl Fn(&str) -> bool,
    template: &SqlTemplate,
    table: &TableDescriptor,
    version: Option<&VersionGuard>,
) -> Result<ParameterSet, BatchUpdateError> {
    let mut values = Vec::with_capacity(template.placeholder_count());

    for (column, status) in template.columns() {
        let value = match status {
            ColumnStatus::AlwaysSet => required_value(row_index, row, column)?,
            ColumnStatus::Conditional if changed(column) => {
                required_value(row_index, row, column)?
            }
            _ => SqlValue::Null,
        };
        values.push(value);
    }

    for key in &table.primary_keys {
        values.push(required_value(row_index, row, key)?);
    }

    if let Some(guard) = version {
        values.push(guard.version_value(row_index, row)?);
    }

    if values.len() != template.placeholder_count() {
        return Err(BatchUpdateError::BinderInvariantViolation {
            row: row_index,
            expected: template.placeholder_count(),
            actual: values.len(),
        });
    }

    Ok(ParameterSet { values })
}

pub fn bind_parameters(
    template: &SqlTemplate,
    table: &TableDescriptor,
    batch: &RecordBatch,
    version: Option<&VersionGuard>,
) -> Result<Vec<ParameterSet>, BatchUpdateError> {
    match batch {
        RecordBatch::Tracked(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, tracked)| {
                bind_row(i, tracked.row(), |c| tracked.is_updated(c), template, table, version)
            })
            .collect(),
        // a plain row "changed" a conditional column exactly when it holds a value for it
        RecordBatch::Plain(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| bind_row(i, row, |c| !row.is_null(c), template, table, version))
            .collect(),
    }
}
