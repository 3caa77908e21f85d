use super::{
    error::BatchUpdateError,
    record::{RecordBatch, Row},
};
use crate::{database::sql_type_wrapper::SqlValue, manifest::table::TableDescriptor};

/// Optimistic-concurrency check for versioned tables.
///
/// The version each row was loaded with is bound verbatim into the
/// `version = ?` criteria; a row whose version moved on matches nothing and
/// reports zero affected rows.
#[derive(Debug, Clone, Copy)]
pub struct VersionGuard<'a> {
    column: &'a str,
}

impl<'a> VersionGuard<'a> {
    /// `None` when the table has no version column.
    pub fn for_table(table: &'a TableDescriptor) -> Option<Self> {
        table.version_column().map(|column| VersionGuard { column })
    }

    pub fn column(&self) -> &str {
        self.column
    }

    /// Every row must carry a non-null version, the first one that does not fails the
    /// whole batch.
    pub fn validate(&self, batch: &RecordBatch) -> Result<(), BatchUpdateError> {
        match batch.rows().position(|row| row.is_null(self.column)) {
            Some(row) => {
                Err(BatchUpdateError::MissingVersion { row, column: self.column.to_string() })
            }
            None => Ok(()),
        }
    }

    pub fn version_value(&self, row_index: usize, row: &Row) -> Result<SqlValue, BatchUpdateError> {
        match row.get(self.column) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(BatchUpdateError::MissingVersion {
                row: row_index,
                column: self.column.to_string(),
            }),
        }
    }
}
