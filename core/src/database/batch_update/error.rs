#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchUpdateError {
    #[error("Batch update called with no records")]
    EmptyBatch,

    #[error("Table {table} has no primary key to build the update criteria from")]
    NoPrimaryKey { table: String },

    #[error("No columns left to update for table {table} after classification")]
    NoUpdatableColumns { table: String },

    #[error("Row {row} has no value for version column {column}")]
    MissingVersion { row: usize, column: String },

    #[error("Row {row} has no value for column {column}")]
    MissingColumnValue { row: usize, column: String },

    #[error(
        "Row {row} bound {actual} parameters but the template has {expected} placeholders, this is a bug"
    )]
    BinderInvariantViolation { row: usize, expected: usize, actual: usize },
}
