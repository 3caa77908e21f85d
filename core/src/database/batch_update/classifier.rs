//! Decides, per qualifying column, how a batch update writes it.
//!
//! ```text
//!          C1  C2  C3  C4  C5  C6
//!   E1                 x   x   x
//!   E2             x   x   x
//!
//!   C1, C2  changed by no row    -> Dropped      (not in the statement)
//!   C4, C5  changed by every row -> AlwaysSet    (col = ?)
//!   C3, C6  changed by some rows -> Conditional  (col = COALESCE(?, col))
//! ```

use std::collections::HashSet;

use tracing::debug;

use super::{
    error::BatchUpdateError,
    hints::Hints,
    record::{RecordBatch, Row, TrackedRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnStatus {
    /// No row changed the column; it is left out of the template and every parameter set.
    Dropped,
    /// Every row changed the column; its value is bound directly.
    AlwaysSet,
    /// Some rows changed the column; the others bind a null sentinel.
    Conditional,
}

/// Status of every qualifying column, in qualifying-column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnStatuses {
    entries: Vec<(String, ColumnStatus)>,
}

impl ColumnStatuses {
    fn uniform(qualifying: &[String], status: ColumnStatus) -> Self {
        ColumnStatuses { entries: qualifying.iter().map(|c| (c.clone(), status)).collect() }
    }

    pub fn get(&self, column: &str) -> Option<ColumnStatus> {
        self.entries.iter().find(|(name, _)| name == column).map(|(_, status)| *status)
    }

    pub fn entries(&self) -> &[(String, ColumnStatus)] {
        &self.entries
    }

    /// Columns that make it into the statement.
    pub fn included(&self) -> impl Iterator<Item = (&str, ColumnStatus)> {
        self.entries
            .iter()
            .filter(|(_, status)| *status != ColumnStatus::Dropped)
            .map(|(name, status)| (name.as_str(), *status))
    }

    pub fn included_count(&self) -> usize {
        self.included().count()
    }

    pub fn has_conditional(&self) -> bool {
        self.entries.iter().any(|(_, status)| *status == ColumnStatus::Conditional)
    }
}

/// Classifies `qualifying` against the batch. Fails with
/// [`BatchUpdateError::NoUpdatableColumns`] when nothing is left to update.
pub fn classify_columns(
    table_name: &str,
    qualifying: &[String],
    batch: &RecordBatch,
    hints: &Hints,
) -> Result<ColumnStatuses, BatchUpdateError> {
    let statuses = match batch {
        RecordBatch::Tracked(rows) => classify_tracked(qualifying, rows, hints),
        RecordBatch::Plain(rows) => classify_by_nulls(qualifying, rows, hints),
    };

    if statuses.included_count() == 0 {
        return Err(BatchUpdateError::NoUpdatableColumns { table: table_name.to_string() });
    }

    debug!(
        "{} - classified {} columns: {:?}",
        table_name,
        statuses.entries.len(),
        statuses.entries
    );

    Ok(statuses)
}

fn classify_tracked(qualifying: &[String], rows: &[TrackedRow], hints: &Hints) -> ColumnStatuses {
    if hints.update_unchanged_fields {
        return ColumnStatuses::uniform(qualifying, ColumnStatus::AlwaysSet);
    }

    let mut never_changed: HashSet<&str> = qualifying.iter().map(String::as_str).collect();
    let mut changed_by_all = never_changed.clone();

    for row in rows {
        // once both sets are empty every column is Conditional, nothing left to learn
        if never_changed.is_empty() && changed_by_all.is_empty() {
            break;
        }

        let changed: HashSet<&str> = qualifying
            .iter()
            .map(String::as_str)
            .filter(|column| row.is_updated(column))
            .collect();

        if changed.is_empty() {
            continue;
        }

        never_changed.retain(|column| !changed.contains(column));
        changed_by_all.retain(|column| changed.contains(column));
    }

    let entries = qualifying
        .iter()
        .map(|column| {
            let status = if never_changed.contains(column.as_str()) {
                ColumnStatus::Dropped
            } else if changed_by_all.contains(column.as_str()) {
                ColumnStatus::AlwaysSet
            } else {
                ColumnStatus::Conditional
            };
            (column.clone(), status)
        })
        .collect();

    ColumnStatuses { entries }
}

fn classify_by_nulls(qualifying: &[String], rows: &[Row], hints: &Hints) -> ColumnStatuses {
    if hints.update_null_fields {
        return ColumnStatuses::uniform(qualifying, ColumnStatus::AlwaysSet);
    }

    let entries = qualifying
        .iter()
        .map(|column| {
            let mut seen_null = false;
            let mut seen_value = false;

            for row in rows {
                if row.is_null(column) {
                    seen_null = true;
                } else {
                    seen_value = true;
                }

                if seen_null && seen_value {
                    break;
                }
            }

            let status = match (seen_null, seen_value) {
                (true, true) => ColumnStatus::Conditional,
                (false, true) => ColumnStatus::AlwaysSet,
                _ => ColumnStatus::Dropped,
            };
            (column.clone(), status)
        })
        .collect();

    ColumnStatuses { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sql_type_wrapper::SqlValue;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn tracked(changed: &[&str]) -> TrackedRow {
        let row: Row = changed.iter().map(|c| (*c, 1i64)).collect();
        TrackedRow::new(row, changed.iter().copied())
    }

    #[test]
    fn test_tracked_worked_example() {
        let qualifying = columns(&["C1", "C2", "C3", "C4", "C5", "C6"]);
        let batch =
            RecordBatch::Tracked(vec![tracked(&["C4", "C5", "C6"]), tracked(&["C3", "C4", "C5"])]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(statuses.get("C1"), Some(ColumnStatus::Dropped));
        assert_eq!(statuses.get("C2"), Some(ColumnStatus::Dropped));
        assert_eq!(statuses.get("C3"), Some(ColumnStatus::Conditional));
        assert_eq!(statuses.get("C4"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("C5"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("C6"), Some(ColumnStatus::Conditional));
        assert_eq!(
            statuses.included().map(|(c, _)| c).collect::<Vec<_>>(),
            vec!["C3", "C4", "C5", "C6"]
        );
    }

    #[test]
    fn test_identical_change_sets_have_no_conditional() {
        let qualifying = columns(&["a", "b", "c"]);
        let batch = RecordBatch::Tracked(vec![tracked(&["a", "b"]); 4]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert!(!statuses.has_conditional());
        assert_eq!(statuses.get("c"), Some(ColumnStatus::Dropped));
    }

    #[test]
    fn test_column_changed_after_all_columns_touched_is_conditional() {
        // the first row touches every column, later rows must still narrow "changed by all"
        let qualifying = columns(&["a", "b"]);
        let batch = RecordBatch::Tracked(vec![tracked(&["a", "b"]), tracked(&["a"])]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(statuses.get("a"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("b"), Some(ColumnStatus::Conditional));
    }

    #[test]
    fn test_rows_without_changes_are_skipped() {
        let qualifying = columns(&["a", "b"]);
        let batch = RecordBatch::Tracked(vec![tracked(&[]), tracked(&["a"]), tracked(&[])]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(statuses.get("a"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("b"), Some(ColumnStatus::Dropped));
    }

    #[test]
    fn test_changes_outside_qualifying_columns_are_ignored() {
        let qualifying = columns(&["a", "b"]);
        let batch = RecordBatch::Tracked(vec![tracked(&["id"]), tracked(&["a", "b"])]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(statuses.get("a"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("b"), Some(ColumnStatus::AlwaysSet));
    }

    #[test]
    fn test_update_unchanged_fields_forces_always_set() {
        let qualifying = columns(&["a", "b", "c"]);
        let batch = RecordBatch::Tracked(vec![tracked(&["a"]), tracked(&[])]);
        let hints = Hints::new().update_unchanged_fields();

        let statuses = classify_columns("t", &qualifying, &batch, &hints).unwrap();

        assert!(statuses.entries().iter().all(|(_, s)| *s == ColumnStatus::AlwaysSet));
    }

    #[test]
    fn test_nothing_changed_fails() {
        let qualifying = columns(&["a", "b"]);
        let batch = RecordBatch::Tracked(vec![tracked(&[]), tracked(&[])]);

        let err = classify_columns("orders", &qualifying, &batch, &Hints::default()).unwrap_err();

        assert_eq!(err, BatchUpdateError::NoUpdatableColumns { table: "orders".to_string() });
    }

    #[test]
    fn test_empty_qualifying_columns_fails() {
        let batch = RecordBatch::Plain(vec![Row::new().with("id", 1i64)]);

        let err = classify_columns("t", &[], &batch, &Hints::default()).unwrap_err();

        assert!(matches!(err, BatchUpdateError::NoUpdatableColumns { .. }));
    }

    #[test]
    fn test_null_inference() {
        let qualifying = columns(&["always", "sometimes", "never"]);
        let batch = RecordBatch::Plain(vec![
            Row::new().with("always", 1i64).with("sometimes", SqlValue::Null),
            Row::new().with("always", 2i64).with("sometimes", "x").with("never", SqlValue::Null),
        ]);

        let statuses = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(statuses.get("always"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("sometimes"), Some(ColumnStatus::Conditional));
        assert_eq!(statuses.get("never"), Some(ColumnStatus::Dropped));
    }

    #[test]
    fn test_update_null_fields_skips_inference() {
        let qualifying = columns(&["a", "b"]);
        let batch = RecordBatch::Plain(vec![Row::new().with("a", SqlValue::Null)]);
        let hints = Hints::new().update_null_fields();

        let statuses = classify_columns("t", &qualifying, &batch, &hints).unwrap();

        assert_eq!(statuses.get("a"), Some(ColumnStatus::AlwaysSet));
        assert_eq!(statuses.get("b"), Some(ColumnStatus::AlwaysSet));
    }

    #[test]
    fn test_hint_only_applies_to_its_mode() {
        // update_unchanged_fields has no meaning for records without change tracking
        let qualifying = columns(&["a"]);
        let batch = RecordBatch::Plain(vec![Row::new().with("a", SqlValue::Null)]);
        let hints = Hints::new().update_unchanged_fields();

        assert!(classify_columns("t", &qualifying, &batch, &hints).is_err());
    }

    #[test]
    fn test_classification_is_deterministic() {
        let qualifying = columns(&["C1", "C2", "C3", "C4", "C5", "C6"]);
        let batch =
            RecordBatch::Tracked(vec![tracked(&["C4", "C5", "C6"]), tracked(&["C3", "C4", "C5"])]);

        let first = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();
        let second = classify_columns("t", &qualifying, &batch, &Hints::default()).unwrap();

        assert_eq!(first, second);
    }
}
