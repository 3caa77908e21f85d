use tracing::debug;

use super::classifier::{ColumnStatus, ColumnStatuses};
use crate::{database::dialect::SqlDialect, manifest::table::TableDescriptor};

pub const TMPL_SQL_UPDATE: &str = "UPDATE {table} SET {columns} WHERE {criteria}";

/// The single statement shared by every row of a batch.
///
/// Placeholders appear in the order `[included columns] + [primary keys] + [version]`,
/// which is exactly the order parameter sets are bound in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    table_name: String,
    columns: Vec<(String, ColumnStatus)>,
    criteria: String,
    version_fragment: Option<String>,
    sql: String,
    placeholder_count: usize,
}

impl SqlTemplate {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Included columns with their status, in SET clause order.
    pub fn columns(&self) -> &[(String, ColumnStatus)] {
        &self.columns
    }

    /// Primary-key criteria, without the version check.
    pub fn criteria(&self) -> &str {
        &self.criteria
    }

    pub fn version_fragment(&self) -> Option<&str> {
        self.version_fragment.as_deref()
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }
}

/// Hands out placeholders in parameter order.
struct Placeholders<'a> {
    dialect: &'a dyn SqlDialect,
    next_index: usize,
}

impl<'a> Placeholders<'a> {
    fn new(dialect: &'a dyn SqlDialect) -> Self {
        Placeholders { dialect, next_index: 1 }
    }

    fn next(&mut self) -> String {
        let placeholder = self.dialect.placeholder(self.next_index);
        self.next_index += 1;
        placeholder
    }

    fn take(&mut self, count: usize) -> usize {
        let first = self.next_index;
        self.next_index += count;
        first
    }

    fn issued(&self) -> usize {
        self.next_index - 1
    }
}

pub fn build_batch_update_sql(
    table: &TableDescriptor,
    statuses: &ColumnStatuses,
    dialect: &dyn SqlDialect,
) -> SqlTemplate {
    let mut placeholders = Placeholders::new(dialect);
    let mut set_clauses: Vec<String> = Vec::with_capacity(statuses.included_count() + 1);
    let mut columns = Vec::with_capacity(statuses.included_count());

    for (column, status) in statuses.included() {
        let quoted = dialect.quote_identifier(column);
        let placeholder = placeholders.next();

        let clause = match status {
            ColumnStatus::Conditional => dialect.set_if_not_null_clause(&quoted, &placeholder),
            _ => dialect.set_value_clause(&quoted, &placeholder),
        };

        set_clauses.push(clause);
        columns.push((column.to_string(), status));
    }

    if let Some(version) = table.version.as_ref().filter(|v| v.updatable) {
        set_clauses.push(dialect.version_bump_clause(&dialect.quote_identifier(&version.column)));
    }

    let primary_keys: Vec<&str> = table.primary_keys.iter().map(String::as_str).collect();
    let first_key = placeholders.take(primary_keys.len());
    let criteria = dialect.equality_criteria(&primary_keys, first_key);

    let version_fragment = table.version_column().map(|column| {
        format!("{} = {}", dialect.quote_identifier(column), placeholders.next())
    });

    let where_clause = match &version_fragment {
        Some(fragment) => format!("{} AND {}", criteria, fragment),
        None => criteria.clone(),
    };

    let sql = TMPL_SQL_UPDATE
        .replace("{table}", &dialect.quote_table_name(&table.name))
        .replace("{columns}", &set_clauses.join(", "))
        .replace("{criteria}", &where_clause);

    debug!("{} - batch update template: {}", table.name, sql);

    SqlTemplate {
        table_name: table.name.clone(),
        columns,
        criteria,
        version_fragment,
        sql,
        placeholder_count: placeholders.issued(),
    }
}
