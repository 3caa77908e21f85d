//! SQL dialect policies used when rendering batch statements.
//!
//! A dialect owns identifier quoting, placeholder syntax, the null-coalescing
//! function used for conditionally-set columns and the primary-key criteria
//! fragment. Dialects are looked up by name through a registry that is
//! populated once at startup.

use std::{collections::HashMap, fmt::Debug, sync::Arc};

use once_cell::sync::Lazy;

pub trait SqlDialect: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Wraps a single identifier in the dialect's quote characters.
    fn quote_identifier(&self, name: &str) -> String;

    /// Formats a table name, handling `schema.table`.
    fn quote_table_name(&self, table_name: &str) -> String {
        table_name
            .split('.')
            .map(|part| {
                self.quote_identifier(part.trim_matches(|c: char| matches!(c, '"' | '`' | '[' | ']')))
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the parameter at `index` (1-based).
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// Function returning its first non-null argument.
    fn coalesce_function(&self) -> &'static str {
        "COALESCE"
    }

    fn set_value_clause(&self, quoted_column: &str, placeholder: &str) -> String {
        format!("{} = {}", quoted_column, placeholder)
    }

    /// `col = COALESCE(?, col)`: a null parameter keeps the stored value.
    fn set_if_not_null_clause(&self, quoted_column: &str, placeholder: &str) -> String {
        format!(
            "{} = {}({}, {})",
            quoted_column,
            self.coalesce_function(),
            placeholder,
            quoted_column
        )
    }

    /// Server-side bump of a numeric version column. Carries no placeholder.
    fn version_bump_clause(&self, quoted_column: &str) -> String {
        format!("{} = {} + 1", quoted_column, quoted_column)
    }

    /// `a = ? AND b = ?` over `columns`, numbering placeholders from `first_index`.
    fn equality_criteria(&self, columns: &[&str], first_index: usize) -> String {
        columns
            .iter()
            .enumerate()
            .map(|(offset, column)| {
                format!(
                    "{} = {}",
                    self.quote_identifier(column),
                    self.placeholder(first_index + offset)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn coalesce_function(&self) -> &'static str {
        "IFNULL"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlServerDialect;

impl SqlDialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn coalesce_function(&self) -> &'static str {
        "ISNULL"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OracleDialect;

impl SqlDialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn coalesce_function(&self) -> &'static str {
        "NVL"
    }
}

/// PostgreSQL folds unquoted names to lowercase and reserves many common words
/// (`limit`, `end`, `desc`), so every identifier is quoted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }
}

#[derive(thiserror::Error, Debug)]
#[error("Unknown SQL dialect '{name}', supported dialects are: {supported}")]
pub struct UnknownDialectError {
    pub name: String,
    pub supported: String,
}

type DialectConstructor = fn() -> Arc<dyn SqlDialect>;

fn mysql() -> Arc<dyn SqlDialect> {
    Arc::new(MySqlDialect)
}

fn sqlserver() -> Arc<dyn SqlDialect> {
    Arc::new(SqlServerDialect)
}

fn oracle() -> Arc<dyn SqlDialect> {
    Arc::new(OracleDialect)
}

fn postgres() -> Arc<dyn SqlDialect> {
    Arc::new(PostgresDialect)
}

static DIALECT_REGISTRY: Lazy<HashMap<&'static str, DialectConstructor>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, DialectConstructor> = HashMap::new();
    registry.insert("mysql", mysql);
    registry.insert("sqlserver", sqlserver);
    registry.insert("oracle", oracle);
    registry.insert("postgres", postgres);
    registry
});

/// Names accepted by [`dialect_from_name`], sorted.
pub fn supported_dialects() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = DIALECT_REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

pub fn dialect_from_name(name: &str) -> Result<Arc<dyn SqlDialect>, UnknownDialectError> {
    let key = name.trim().to_lowercase();
    let key = match key.as_str() {
        "postgresql" | "pg" => "postgres",
        "mssql" => "sqlserver",
        other => other,
    };

    DIALECT_REGISTRY.get(key).map(|constructor| constructor()).ok_or_else(|| UnknownDialectError {
        name: name.to_string(),
        supported: supported_dialects().join(", "),
    })
}
