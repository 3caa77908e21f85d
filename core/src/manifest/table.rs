use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,

    /// Columns such as `created_at` can be excluded from every UPDATE.
    #[serde(default = "default_true")]
    pub updatable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnDescriptor { name: name.into(), updatable: true }
    }

    pub fn read_only(name: impl Into<String>) -> Self {
        ColumnDescriptor { name: name.into(), updatable: false }
    }
}

/// Optimistic-concurrency column of a table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VersionPolicy {
    pub column: String,

    /// Numeric versions are bumped by the UPDATE itself (`v = v + 1`). Set to `false` for
    /// versions the database maintains on its own, like an `ON UPDATE CURRENT_TIMESTAMP`
    /// column.
    #[serde(default = "default_true")]
    pub updatable: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,

    pub columns: Vec<ColumnDescriptor>,

    pub primary_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<VersionPolicy>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: &[&str], primary_keys: &[&str]) -> Self {
        TableDescriptor {
            name: name.into(),
            columns: columns.iter().map(|c| ColumnDescriptor::new(*c)).collect(),
            primary_keys: primary_keys.iter().map(|c| c.to_string()).collect(),
            version: None,
        }
    }

    pub fn with_version(mut self, column: impl Into<String>, updatable: bool) -> Self {
        self.version = Some(VersionPolicy { column: column.into(), updatable });
        self
    }

    pub fn version_column(&self) -> Option<&str> {
        self.version.as_ref().map(|v| v.column.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Columns eligible for the SET clause, in declaration order: every updatable
    /// column that is neither a primary key nor the version column.
    pub fn qualifying_columns(&self) -> Vec<String> {
        let version_column = self.version_column();

        self.columns
            .iter()
            .filter(|c| c.updatable)
            .filter(|c| !self.primary_keys.contains(&c.name))
            .filter(|c| Some(c.name.as_str()) != version_column)
            .map(|c| c.name.clone())
            .collect()
    }
}
