use std::{str::FromStr, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use tracing::level_filters::LevelFilter;

use crate::{
    database::{
        batch_update::{BatchUpdateTask, Hints},
        dialect::{dialect_from_name, SqlDialect, UnknownDialectError},
    },
    manifest::table::TableDescriptor,
};

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::String(s) => LevelFilter::from_str(&s)
            .map_err(|_| serde::de::Error::custom(format!("Unknown log level: {}", s))),
        _ => Err(serde::de::Error::custom("Invalid log level format")),
    }
}

fn serialize_log_level<S>(value: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string().to_lowercase())
}

fn default_log_level() -> LevelFilter {
    LevelFilter::INFO
}

fn default_dialect() -> String {
    "mysql".to_string()
}

#[derive(thiserror::Error, Debug)]
pub enum TaskLookupError {
    #[error("Table {0} is not declared in the manifest")]
    UnknownTable(String),

    #[error("{0}")]
    UnknownDialect(#[from] UnknownDialectError),
}

/// Data-access configuration, read once at startup and never mutated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Manifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Registry name of the SQL dialect, see `supported_dialects`.
    #[serde(default = "default_dialect")]
    pub dialect: String,

    #[serde(default = "default_log_level")]
    #[serde(deserialize_with = "deserialize_log_level")]
    #[serde(serialize_with = "serialize_log_level")]
    pub log_level: LevelFilter,

    /// Hints applied when a caller does not pass its own.
    #[serde(default)]
    pub hints: Hints,

    pub tables: Vec<TableDescriptor>,
}

impl Manifest {
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn sql_dialect(&self) -> Result<Arc<dyn SqlDialect>, UnknownDialectError> {
        dialect_from_name(&self.dialect)
    }

    pub fn batch_update_task(&self, table_name: &str) -> Result<BatchUpdateTask, TaskLookupError> {
        let table = self
            .table(table_name)
            .ok_or_else(|| TaskLookupError::UnknownTable(table_name.to_string()))?;

        Ok(BatchUpdateTask::new(table.clone(), self.sql_dialect()?))
    }
}
