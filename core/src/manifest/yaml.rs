use std::{
    collections::HashSet,
    env,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use regex::{Captures, Regex};
use tracing::{debug, error};

use crate::{
    database::dialect::{dialect_from_name, UnknownDialectError},
    manifest::core::Manifest,
};

pub const YAML_CONFIG_NAME: &str = "dalbatch.yaml";

#[derive(thiserror::Error, Debug)]
pub enum SubstituteEnvError {
    #[error("Invalid env substitution pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Environment variable {0} not found")]
    MissingVariable(String),
}

/// Replaces `${VAR}` occurrences with the value of the environment variable.
pub fn substitute_env_variables(contents: &str) -> Result<String, SubstituteEnvError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;

    let mut missing: Option<String> = None;
    let result = re.replace_all(contents, |caps: &Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                error!("Environment variable {} not found", var_name);
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(SubstituteEnvError::MissingVariable(var_name)),
        None => Ok(result.into_owned()),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ValidateManifestError {
    #[error("Table names must be unique, {0} is declared more than once")]
    TableNameMustBeUnique(String),

    #[error("Table {0} must declare at least one primary key")]
    TableHasNoPrimaryKey(String),

    #[error("Primary key {1} of table {0} is not one of its columns")]
    PrimaryKeyNotAColumn(String, String),

    #[error("Version column {1} of table {0} is not one of its columns")]
    VersionNotAColumn(String, String),

    #[error("Column {1} of table {0} is declared more than once")]
    DuplicateColumn(String, String),

    #[error("{0}")]
    UnknownDialect(#[from] UnknownDialectError),
}

pub fn validate_manifest(manifest: &Manifest) -> Result<(), ValidateManifestError> {
    dialect_from_name(&manifest.dialect)?;

    let mut table_names = HashSet::new();
    for table in &manifest.tables {
        if !table_names.insert(table.name.as_str()) {
            return Err(ValidateManifestError::TableNameMustBeUnique(table.name.clone()));
        }

        let mut column_names = HashSet::new();
        for column in &table.columns {
            if !column_names.insert(column.name.as_str()) {
                return Err(ValidateManifestError::DuplicateColumn(
                    table.name.clone(),
                    column.name.clone(),
                ));
            }
        }

        if table.primary_keys.is_empty() {
            return Err(ValidateManifestError::TableHasNoPrimaryKey(table.name.clone()));
        }

        if let Some(key) = table.primary_keys.iter().find(|k| !table.has_column(k)) {
            return Err(ValidateManifestError::PrimaryKeyNotAColumn(
                table.name.clone(),
                key.clone(),
            ));
        }

        if let Some(version) = table.version_column().filter(|v| !table.has_column(v)) {
            return Err(ValidateManifestError::VersionNotAColumn(
                table.name.clone(),
                version.to_string(),
            ));
        }
    }

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] SubstituteEnvError),

    #[error("Could not validate manifest: {0}")]
    CouldNotValidateManifest(#[from] ValidateManifestError),
}

fn env_file_next_to(file_path: &Path) -> Option<PathBuf> {
    let env_file = file_path.parent().unwrap_or(Path::new("")).join(".env");
    env_file.exists().then_some(env_file)
}

/// Reads and validates a manifest. A `.env` file next to it is loaded first so
/// `${VAR}` references can be resolved from it.
pub fn read_manifest(file_path: &Path) -> Result<Manifest, ReadManifestError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    if let Some(env_file) = env_file_next_to(file_path) {
        if let Err(e) = dotenv::from_path(&env_file) {
            error!("Could not load {}: {}", env_file.display(), e);
        }
    }

    let contents = substitute_env_variables(&contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;

    validate_manifest(&manifest)?;

    debug!("Loaded manifest {} with {} tables", manifest.name, manifest.tables.len());

    Ok(manifest)
}
