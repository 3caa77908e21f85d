use std::{fs, path::Path};

use dalbatch::{
    manifest::{core::Manifest, yaml::read_manifest},
    setup_manifest_logger, BatchUpdateTask, Hints, RecordBatch, Row, SqlValue, TrackedRow,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{cli_interface::BatchArgs, console::print_error_message};

pub mod apply;
pub mod check;
pub mod preview;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TrackedEntry {
    values: Map<String, Value>,
    updated_columns: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Tracked(Vec<TrackedEntry>),
    Plain(Vec<Map<String, Value>>),
}

fn to_row(values: &Map<String, Value>) -> Row {
    values.iter().map(|(column, value)| (column.clone(), SqlValue::from_json(value))).collect()
}

pub fn load_batch(path: &Path) -> Result<RecordBatch, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    let batch = match serde_json::from_str(&contents)? {
        BatchFile::Tracked(entries) => RecordBatch::Tracked(
            entries
                .into_iter()
                .map(|entry| TrackedRow::new(to_row(&entry.values), entry.updated_columns))
                .collect(),
        ),
        BatchFile::Plain(rows) => RecordBatch::Plain(rows.iter().map(to_row).collect()),
    };
    Ok(batch)
}

/// Command line flags only ever switch hints on, on top of the manifest ones.
pub fn resolve_hints(manifest: &Manifest, args: &BatchArgs) -> Hints {
    let mut hints = manifest.hints;
    hints.update_unchanged_fields |= args.update_unchanged_fields;
    hints.update_null_fields |= args.update_null_fields;
    hints
}

pub struct LoadedBatch {
    pub manifest: Manifest,
    pub task: BatchUpdateTask,
    pub batch: RecordBatch,
    pub hints: Hints,
}

pub fn load(args: &BatchArgs) -> Result<LoadedBatch, Box<dyn std::error::Error>> {
    let manifest = read_manifest(&args.manifest).map_err(|e| {
        print_error_message(&format!("Could not read {}: {}", args.manifest.display(), e));
        e
    })?;
    setup_manifest_logger(&manifest);

    let task = manifest.batch_update_task(&args.table).map_err(|e| {
        print_error_message(&e.to_string());
        e
    })?;

    let batch = load_batch(&args.batch).map_err(|e| {
        print_error_message(&format!("Could not read batch {}: {}", args.batch.display(), e));
        e
    })?;

    let hints = resolve_hints(&manifest, args);

    Ok(LoadedBatch { manifest, task, batch, hints })
}
