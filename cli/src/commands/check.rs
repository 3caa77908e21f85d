use std::path::Path;

use dalbatch::manifest::yaml::read_manifest;

use crate::console::{print_error_message, print_success_message};

pub fn handle_check_command(manifest_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = read_manifest(manifest_path).map_err(|e| {
        print_error_message(&format!("{} is not valid: {}", manifest_path.display(), e));
        e
    })?;

    for table in &manifest.tables {
        let task = manifest.batch_update_task(&table.name)?;
        println!(
            "  {} - {} updatable columns{}",
            table.name,
            task.qualifying_columns().len(),
            table.version_column().map(|v| format!(", versioned by {}", v)).unwrap_or_default()
        );
    }

    print_success_message(&format!(
        "{} is valid ({} dialect, {} tables)",
        manifest_path.display(),
        manifest.dialect,
        manifest.tables.len()
    ));

    Ok(())
}
