use colored::Colorize;

use crate::{
    cli_interface::BatchArgs,
    commands::load,
    console::{print_error_message, print_sql, print_success_message},
};

pub fn handle_preview_command(args: &BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(args)?;

    let prepared = loaded.task.prepare(&loaded.batch, &loaded.hints).map_err(|e| {
        print_error_message(&format!("Could not prepare batch update: {}", e));
        e
    })?;

    print_sql(prepared.sql());
    println!();

    for (column, status) in prepared.template.columns() {
        println!("  {} {:?}", column.bold(), status);
    }
    println!();

    for (index, parameters) in prepared.parameters.iter().enumerate() {
        let values: Vec<String> = parameters.values().iter().map(|v| v.to_string()).collect();
        println!("  row {}: [{}]", index, values.join(", "));
    }

    print_success_message(&format!(
        "\n{} rows bound against {} placeholders",
        prepared.row_count(),
        prepared.template.placeholder_count()
    ));

    Ok(())
}
