use dalbatch::{execute_batch_update, PostgresClient};

use crate::{
    cli_interface::BatchArgs,
    commands::load,
    console::{print_error_message, print_success_message, print_warn_message},
};

const APPLY_DIALECT: &str = "postgres";

pub async fn handle_apply_command(args: &BatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load(args)?;

    if loaded.task.dialect().name() != APPLY_DIALECT {
        let message = format!(
            "apply only supports the {} dialect, the manifest uses {}",
            APPLY_DIALECT, loaded.manifest.dialect
        );
        print_error_message(&message);
        return Err(message.into());
    }

    let client = PostgresClient::new().await.map_err(|e| {
        print_error_message(&format!(
            "Could not connect to Postgres, make sure DATABASE_URL is set in the .env: {}",
            e
        ));
        e
    })?;

    let counts =
        execute_batch_update(&client, &loaded.task, &loaded.batch, &loaded.hints).await.map_err(|e| {
            print_error_message(&format!("Batch update failed: {}", e));
            e
        })?;

    let stale = counts.iter().filter(|count| **count == 0).count();
    if stale > 0 {
        print_warn_message(&format!(
            "{} rows matched nothing, their key or version may be stale",
            stale
        ));
    }

    print_success_message(&format!("Updated {} rows", counts.iter().sum::<u64>()));

    Ok(())
}
