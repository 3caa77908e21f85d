use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "dalbatch", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// The dalbatch.yaml describing the tables.
    #[clap(long, short)]
    pub manifest: PathBuf,

    /// Table the batch belongs to, as declared in the manifest.
    #[clap(long, short)]
    pub table: String,

    /// JSON file holding the batch, either an array of row objects or an array of
    /// `{"values": {..}, "updated_columns": [..]}` entries for tracked records.
    #[clap(long, short)]
    pub batch: PathBuf,

    /// Also write columns whose value did not change (tracked records only).
    #[clap(long)]
    pub update_unchanged_fields: bool,

    /// Also write null values instead of keeping the stored ones (plain rows only).
    #[clap(long)]
    pub update_null_fields: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints the UPDATE statement and the parameters of every row without
    /// touching a database.
    ///
    /// Example:
    /// `dalbatch preview --manifest dalbatch.yaml --table orders --batch orders.json`
    #[clap(name = "preview")]
    Preview(BatchArgs),

    /// Applies the batch to the postgres database found in `DATABASE_URL`.
    ///
    /// Example:
    /// `dalbatch apply --manifest dalbatch.yaml --table orders --batch orders.json`
    #[clap(name = "apply")]
    Apply(BatchArgs),

    /// Validates the manifest.
    ///
    /// Example:
    /// `dalbatch check --manifest dalbatch.yaml`
    #[clap(name = "check")]
    Check {
        #[clap(long, short)]
        manifest: PathBuf,
    },
}
