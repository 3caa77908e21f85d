//! Batch UPDATE generation.
//!
//! A batch of records of one table becomes one parameterized statement plus one
//! parameter set per record. Columns no record changed are left out entirely,
//! columns only some records changed are written through `COALESCE(?, col)` so
//! the other records can bind null and keep their stored value.

mod binder;
mod classifier;
mod error;
mod hints;
mod record;
mod template;
mod version;

pub use binder::{bind_parameters, ParameterSet};
pub use classifier::{classify_columns, ColumnStatus, ColumnStatuses};
pub use error::BatchUpdateError;
pub use hints::Hints;
pub use record::{RecordBatch, Row, TrackedRow};
pub use template::{build_batch_update_sql, SqlTemplate, TMPL_SQL_UPDATE};
pub use version::VersionGuard;

use std::{fmt, sync::Arc};

use tracing::{debug, error, info};

use crate::{database::dialect::SqlDialect, manifest::table::TableDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchUpdateState {
    Classifying,
    TemplateBuilt,
    Binding,
    Ready,
    Failed,
}

impl BatchUpdateState {
    pub fn can_transition_to(self, next: BatchUpdateState) -> bool {
        use BatchUpdateState::*;

        matches!(
            (self, next),
            (Classifying, TemplateBuilt)
                | (TemplateBuilt, Binding)
                | (Binding, Ready)
                | (Classifying | TemplateBuilt | Binding, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchUpdateState::Ready | BatchUpdateState::Failed)
    }
}

impl fmt::Display for BatchUpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchUpdateState::Classifying => "classifying",
            BatchUpdateState::TemplateBuilt => "template-built",
            BatchUpdateState::Binding => "binding",
            BatchUpdateState::Ready => "ready",
            BatchUpdateState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Template and parameter sets of one batch, ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBatchUpdate {
    pub template: SqlTemplate,
    pub parameters: Vec<ParameterSet>,
}

impl PreparedBatchUpdate {
    pub fn sql(&self) -> &str {
        self.template.sql()
    }

    pub fn row_count(&self) -> usize {
        self.parameters.len()
    }
}

struct Preparation<'a> {
    table_name: &'a str,
    state: BatchUpdateState,
}

impl Preparation<'_> {
    fn advance(&mut self, next: BatchUpdateState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {}", self.state, next);
        debug!("{} - batch update {} -> {}", self.table_name, self.state, next);
        self.state = next;
    }
}

/// Prepares batch updates for one table.
///
/// Holds only immutable table metadata and the dialect, so one task can prepare
/// many batches, concurrently if needed.
#[derive(Debug, Clone)]
pub struct BatchUpdateTask {
    table: Arc<TableDescriptor>,
    dialect: Arc<dyn SqlDialect>,
    qualifying_columns: Vec<String>,
}

impl BatchUpdateTask {
    pub fn new(table: impl Into<Arc<TableDescriptor>>, dialect: Arc<dyn SqlDialect>) -> Self {
        let table = table.into();
        let qualifying_columns = table.qualifying_columns();
        BatchUpdateTask { table, dialect, qualifying_columns }
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn qualifying_columns(&self) -> &[String] {
        &self.qualifying_columns
    }

    /// Classifies, builds the template and binds every record. Either the whole
    /// batch is prepared or an error is returned, never a partial result.
    pub fn prepare(
        &self,
        batch: &RecordBatch,
        hints: &Hints,
    ) -> Result<PreparedBatchUpdate, BatchUpdateError> {
        let mut preparation =
            Preparation { table_name: &self.table.name, state: BatchUpdateState::Classifying };

        match self.run(&mut preparation, batch, hints) {
            Ok(prepared) => {
                preparation.advance(BatchUpdateState::Ready);
                info!(
                    "{} - prepared batch update for {} rows ({} columns)",
                    self.table.name,
                    prepared.row_count(),
                    prepared.template.columns().len()
                );
                Ok(prepared)
            }
            Err(e) => {
                error!(
                    "{} - batch update failed while {}: {}",
                    self.table.name, preparation.state, e
                );
                preparation.advance(BatchUpdateState::Failed);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        preparation: &mut Preparation,
        batch: &RecordBatch,
        hints: &Hints,
    ) -> Result<PreparedBatchUpdate, BatchUpdateError> {
        if batch.is_empty() {
            return Err(BatchUpdateError::EmptyBatch);
        }

        if self.table.primary_keys.is_empty() {
            return Err(BatchUpdateError::NoPrimaryKey { table: self.table.name.clone() });
        }

        let statuses = classify_columns(&self.table.name, &self.qualifying_columns, batch, hints)?;
        let template = build_batch_update_sql(&self.table, &statuses, self.dialect.as_ref());
        preparation.advance(BatchUpdateState::TemplateBuilt);

        let guard = VersionGuard::for_table(&self.table);
        if let Some(guard) = &guard {
            guard.validate(batch)?;
        }

        preparation.advance(BatchUpdateState::Binding);
        let parameters = bind_parameters(&template, &self.table, batch, guard.as_ref())?;

        Ok(PreparedBatchUpdate { template, parameters })
    }
}
