use async_trait::async_trait;
use tracing::{debug, error};

use crate::database::batch_update::{
    BatchUpdateError, BatchUpdateTask, Hints, ParameterSet, RecordBatch,
};

/// Applies every parameter set against one statement and reports the affected
/// row count of each, in parameter-set order.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn batch_update(
        &self,
        sql: &str,
        parameters: &[ParameterSet],
    ) -> Result<Vec<u64>, Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum ExecuteBatchUpdateError<E: std::error::Error + 'static> {
    #[error("{0}")]
    Prepare(#[from] BatchUpdateError),

    #[error(transparent)]
    Execution(E),
}

/// Prepares `batch` and hands it to `executor`. Executor errors come back untouched
/// as [`ExecuteBatchUpdateError::Execution`].
pub async fn execute_batch_update<X: BatchExecutor>(
    executor: &X,
    task: &BatchUpdateTask,
    batch: &RecordBatch,
    hints: &Hints,
) -> Result<Vec<u64>, ExecuteBatchUpdateError<X::Error>> {
    if batch.is_empty() {
        return Ok(vec![]);
    }

    let prepared = task.prepare(batch, hints)?;

    debug!("{} - executing batch update: {}", task.table().name, prepared.sql());

    executor.batch_update(prepared.sql(), &prepared.parameters).await.map_err(|e| {
        error!("{} - batch update execution failed: {}", task.table().name, e);
        ExecuteBatchUpdateError::Execution(e)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        database::{batch_update::Row, dialect::MySqlDialect, sql_type_wrapper::SqlValue},
        manifest::table::TableDescriptor,
    };

    #[derive(thiserror::Error, Debug)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(String, Vec<Vec<SqlValue>>)>>,
        fail: bool,
    }

    #[async_trait]
    impl BatchExecutor for RecordingExecutor {
        type Error = ConnectionReset;

        async fn batch_update(
            &self,
            sql: &str,
            parameters: &[ParameterSet],
        ) -> Result<Vec<u64>, Self::Error> {
            if self.fail {
                return Err(ConnectionReset);
            }
            let values = parameters.iter().map(|p| p.values().to_vec()).collect();
            self.calls.lock().unwrap().push((sql.to_string(), values));
            Ok(vec![1; parameters.len()])
        }
    }

    fn task() -> BatchUpdateTask {
        BatchUpdateTask::new(
            TableDescriptor::new("people", &["id", "name"], &["id"]),
            Arc::new(MySqlDialect),
        )
    }

    #[tokio::test]
    async fn test_execute_hands_prepared_batch_to_executor() {
        let executor = RecordingExecutor::default();
        let batch = RecordBatch::Plain(vec![
            Row::new().with("id", 1i64).with("name", "ann"),
            Row::new().with("id", 2i64).with("name", "bo"),
        ]);

        let counts =
            execute_batch_update(&executor, &task(), &batch, &Hints::default()).await.unwrap();

        assert_eq!(counts, vec![1, 1]);
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "UPDATE `people` SET `name` = ? WHERE `id` = ?");
        assert_eq!(calls[0].1[1], vec![SqlValue::from("bo"), SqlValue::I64(2)]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let executor = RecordingExecutor::default();

        let counts = execute_batch_update(
            &executor,
            &task(),
            &RecordBatch::Plain(vec![]),
            &Hints::default(),
        )
        .await
        .unwrap();

        assert!(counts.is_empty());
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_errors_never_reach_executor() {
        let executor = RecordingExecutor::default();
        let batch = RecordBatch::Plain(vec![Row::new().with("id", 1i64)]);

        let err =
            execute_batch_update(&executor, &task(), &batch, &Hints::default()).await.unwrap_err();

        assert!(matches!(
            err,
            ExecuteBatchUpdateError::Prepare(BatchUpdateError::NoUpdatableColumns { .. })
        ));
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_executor_error_propagates_unmodified() {
        let executor = RecordingExecutor { fail: true, ..Default::default() };
        let batch = RecordBatch::Plain(vec![Row::new().with("id", 1i64).with("name", "x")]);

        let err =
            execute_batch_update(&executor, &task(), &batch, &Hints::default()).await.unwrap_err();

        assert!(matches!(err, ExecuteBatchUpdateError::Execution(ConnectionReset)));
        assert_eq!(err.to_string(), "connection reset");
    }
}
