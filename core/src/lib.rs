pub mod manifest;

mod database;
pub use database::{
    batch_update::{
        bind_parameters, build_batch_update_sql, classify_columns, BatchUpdateError,
        BatchUpdateState, BatchUpdateTask, ColumnStatus, ColumnStatuses, Hints, ParameterSet,
        PreparedBatchUpdate, RecordBatch, Row, SqlTemplate, TrackedRow, VersionGuard,
    },
    dialect::{
        dialect_from_name, supported_dialects, MySqlDialect, OracleDialect, PostgresDialect,
        SqlDialect, SqlServerDialect, UnknownDialectError,
    },
    executor::{execute_batch_update, BatchExecutor, ExecuteBatchUpdateError},
    postgres::client::{PostgresClient, PostgresConnectionError, PostgresError},
    sql_type_wrapper::SqlValue,
};

mod logger;
pub use logger::{setup_info_logger, setup_logger, setup_manifest_logger};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tokio_postgres::types::{ToSql, Type as PgType};
pub use tracing::{error as dalbatch_error, info as dalbatch_info};
