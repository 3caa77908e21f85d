use std::{env, time::Duration};

use async_trait::async_trait;
use bb8::{Pool, RunError};
use bb8_postgres::PostgresConnectionManager;
use dotenv::dotenv;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::{task, time::timeout};
use tokio_postgres::{config::SslMode, Config, Error as PgError};
use tracing::{debug, error};

use crate::database::{batch_update::ParameterSet, executor::BatchExecutor};

pub fn connection_string() -> Result<String, env::VarError> {
    dotenv().ok();
    let connection = env::var("DATABASE_URL")?;
    Ok(connection)
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresConnectionError {
    #[error("The database connection string is wrong please check your environment: {0}")]
    DatabaseConnectionConfigWrong(#[from] env::VarError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] tokio_postgres::Error),

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Could not create tls connector")]
    CouldNotCreateTlsConnector,
}

#[derive(thiserror::Error, Debug)]
pub enum PostgresError {
    #[error("PgError {0}")]
    PgError(#[from] PgError),

    #[error("Connection pool error: {0}")]
    ConnectionPoolError(#[from] RunError<tokio_postgres::Error>),

    #[error("Batch update failed at row {row}: {source}")]
    BatchRowError {
        row: usize,
        #[source]
        source: PgError,
    },
}

pub struct PostgresClient {
    pool: Pool<PostgresConnectionManager<MakeTlsConnector>>,
}

impl PostgresClient {
    /// Connects using `DATABASE_URL`, retrying without TLS when the server refuses it
    /// and the connection string does not demand it.
    pub async fn new() -> Result<Self, PostgresConnectionError> {
        Self::connect(&connection_string()?).await
    }

    pub async fn connect(connection_str: &str) -> Result<Self, PostgresConnectionError> {
        async fn _connect(
            connection_str: &str,
            disable_ssl: bool,
        ) -> Result<PostgresClient, PostgresConnectionError> {
            let mut config: Config = connection_str
                .parse()
                .map_err(|_| PostgresConnectionError::CouldNotParseConnectionString)?;

            if disable_ssl {
                config.ssl_mode(SslMode::Disable);
            }

            let connector = TlsConnector::builder()
                .build()
                .map_err(|_| PostgresConnectionError::CouldNotCreateTlsConnector)?;
            let tls_connector = MakeTlsConnector::new(connector);

            let (client, connection) =
                match timeout(Duration::from_millis(5000), config.connect(tls_connector.clone()))
                    .await
                {
                    Ok(Ok((client, connection))) => (client, connection),
                    Ok(Err(e)) => {
                        if !disable_ssl
                            && config.get_ssl_mode() != SslMode::Disable
                            && !connection_str.contains("sslmode=require")
                        {
                            return Box::pin(_connect(connection_str, true)).await;
                        }
                        error!("Error connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                    Err(e) => {
                        error!("Timeout connecting to database: {}", e);
                        return Err(PostgresConnectionError::CanNotConnectToDatabase);
                    }
                };

            let connection_handle = task::spawn(connection);

            if client.query_one("SELECT 1", &[]).await.is_err() {
                return Err(PostgresConnectionError::CanNotConnectToDatabase);
            }

            drop(client);
            match connection_handle.await {
                Ok(Ok(())) => (),
                _ => return Err(PostgresConnectionError::CanNotConnectToDatabase),
            }

            let manager = PostgresConnectionManager::new(config, tls_connector);
            let pool = Pool::builder().build(manager).await?;

            Ok(PostgresClient { pool })
        }

        _connect(connection_str, false).await
    }

    /// Runs every parameter set against `query` in one transaction. Any failing row
    /// rolls the whole batch back.
    pub async fn batch_update(
        &self,
        query: &str,
        params_list: &[ParameterSet],
    ) -> Result<Vec<u64>, PostgresError> {
        let mut conn = self.pool.get().await?;
        let transaction = conn.transaction().await.map_err(PostgresError::PgError)?;
        let statement = transaction.prepare(query).await.map_err(PostgresError::PgError)?;

        let mut counts = Vec::with_capacity(params_list.len());
        for (row, params) in params_list.iter().enumerate() {
            let count = transaction
                .execute(&statement, &params.as_params())
                .await
                .map_err(|source| PostgresError::BatchRowError { row, source })?;
            counts.push(count);
        }

        transaction.commit().await.map_err(PostgresError::PgError)?;

        debug!("Batch update applied {} parameter sets", counts.len());

        Ok(counts)
    }
}

#[async_trait]
impl BatchExecutor for PostgresClient {
    type Error = PostgresError;

    async fn batch_update(
        &self,
        sql: &str,
        parameters: &[ParameterSet],
    ) -> Result<Vec<u64>, Self::Error> {
        PostgresClient::batch_update(self, sql, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sql_type_wrapper::SqlValue;

    const TABLE: &str = "dalbatch_client_batch_update";

    async fn seeded_client() -> PostgresClient {
        let client = PostgresClient::new().await.unwrap();
        let conn = client.pool.get().await.unwrap();
        conn.batch_execute(&format!(
            "DROP TABLE IF EXISTS {TABLE}; \
             CREATE TABLE {TABLE} (id INT8 PRIMARY KEY, qty INT4 NOT NULL); \
             INSERT INTO {TABLE} VALUES (1, 10), (2, 20);"
        ))
        .await
        .unwrap();
        drop(conn);
        client
    }

    async fn quantities(client: &PostgresClient) -> Vec<i32> {
        let conn = client.pool.get().await.unwrap();
        let rows = conn.query(&format!("SELECT qty FROM {TABLE} ORDER BY id"), &[]).await.unwrap();
        rows.iter().map(|row| row.get(0)).collect()
    }

    fn sets(rows: Vec<(SqlValue, i64)>) -> Vec<ParameterSet> {
        rows.into_iter().map(|(qty, id)| ParameterSet::from(vec![qty, SqlValue::I64(id)])).collect()
    }

    #[tokio::test]
    #[ignore = "needs a postgres database in DATABASE_URL"]
    async fn test_batch_update_commits_and_rolls_back() {
        let client = seeded_client().await;
        let sql = format!("UPDATE {TABLE} SET qty = $1 WHERE id = $2");

        let counts = client
            .batch_update(&sql, &sets(vec![(SqlValue::I64(11), 1), (SqlValue::from("21"), 2)]))
            .await
            .unwrap();
        assert_eq!(counts, vec![1, 1]);
        assert_eq!(quantities(&client).await, vec![11, 21]);

        let stale = client.batch_update(&sql, &sets(vec![(SqlValue::I64(99), 3)])).await.unwrap();
        assert_eq!(stale, vec![0]);

        // second row violates NOT NULL, the first row's update must not survive
        let err = client
            .batch_update(&sql, &sets(vec![(SqlValue::I64(12), 1), (SqlValue::Null, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PostgresError::BatchRowError { row: 1, .. }));
        assert_eq!(quantities(&client).await, vec![11, 21]);

        let conn = client.pool.get().await.unwrap();
        conn.batch_execute(&format!("DROP TABLE {TABLE}")).await.unwrap();
    }
}
