//! A concrete implementation of the [`AlertRepository`] using SQLite.
//!
//! [`AlertRepository`]: crate::persistence::traits::AlertRepository

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

mod alert_repository;

use crate::persistence::error::PersistenceError;

/// SQLite backed storage for alerts and block processing progress.
pub struct SqliteStateRepository {
    /// The SQLite connection pool used for database operations.
    pool: SqlitePool,
}

impl SqliteStateRepository {
    /// Opens the database at `database_url`, creating the file if it does not
    /// exist.
    ///
    /// An in-memory database lives inside a single connection, so the pool is
    /// limited to that connection and never recycles it.
    #[tracing::instrument(level = "info")]
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        tracing::debug!(database_url, "Attempting to connect to SQLite database.");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PersistenceError::InvalidInput(e.to_string()))?
            .create_if_missing(true);

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            PersistenceError::OperationFailed(format!("Failed to connect to database: {}", e))
        })?;
        tracing::info!(database_url, "Successfully connected to SQLite database.");
        Ok(Self { pool })
    }

    /// Runs database migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn run_migrations(&self) -> Result<(), PersistenceError> {
        tracing::debug!("Running database migrations.");
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run database migrations.");
            PersistenceError::MigrationError(e.to_string())
        })?;
        tracing::info!("Database migrations completed successfully.");
        Ok(())
    }

    /// Gets access to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool gracefully.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn close(&self) {
        tracing::debug!("Closing SQLite connection pool.");
        self.pool.close().await;
        tracing::info!("SQLite connection pool closed successfully.");
    }

    /// Helper to execute database queries with consistent error handling.
    async fn execute_query_with_error_handling<F, T, E>(
        &self,
        operation: &str,
        query_fn: F,
    ) -> Result<T, PersistenceError>
    where
        F: std::future::Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        query_fn.await.map_err(|e| {
            tracing::error!(error = %e, operation = %operation, "Database operation failed.");
            PersistenceError::OperationFailed(e.to_string())
        })
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Converts a block height to the signed integer SQLite stores.
fn to_db_height(block_height: u64) -> Result<i64, PersistenceError> {
    i64::try_from(block_height).map_err(|error| {
        tracing::error!(error = %error, block_height, "Block height does not fit in the database.");
        PersistenceError::InvalidInput(format!("block height {block_height} is out of range"))
    })
}

/// Converts a stored block height back to `u64`.
fn from_db_height(block_height: i64) -> Result<u64, PersistenceError> {
    u64::try_from(block_height).map_err(|error| {
        tracing::error!(error = %error, block_height, "Stored block height is negative.");
        PersistenceError::SerializationError(format!("invalid stored block height {block_height}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_with_invalid_url() {
        let result = SqliteStateRepository::new("sqlite::memory:?mode=bogus").await;
        assert!(matches!(result, Err(PersistenceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_file_database_is_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("alerts.db");
        let url = format!("sqlite:{}", path.display());

        let repo = SqliteStateRepository::new(&url).await.unwrap();
        repo.run_migrations().await.unwrap();
        repo.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let repo = SqliteStateRepository::new("sqlite::memory:").await.unwrap();
        repo.run_migrations().await.unwrap();
        repo.run_migrations().await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite%' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(repo.pool())
        .await
        .unwrap();
        let tables: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(
            tables,
            vec!["block_height_alerts", "name_alert_triggers", "name_alerts", "processed_blocks"]
        );
    }

    #[test]
    fn test_height_conversions() {
        assert_eq!(to_db_height(62517).unwrap(), 62517);
        assert!(matches!(to_db_height(u64::MAX), Err(PersistenceError::InvalidInput(_))));
        assert_eq!(from_db_height(62517).unwrap(), 62517);
        assert!(matches!(from_db_height(-1), Err(PersistenceError::SerializationError(_))));
    }
}
