//! SQLite connection setup

use crate::ApplicationResult;
use chrono::{DateTime, SecondsFormat, Utc};
use deptrack_core::{DatabaseConfig, DeptrackError, ErrorContext};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::{debug, info};

/// Open a connection pool for the configured database.
///
/// File databases get their parent directory created. In-memory databases are
/// private to a connection, so they are pinned to a single connection.
pub async fn connect(config: &DatabaseConfig) -> ApplicationResult<SqlitePool> {
    info!("Connecting to database: {}", config.url);

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    if !config.is_in_memory() {
        let db_path = options.get_filename();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating database directory: {}", parent.display());
                std::fs::create_dir_all(parent).map_err(|e| DeptrackError::Storage {
                    message: format!("Failed to create directory {}: {}", parent.display(), e),
                    source: Some(Box::new(e)),
                    context: ErrorContext::new("database").with_operation("create_dir"),
                })?;
            }
        }
    }

    let max_connections = if config.is_in_memory() {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    debug!(max_connections, "Database pool ready");
    Ok(pool)
}

/// Open a private in-memory database
pub async fn connect_in_memory() -> ApplicationResult<SqlitePool> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
}

/// Timestamps are stored as fixed-width RFC 3339 text so that lexical
/// ordering in SQL matches chronological ordering.
pub(crate) fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> ApplicationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| crate::ApplicationError::corrupt(format!("bad timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_shares_one_database() {
        let pool = connect_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE probe (id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM probe")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.db");
        let config = DatabaseConfig {
            url: format!("sqlite:{}", path.display()),
            max_connections: 2,
        };

        let pool = connect(&config).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }

    #[test]
    fn test_timestamp_round_trip_is_ordered() {
        use chrono::SubsecRound;

        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(5);
        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert!(a < b);
        assert_eq!(parse_timestamp(&a).unwrap(), earlier.trunc_subsecs(6));
    }
}
