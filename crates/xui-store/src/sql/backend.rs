//! SQLite panel store.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::backup::{BackupMethod, backup_target, copy_file, local_now};
use crate::error::StoreError;
use crate::record::InboundRow;
use crate::traits::PanelStore;
use crate::usage::UsageRow;
use crate::writes::{CommitReceipt, PendingWrites};

use super::config::SqliteStoreConfig;
use super::queries;

/// Panel store backed by the panel's own SQLite database.
///
/// Never creates a database: a missing file or a file without an
/// `inbounds` table is reported as [`StoreError::Unavailable`].
pub struct SqlitePanelStore {
    pool: SqlitePool,
    config: SqliteStoreConfig,
}

impl SqlitePanelStore {
    /// Open an existing panel database.
    pub async fn connect(config: SqliteStoreConfig) -> Result<Self, StoreError> {
        let options = if config.is_url() {
            SqliteConnectOptions::from_str(&config.database).map_err(StoreError::unavailable)?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database)
                .create_if_missing(false)
        };
        let options = options.busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", config.database)))?;

        let store = Self { pool, config };
        store.check_schema().await?;
        debug!(database = %store.config.database, "panel database opened");
        Ok(store)
    }

    async fn check_schema(&self) -> Result<(), StoreError> {
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'inbounds'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;
        if tables == 0 {
            return Err(StoreError::Unavailable(format!(
                "{}: no inbounds table, not a panel database",
                self.config.database
            )));
        }
        Ok(())
    }

    fn parse_inbound_row(row: &SqliteRow) -> Result<InboundRow, sqlx::Error> {
        Ok(InboundRow {
            id: row.try_get("id")?,
            remark: row.try_get::<Option<String>, _>("remark")?.unwrap_or_default(),
            port: row.try_get::<Option<i64>, _>("port")?.unwrap_or(0),
            protocol: row.try_get::<Option<String>, _>("protocol")?.unwrap_or_default(),
            settings: row.try_get::<Option<String>, _>("settings")?.unwrap_or_default(),
        })
    }

    fn parse_usage_row(row: &SqliteRow) -> Result<UsageRow, sqlx::Error> {
        Ok(UsageRow {
            email: row.try_get::<Option<String>, _>("email")?.unwrap_or_default(),
            up: row.try_get::<Option<i64>, _>("up")?.unwrap_or(0),
            down: row.try_get::<Option<i64>, _>("down")?.unwrap_or(0),
        })
    }

    fn is_missing_table(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db) if db.message().contains("no such table"))
    }

    /// Run every pending statement inside `tx`.
    async fn write_all(
        tx: &mut Transaction<'_, Sqlite>,
        writes: &PendingWrites,
    ) -> Result<CommitReceipt, StoreError> {
        let mut receipt = CommitReceipt::default();

        for doc in &writes.documents {
            let result = sqlx::query(queries::UPDATE_SETTINGS)
                .bind(&doc.settings)
                .bind(doc.inbound_id)
                .execute(&mut **tx)
                .await
                .map_err(StoreError::commit_failed)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::CommitFailed(format!(
                    "inbound {} no longer exists",
                    doc.inbound_id
                )));
            }
            receipt.documents_written += 1;
        }

        for update in &writes.rows {
            let result = sqlx::query(queries::UPDATE_CLIENT_ROW)
                .bind(update.expiry_time)
                .bind(update.total)
                .bind(update.enable)
                .bind(&update.email)
                .execute(&mut **tx)
                .await
                .map_err(StoreError::commit_failed)?;
            if result.rows_affected() == 0 {
                warn!(email = %update.email, "no usage row to mirror client state into");
                receipt.rows_missing += 1;
            } else {
                receipt.rows_updated += 1;
            }
        }

        for email in &writes.usage_resets {
            sqlx::query(queries::RESET_USAGE)
                .bind(email)
                .execute(&mut **tx)
                .await
                .map_err(StoreError::commit_failed)?;
            receipt.usage_resets += 1;
        }

        Ok(receipt)
    }

    /// Get the connection pool (for advanced usage).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

#[async_trait]
impl PanelStore for SqlitePanelStore {
    async fn load_inbounds(&self) -> Result<Vec<InboundRow>, StoreError> {
        let rows = sqlx::query(queries::LOAD_INBOUNDS)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        rows.iter()
            .map(Self::parse_inbound_row)
            .collect::<Result<_, _>>()
            .map_err(StoreError::unavailable)
    }

    async fn load_usage(&self) -> Result<Vec<UsageRow>, StoreError> {
        match sqlx::query(queries::LOAD_USAGE).fetch_all(&self.pool).await {
            Ok(rows) => rows
                .iter()
                .map(Self::parse_usage_row)
                .collect::<Result<_, _>>()
                .map_err(StoreError::unavailable),
            Err(e) if Self::is_missing_table(&e) => {
                warn!("client_traffics table missing, treating all usage as zero");
                Ok(Vec::new())
            }
            Err(e) => Err(StoreError::unavailable(e)),
        }
    }

    async fn backup(&self) -> Result<PathBuf, StoreError> {
        let file = self.config.file_path();
        if file.is_none() && self.config.backup_dir.is_none() {
            return Err(StoreError::BackupFailed(
                "in-memory database needs an explicit backup directory".into(),
            ));
        }
        let reference = file.clone().unwrap_or_else(|| PathBuf::from("memory.db"));
        let target = backup_target(&reference, self.config.backup_dir.as_deref(), local_now())?;
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StoreError::backup_failed)?;
        }

        match self.config.backup_method {
            BackupMethod::Vacuum => {
                let statement = format!(
                    "VACUUM INTO '{}'",
                    target.to_string_lossy().replace('\'', "''")
                );
                sqlx::query(&statement)
                    .execute(&self.pool)
                    .await
                    .map_err(StoreError::backup_failed)?;
            }
            BackupMethod::Copy => {
                let Some(src) = file else {
                    return Err(StoreError::BackupFailed(
                        "copy backups need a database file".into(),
                    ));
                };
                copy_file(&src, &target).await?;
            }
        }

        info!(path = %target.display(), "database backed up");
        Ok(target)
    }

    async fn commit(&self, writes: &PendingWrites) -> Result<CommitReceipt, StoreError> {
        if writes.is_empty() {
            return Ok(CommitReceipt::default());
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::commit_failed)?;

        match Self::write_all(&mut tx, writes).await {
            Ok(receipt) => {
                tx.commit().await.map_err(StoreError::commit_failed)?;
                info!(
                    documents = receipt.documents_written,
                    rows = receipt.rows_updated,
                    resets = receipt.usage_resets,
                    "changes committed"
                );
                Ok(receipt)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

// Debug implementation (pool internals are noise)
impl std::fmt::Debug for SqlitePanelStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePanelStore")
            .field("database", &self.config.database)
            .field("max_connections", &self.config.max_connections)
            .field("backup_method", &self.config.backup_method)
            .finish_non_exhaustive()
    }
}
