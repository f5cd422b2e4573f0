//! SQLite-based flight store implementation.
//!
//! Recommended for tests and single-host deployments; PostgreSQL is the
//! production store.

use crate::error::{MetadataError, MetadataResult};
use crate::store::{FlightDb, FlightSink, FlightSql, map_lookup_insert_error};
use async_trait::async_trait;
use hangar_core::config::TableConfig;
use hangar_core::{FlightLookupRecord, GpsReading, OoReading};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite-based flight store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    sql: FlightSql,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>, tables: &TableConfig) -> MetadataResult<Self> {
        let path = path.as_ref();
        let sql = FlightSql::render(tables)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MetadataError::Config(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool, sql };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl FlightDb for SqliteStore {
    async fn begin(&self) -> MetadataResult<Box<dyn FlightSink>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteSink {
            tx,
            sql: self.sql.clone(),
        }))
    }

    async fn migrate(&self) -> MetadataResult<()> {
        for statement in [
            &self.sql.create_oo_table,
            &self.sql.create_gps_table,
            &self.sql.create_lookup_table,
            &self.sql.create_lookup_index,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One open ingestion transaction against SQLite.
struct SqliteSink {
    tx: Transaction<'static, Sqlite>,
    sql: FlightSql,
}

#[async_trait]
impl FlightSink for SqliteSink {
    async fn insert_lookup(&mut self, record: &FlightLookupRecord) -> MetadataResult<()> {
        sqlx::query(&self.sql.insert_lookup)
            .bind(&record.locator_1)
            .bind(&record.locator_2)
            .bind(&record.flight_date)
            .bind(&record.flight_code)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_lookup_insert_error(e, record))?;
        Ok(())
    }

    async fn insert_oo(&mut self, reading: &OoReading) -> MetadataResult<()> {
        sqlx::query(&self.sql.insert_oo)
            .bind(reading.sys_time)
            .bind(&reading.field_1)
            .bind(&reading.field_2)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_gps(&mut self, reading: &GpsReading) -> MetadataResult<()> {
        sqlx::query(&self.sql.insert_gps)
            .bind(reading.sys_time)
            .bind(&reading.gps_time)
            .bind(&reading.latitude)
            .bind(&reading.longitude)
            .bind(reading.altitude)
            .bind(reading.ground_elevation)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> MetadataResult<()> {
        self.tx.commit().await.map_err(MetadataError::Database)
    }
}
