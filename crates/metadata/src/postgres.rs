//! PostgreSQL-based flight store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::store::{FlightDb, FlightSink, FlightSql, map_lookup_insert_error};
use async_trait::async_trait;
use hangar_core::config::{PgSslMode, TableConfig};
use hangar_core::{FlightLookupRecord, GpsReading, OoReading};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres, Transaction};
use std::str::FromStr;

/// PostgreSQL-based flight store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
    sql: FlightSql,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        tables: &TableConfig,
        max_connections: u32,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, tables, max_connections).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        tables: &TableConfig,
        max_connections: u32,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, tables, max_connections).await
    }

    /// Internal: Connect to PostgreSQL with the given options.
    async fn connect(
        opts: PgConnectOptions,
        tables: &TableConfig,
        max_connections: u32,
    ) -> MetadataResult<Self> {
        let sql = FlightSql::render(tables)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool, sql };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl FlightDb for PostgresStore {
    async fn begin(&self) -> MetadataResult<Box<dyn FlightSink>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresSink {
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

/// One open ingestion transaction against PostgreSQL.
///
/// Dropping without commit rolls back via sqlx's transaction guard, so every
/// failure exit path releases the connection with nothing applied.
struct PostgresSink {
    tx: Transaction<'static, Postgres>,
    sql: FlightSql,
}

#[async_trait]
impl FlightSink for PostgresSink {
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
