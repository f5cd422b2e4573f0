//! Relational flight store for hangar.
//!
//! This crate provides the data plane the pipeline commits into:
//! - Schema bootstrap for the OO, GPS, and flight-lookup tables (table and
//!   domain-column identifiers are deployment configuration)
//! - The [`FlightDb`]/[`FlightSink`] transaction seam: rows streamed into a
//!   sink become durable only when the single commit succeeds

pub mod error;
pub mod postgres;
pub mod sqlite;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;
pub use store::{FlightDb, FlightSink, GPS_TABLE, LOOKUP_TABLE};

use hangar_core::config::{MetadataConfig, TableConfig};
use std::sync::Arc;

/// Create a flight store from configuration.
pub async fn from_config(
    config: &MetadataConfig,
    tables: &TableConfig,
) -> MetadataResult<Arc<dyn FlightDb>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path, tables).await?;
            Ok(Arc::new(store) as Arc<dyn FlightDb>)
        }
        MetadataConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
        } => {
            let store = if let Some(url) = url {
                // URL takes precedence for backward compatibility
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, tables, *max_connections).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    tables,
                    *max_connections,
                )
                .await?
            } else {
                return Err(MetadataError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn FlightDb>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hangar_core::FlightKey;
    use hangar_core::reading::parse_gps_sys_time;
    use hangar_core::{GpsReading, OoReading};

    async fn sqlite_store() -> (tempfile::TempDir, SqliteStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("flights.db"), &TableConfig::default())
            .await
            .unwrap();
        (temp_dir, store)
    }

    fn gps_reading(sys_time: &str) -> GpsReading {
        GpsReading {
            sys_time: parse_gps_sys_time(sys_time).unwrap(),
            gps_time: "101530.00".to_string(),
            latitude: "+4043.3220".to_string(),
            longitude: "-07359.6110".to_string(),
            altitude: 120.5,
            ground_elevation: 10.0,
        }
    }

    fn oo_reading(sys_time: &str) -> OoReading {
        OoReading {
            sys_time: parse_gps_sys_time(sys_time).unwrap(),
            field_1: "412.5".to_string(),
            field_2: "0.883".to_string(),
        }
    }

    #[tokio::test]
    async fn test_from_config_sqlite() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("flights.db");
        let config = MetadataConfig::Sqlite {
            path: db_path.clone(),
        };

        let store = from_config(&config, &TableConfig::default()).await.unwrap();
        store.health_check().await.unwrap();
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn committed_rows_are_durable() {
        let (_temp, store) = sqlite_store().await;
        let flight = FlightKey::parse("2020-03-03/ABCD/").unwrap();

        let mut sink = store.begin().await.unwrap();
        sink.insert_lookup(&flight.lookup_record(Some("s3://raw"), Some("s3://processed")))
            .await
            .unwrap();
        sink.insert_oo(&oo_reading("2020-03-03 10:15:30")).await.unwrap();
        sink.insert_gps(&gps_reading("2020-03-03 10:15:30")).await.unwrap();
        sink.insert_gps(&gps_reading("2020-03-03 10:15:31")).await.unwrap();
        sink.commit().await.unwrap();

        let lookups: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flight_lookup")
            .fetch_one(store.pool())
            .await
            .unwrap();
        let gps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gps")
            .fetch_one(store.pool())
            .await
            .unwrap();
        let oo: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM oo_readings")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!((lookups, gps, oo), (1, 2, 1));
    }

    #[tokio::test]
    async fn dropped_sink_rolls_back() {
        let (_temp, store) = sqlite_store().await;

        {
            let mut sink = store.begin().await.unwrap();
            sink.insert_gps(&gps_reading("2020-03-03 10:15:30")).await.unwrap();
            // Dropped without commit.
        }

        let gps: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gps")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(gps, 0);
    }

    #[tokio::test]
    async fn duplicate_flight_is_rejected() {
        let (_temp, store) = sqlite_store().await;
        let flight = FlightKey::parse("2020-03-03/ABCD/").unwrap();
        let record = flight.lookup_record(None, None);

        let mut sink = store.begin().await.unwrap();
        sink.insert_lookup(&record).await.unwrap();
        sink.commit().await.unwrap();

        let mut sink = store.begin().await.unwrap();
        let err = sink.insert_lookup(&record).await.unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateFlight { .. }));
    }
}
