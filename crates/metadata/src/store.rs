//! Flight store traits and shared SQL construction.

use crate::error::{MetadataError, MetadataResult};
use async_trait::async_trait;
use hangar_core::config::TableConfig;
use hangar_core::{FlightLookupRecord, GpsReading, OoReading};

/// Fixed table names. The OO table and the lookup/locator columns are
/// deployment-configurable instead (see [`TableConfig`]).
pub const GPS_TABLE: &str = "gps";
pub const LOOKUP_TABLE: &str = "flight_lookup";

/// A single open ingestion transaction.
///
/// Rows streamed into a sink are durable only if `commit` succeeds; dropping
/// the sink without committing rolls the transaction back. One sink owns its
/// connection for its whole lifetime.
#[async_trait]
pub trait FlightSink: Send {
    /// Stage the flight lookup row.
    async fn insert_lookup(&mut self, record: &FlightLookupRecord) -> MetadataResult<()>;

    /// Stage one OO reading.
    async fn insert_oo(&mut self, reading: &OoReading) -> MetadataResult<()>;

    /// Stage one GPS reading.
    async fn insert_gps(&mut self, reading: &GpsReading) -> MetadataResult<()>;

    /// Commit everything staged so far as one atomic unit.
    async fn commit(self: Box<Self>) -> MetadataResult<()>;
}

/// Transactional flight store.
#[async_trait]
pub trait FlightDb: Send + Sync + 'static {
    /// Open a new ingestion transaction.
    async fn begin(&self) -> MetadataResult<Box<dyn FlightSink>>;

    /// Create tables and indexes if they do not exist.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// Validate a configurable SQL identifier before interpolation.
///
/// Values are always bound as parameters; identifiers cannot be, so they are
/// restricted to ASCII alphanumerics and underscores with a non-digit first
/// character.
pub fn validate_identifier(name: &str) -> MetadataResult<()> {
    let mut chars = name.chars();
    let valid_first = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_first && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(MetadataError::InvalidIdentifier(name.to_string()))
    }
}

/// Statements rendered once from the validated table configuration.
///
/// Placeholders use `$N`, which both PostgreSQL and SQLite accept.
#[derive(Clone, Debug)]
pub struct FlightSql {
    pub insert_oo: String,
    pub insert_gps: String,
    pub insert_lookup: String,
    pub create_oo_table: String,
    pub create_gps_table: String,
    pub create_lookup_table: String,
    pub create_lookup_index: String,
}

impl FlightSql {
    pub fn render(tables: &TableConfig) -> MetadataResult<Self> {
        for identifier in [
            &tables.oo_table,
            &tables.oo_column_1,
            &tables.oo_column_2,
            &tables.locator_column_1,
            &tables.locator_column_2,
        ] {
            validate_identifier(identifier)?;
        }

        Ok(Self {
            insert_oo: format!(
                "INSERT INTO {} (sys_time, {}, {}) VALUES ($1, $2, $3)",
                tables.oo_table, tables.oo_column_1, tables.oo_column_2
            ),
            insert_gps: format!(
                "INSERT INTO {GPS_TABLE} (sys_time, gps_time, latitude, longitude, altitude, ground_elevation) \
                 VALUES ($1, $2, $3, $4, $5, $6)"
            ),
            insert_lookup: format!(
                "INSERT INTO {LOOKUP_TABLE} ({}, {}, flight_date, flight_code) VALUES ($1, $2, $3, $4)",
                tables.locator_column_1, tables.locator_column_2
            ),
            create_oo_table: format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 sys_time TIMESTAMP NOT NULL, \
                 {} TEXT NOT NULL, \
                 {} TEXT NOT NULL)",
                tables.oo_table, tables.oo_column_1, tables.oo_column_2
            ),
            create_gps_table: format!(
                "CREATE TABLE IF NOT EXISTS {GPS_TABLE} (\
                 sys_time TIMESTAMP NOT NULL, \
                 gps_time TEXT NOT NULL, \
                 latitude TEXT NOT NULL, \
                 longitude TEXT NOT NULL, \
                 altitude DOUBLE PRECISION NOT NULL, \
                 ground_elevation DOUBLE PRECISION NOT NULL)"
            ),
            create_lookup_table: format!(
                "CREATE TABLE IF NOT EXISTS {LOOKUP_TABLE} (\
                 {} TEXT NOT NULL, \
                 {} TEXT NOT NULL, \
                 flight_date TEXT NOT NULL, \
                 flight_code TEXT NOT NULL)",
                tables.locator_column_1, tables.locator_column_2
            ),
            // Re-ingesting an already-committed flight fails loudly here
            // instead of silently duplicating its GPS and OO rows.
            create_lookup_index: format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_flight_lookup_date_code \
                 ON {LOOKUP_TABLE} (flight_date, flight_code)"
            ),
        })
    }
}

/// Map a lookup-insert failure onto the duplicate-flight error when the
/// unique index rejected it.
pub(crate) fn map_lookup_insert_error(
    err: sqlx::Error,
    record: &FlightLookupRecord,
) -> MetadataError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return MetadataError::DuplicateFlight {
            flight_date: record.flight_date.clone(),
            flight_code: record.flight_code.clone(),
        };
    }
    MetadataError::Database(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        validate_identifier("oo_readings").unwrap();
        validate_identifier("_private").unwrap();
        validate_identifier("Channel2").unwrap();
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("drop table;--").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn render_rejects_bad_identifiers() {
        let mut tables = TableConfig::default();
        tables.oo_column_1 = "bad column".to_string();
        assert!(matches!(
            FlightSql::render(&tables),
            Err(MetadataError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn render_interpolates_configured_names() {
        let sql = FlightSql::render(&TableConfig::default()).unwrap();
        assert_eq!(
            sql.insert_oo,
            "INSERT INTO oo_readings (sys_time, channel_a, channel_b) VALUES ($1, $2, $3)"
        );
        assert!(sql.insert_lookup.starts_with(
            "INSERT INTO flight_lookup (raw_locator, processed_locator, flight_date, flight_code)"
        ));
    }
}
