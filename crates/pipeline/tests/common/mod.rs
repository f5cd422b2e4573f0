//! Shared test fixtures: in-memory object store and fake parsers.

use async_trait::async_trait;
use bytes::Bytes;
use hangar_pipeline::error::{PipelineError, PipelineResult};
use hangar_pipeline::parsers::{GpsParser, OO_INDEX_FILE, OoParser};
use hangar_storage::{ListedPage, ObjectEntry, ObjectStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use time::macros::{datetime, format_description};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

/// In-memory object store with configurable page size, so tests exercise the
/// pagination loop rather than a single exhaustive page.
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, (Bytes, Option<OffsetDateTime>)>>,
    page_size: usize,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size,
        }
    }

    pub fn put(&self, key: &str, data: &[u8], last_modified: Option<OffsetDateTime>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            (Bytes::copy_from_slice(data), last_modified),
        );
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn download(&self, key: &str, dest: &Path) -> StorageResult<u64> {
        let data = self.get(key).await?;
        tokio::fs::write(dest, &data).await.map_err(StorageError::Io)?;
        Ok(data.len() as u64)
    }

    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListedPage> {
        let objects = self.objects.lock().unwrap();
        let matching: Vec<ObjectEntry> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (_, last_modified))| ObjectEntry {
                key: key.clone(),
                last_modified: *last_modified,
            })
            .collect();

        let start: usize = match token {
            Some(token) => token
                .parse()
                .map_err(|_| StorageError::InvalidKey(format!("bad token {token:?}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(matching.len());
        let truncated = end < matching.len();

        Ok(ListedPage {
            entries: matching[start..end].to_vec(),
            truncated,
            next_token: truncated.then(|| end.to_string()),
        })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Object store whose listing calls always fail, for infrastructure-failure
/// propagation tests.
#[allow(dead_code)]
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn exists(&self, _key: &str) -> StorageResult<bool> {
        Err(transport_error())
    }

    async fn get(&self, _key: &str) -> StorageResult<Bytes> {
        Err(transport_error())
    }

    async fn download(&self, _key: &str, _dest: &Path) -> StorageResult<u64> {
        Err(transport_error())
    }

    async fn list_page(&self, _prefix: &str, _token: Option<&str>) -> StorageResult<ListedPage> {
        Err(transport_error())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

fn transport_error() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "simulated transport failure",
    ))
}

/// Base timestamp every fake parser counts seconds from.
#[allow(dead_code)]
pub const BASE_TIME: PrimitiveDateTime = datetime!(2020-03-03 10:15:30);

/// Fake OO parser: writes an index plus `samples` one-per-second sample
/// files, in the shape the real vendor parser produces.
#[allow(dead_code)]
pub struct FakeOoParser {
    pub samples: usize,
}

#[async_trait]
impl OoParser for FakeOoParser {
    async fn parse(&self, _input: &Path, output_dir: &Path) -> PipelineResult<()> {
        let header_format = format_description!(
            "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [year]"
        );

        let mut names = Vec::with_capacity(self.samples);
        for i in 0..self.samples {
            let name = format!("sample_{i:05}");
            let stamp = (BASE_TIME + Duration::seconds(i as i64))
                .format(&header_format)
                .expect("fixed format");
            let body = format!(
                "Timestamp : systime : {stamp}\nData : values : {:.1},0.883\n",
                400.0 + i as f64
            );
            tokio::fs::write(output_dir.join(format!("{name}.txt")), body)
                .await
                .map_err(io_parse_error)?;
            names.push(name);
        }

        tokio::fs::write(output_dir.join(OO_INDEX_FILE), format!("{},\n", names.join(",")))
            .await
            .map_err(io_parse_error)?;
        Ok(())
    }
}

/// Fake GPS parser: writes `<input>.csv` with `rows` one-per-second rows.
#[allow(dead_code)]
pub struct FakeGpsParser {
    pub rows: usize,
    /// When set, emit one malformed row to trigger a parse failure.
    pub malformed: bool,
}

#[async_trait]
impl GpsParser for FakeGpsParser {
    async fn parse(&self, input: &Path) -> PipelineResult<()> {
        let sys_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

        let mut out = String::from("sys_time,gps_time,lat,lat_hem,lon,lon_hem,alt,ground\n");
        for i in 0..self.rows {
            let stamp = (BASE_TIME + Duration::seconds(i as i64))
                .format(&sys_format)
                .expect("fixed format");
            out.push_str(&format!(
                "{stamp},101530.00,4043.3220,N,07359.6110,W,{:.1},10.0\n",
                120.0 + i as f64
            ));
        }
        if self.malformed {
            out.push_str("not,a,gps,row\n");
        }

        let mut csv_path = input.as_os_str().to_owned();
        csv_path.push(".csv");
        tokio::fs::write(std::path::PathBuf::from(csv_path), out)
            .await
            .map_err(io_parse_error)?;
        Ok(())
    }
}

fn io_parse_error(e: std::io::Error) -> PipelineError {
    PipelineError::Parse {
        artifact: "fake parser output".to_string(),
        reason: e.to_string(),
    }
}
