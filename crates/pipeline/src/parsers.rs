//! External parser invocation and parser-output readers.
//!
//! The OO and GPS parsers are external programs owned by the instrument
//! vendors; the pipeline shells out to them and reads back their file
//! output. Both are trait seams so tests can substitute fakes that write the
//! same shapes.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use hangar_core::reading::{parse_gps_sys_time, parse_oo_header_time, signed_coordinate};
use hangar_core::{GpsReading, OoReading};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Name of the index file the OO parser writes into its output directory.
pub const OO_INDEX_FILE: &str = "timelist.txt";

/// Converts a raw OO log into an index file plus per-sample artifacts.
#[async_trait]
pub trait OoParser: Send + Sync {
    async fn parse(&self, input: &Path, output_dir: &Path) -> PipelineResult<()>;
}

/// Converts a raw GPS log into a tabular file at `<input>.csv`.
#[async_trait]
pub trait GpsParser: Send + Sync {
    async fn parse(&self, input: &Path) -> PipelineResult<()>;
}

async fn run_parser(program: &Path, args: &[&Path], artifact: &Path) -> PipelineResult<()> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let artifact_name = artifact.display().to_string();
    let child = cmd
        .spawn()
        .map_err(|e| PipelineError::parse(&artifact_name, format!("failed to spawn {}: {e}", program.display())))?;
    let output = child
        .wait_with_output()
        .await
        .map_err(|e| PipelineError::parse(&artifact_name, format!("{} did not finish: {e}", program.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PipelineError::parse(
            &artifact_name,
            format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            ),
        ));
    }

    tracing::debug!(parser = %program.display(), artifact = %artifact_name, "Parser finished");
    Ok(())
}

/// Production OO parser: `<command> <input> <output-dir>`.
pub struct CommandOoParser {
    command: PathBuf,
}

impl CommandOoParser {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl OoParser for CommandOoParser {
    async fn parse(&self, input: &Path, output_dir: &Path) -> PipelineResult<()> {
        run_parser(&self.command, &[input, output_dir], input).await
    }
}

/// Production GPS parser: `<command> <input>`.
pub struct CommandGpsParser {
    command: PathBuf,
}

impl CommandGpsParser {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl GpsParser for CommandGpsParser {
    async fn parse(&self, input: &Path) -> PipelineResult<()> {
        run_parser(&self.command, &[input], input).await
    }
}

/// The path the GPS parser writes its tabular output to: `<input>.csv`.
pub fn gps_csv_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(".csv");
    PathBuf::from(path)
}

async fn read_file(path: &Path) -> PipelineResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::parse(path.display().to_string(), e))
}

/// Split one ` : `-delimited parser record and return its third field.
fn third_field<'a>(line: &'a str, artifact: &str) -> PipelineResult<&'a str> {
    line.splitn(3, " : ")
        .nth(2)
        .ok_or_else(|| PipelineError::parse(artifact, "expected a ' : '-delimited record with 3 fields"))
}

/// Read every OO reading from a parser output directory.
///
/// The index file lists the per-sample base names on one comma-separated
/// line; empty entries (a trailing comma is common) are skipped. Each sample
/// file carries the timestamp on its first line and the comma-split data
/// pair on its second.
pub async fn read_oo_output(output_dir: &Path) -> PipelineResult<Vec<OoReading>> {
    let index_path = output_dir.join(OO_INDEX_FILE);
    let index = read_file(&index_path).await?;
    let names: Vec<&str> = index
        .lines()
        .next()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let mut readings = Vec::with_capacity(names.len());
    for name in names {
        let sample_path = output_dir.join(format!("{name}.txt"));
        let artifact = sample_path.display().to_string();
        let content = read_file(&sample_path).await?;
        let mut lines = content.lines();

        let header = lines
            .next()
            .ok_or_else(|| PipelineError::parse(&artifact, "missing header line"))?;
        let sys_time = parse_oo_header_time(third_field(header, &artifact)?)
            .map_err(|e| PipelineError::parse(&artifact, e))?;

        let data = lines
            .next()
            .ok_or_else(|| PipelineError::parse(&artifact, "missing data line"))?;
        let pair = third_field(data, &artifact)?;
        let (field_1, field_2) = pair
            .split_once(',')
            .ok_or_else(|| PipelineError::parse(&artifact, "expected a comma-split data pair"))?;

        readings.push(OoReading {
            sys_time,
            field_1: field_1.trim().to_string(),
            field_2: field_2.trim().to_string(),
        });
    }

    tracing::debug!(dir = %output_dir.display(), readings = readings.len(), "Read OO parser output");
    Ok(readings)
}

/// Read every GPS reading from the parser's tabular output.
///
/// The first row is a header. Each data row is
/// `(sys_time, gps_time, lat_deg, lat_hem, lon_deg, lon_hem, altitude,
/// ground_elevation)`; hemisphere letters sign the coordinate magnitudes.
pub async fn read_gps_output(csv_path: &Path) -> PipelineResult<Vec<GpsReading>> {
    let artifact = csv_path.display().to_string();
    let content = read_file(csv_path).await?;

    let mut readings = Vec::new();
    for (line_no, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 8 {
            return Err(PipelineError::parse(
                &artifact,
                format!("row {}: expected 8 fields, got {}", line_no + 1, fields.len()),
            ));
        }

        let row_err = |e: &dyn std::fmt::Display| {
            PipelineError::parse(&artifact, format!("row {}: {e}", line_no + 1))
        };

        let sys_time = parse_gps_sys_time(fields[0]).map_err(|e| row_err(&e))?;
        let latitude = signed_coordinate(fields[2], single_letter(fields[3]).map_err(|e| row_err(&e))?)
            .map_err(|e| row_err(&e))?;
        let longitude = signed_coordinate(fields[4], single_letter(fields[5]).map_err(|e| row_err(&e))?)
            .map_err(|e| row_err(&e))?;
        let altitude: f64 = fields[6]
            .parse()
            .map_err(|_| row_err(&format_args!("invalid altitude {:?}", fields[6])))?;
        let ground_elevation: f64 = fields[7]
            .parse()
            .map_err(|_| row_err(&format_args!("invalid ground elevation {:?}", fields[7])))?;

        readings.push(GpsReading {
            sys_time,
            gps_time: fields[1].to_string(),
            latitude,
            longitude,
            altitude,
            ground_elevation,
        });
    }

    tracing::debug!(csv = %artifact, readings = readings.len(), "Read GPS parser output");
    Ok(readings)
}

fn single_letter(field: &str) -> Result<char, String> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("invalid hemisphere field {field:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_oo_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OO_INDEX_FILE), "sample_0001,sample_0002,\n").unwrap();
        std::fs::write(
            dir.path().join("sample_0001.txt"),
            "Timestamp : systime : Tue Mar 03 10:15:30 2020\nData : values : 412.5,0.883\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("sample_0002.txt"),
            "Timestamp : systime : Tue Mar 03 10:15:31 2020\nData : values : 413.0,0.885\n",
        )
        .unwrap();

        let readings = read_oo_output(dir.path()).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].field_1, "412.5");
        assert_eq!(readings[0].field_2, "0.883");
        assert_eq!(
            readings[1].sys_time,
            parse_gps_sys_time("2020-03-03 10:15:31").unwrap()
        );
    }

    #[tokio::test]
    async fn oo_sample_with_malformed_timestamp_is_a_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OO_INDEX_FILE), "bad_sample\n").unwrap();
        std::fs::write(
            dir.path().join("bad_sample.txt"),
            "Timestamp : systime : yesterday-ish\nData : values : 1,2\n",
        )
        .unwrap();

        let err = read_oo_output(dir.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[tokio::test]
    async fn reads_gps_csv_with_signed_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("gps_0001.log.csv");
        std::fs::write(
            &csv,
            "sys_time,gps_time,lat,lat_hem,lon,lon_hem,alt,ground\n\
             2020-03-03 10:15:30,101530.00,4043.3220,N,07359.6110,W,120.5,10.0\n\
             2020-03-03 10:15:31,101531.00,4043.3221,S,07359.6111,E,121.0,10.0\n",
        )
        .unwrap();

        let readings = read_gps_output(&csv).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].latitude, "+4043.3220");
        assert_eq!(readings[0].longitude, "-07359.6110");
        assert_eq!(readings[1].latitude, "-4043.3221");
        assert_eq!(readings[1].longitude, "+07359.6111");
        assert_eq!(readings[0].altitude, 120.5);
    }

    #[tokio::test]
    async fn gps_row_with_unknown_hemisphere_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("gps.csv");
        std::fs::write(
            &csv,
            "header\n2020-03-03 10:15:30,101530.00,4043.3220,Q,07359.6110,W,120.5,10.0\n",
        )
        .unwrap();

        let err = read_gps_output(&csv).await.unwrap_err();
        match err {
            PipelineError::Parse { reason, .. } => {
                assert!(reason.contains("hemisphere"), "reason: {reason}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn gps_row_with_wrong_arity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("gps.csv");
        std::fs::write(&csv, "header\n2020-03-03 10:15:30,101530.00\n").unwrap();

        let err = read_gps_output(&csv).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn gps_csv_path_appends_suffix() {
        assert_eq!(
            gps_csv_path(Path::new("/tmp/scratch/gps_0001.log")),
            Path::new("/tmp/scratch/gps_0001.log.csv")
        );
    }
}
