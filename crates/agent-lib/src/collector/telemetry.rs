//! Append-only CSV telemetry store
//!
//! One row per sample: `timestamp,cpu_percent,ram_percent`, local time
//! without timezone, values with one decimal. The header is written only
//! when the file is created.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::models::Sample;

pub const TELEMETRY_HEADER: &str = "timestamp,cpu_percent,ram_percent";

/// Timestamp layout used in the CSV rows
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed telemetry row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    pub timestamp: NaiveDateTime,
    pub cpu_percent: f64,
    pub ram_percent: f64,
}

/// Appends samples to a CSV file
pub struct TelemetryStore {
    path: PathBuf,
    file: File,
}

impl TelemetryStore {
    /// Open or create the store, creating parent directories as needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let is_new = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if is_new {
            writeln!(file, "{TELEMETRY_HEADER}")?;
            info!(path = %path.display(), "Created telemetry file");
        }

        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        writeln!(
            self.file,
            "{},{:.1},{:.1}",
            sample.timestamp.format(TIMESTAMP_FORMAT),
            sample.cpu_percent,
            sample.ram_percent
        )?;
        self.file.flush()?;
        Ok(())
    }
}

/// Read every row of a telemetry file
///
/// The header and blank lines are skipped; any other unparsable line is an
/// error naming its line number.
pub fn read_records(path: &Path) -> Result<Vec<TelemetryRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || (index == 0 && line == TELEMETRY_HEADER) {
            continue;
        }
        records.push(
            parse_record(line)
                .map_err(|e| MonitorError::Telemetry(format!("line {}: {e}", index + 1)))?,
        );
    }

    Ok(records)
}

fn parse_record(line: &str) -> std::result::Result<TelemetryRecord, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [timestamp, cpu, ram] = fields.as_slice() else {
        return Err(format!("expected 3 fields, got {}", fields.len()));
    };

    Ok(TelemetryRecord {
        timestamp: NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("invalid timestamp '{timestamp}': {e}"))?,
        cpu_percent: cpu
            .parse()
            .map_err(|e| format!("invalid cpu_percent '{cpu}': {e}"))?,
        ram_percent: ram
            .parse()
            .map_err(|e| format!("invalid ram_percent '{ram}': {e}"))?,
    })
}

/// Descriptive statistics of one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl ColumnStats {
    /// `values` must not be empty
    fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            mean,
            std: variance.sqrt(),
            min: sorted[0],
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Linear interpolation between the closest ranks of a sorted slice
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Summary of a telemetry file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    pub count: usize,
    pub first: NaiveDateTime,
    pub last: NaiveDateTime,
    pub cpu: ColumnStats,
    pub ram: ColumnStats,
}

impl TelemetrySummary {
    /// Summarize records; needs at least two of them
    pub fn from_records(records: &[TelemetryRecord]) -> Result<Self> {
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Err(MonitorError::Telemetry("no telemetry records".into()));
        };
        if records.len() < 2 {
            return Err(MonitorError::Telemetry(
                "at least 2 records are needed for statistics".into(),
            ));
        }

        let cpu: Vec<f64> = records.iter().map(|r| r.cpu_percent).collect();
        let ram: Vec<f64> = records.iter().map(|r| r.ram_percent).collect();

        Ok(Self {
            count: records.len(),
            first: first.timestamp,
            last: last.timestamp,
            cpu: ColumnStats::from_values(&cpu),
            ram: ColumnStats::from_values(&ram),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn sample_at(secs: u32, cpu: f64, ram: f64) -> Sample {
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 12, 0, secs).unwrap();
        Sample::new(ts, cpu, ram)
    }

    #[test]
    fn test_header_written_once_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/telemetry.csv");

        let mut store = TelemetryStore::open(&path).unwrap();
        store.append(&sample_at(0, 12.34, 40.0)).unwrap();
        drop(store);

        let mut store = TelemetryStore::open(&path).unwrap();
        store.append(&sample_at(5, 15.0, 41.56)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                TELEMETRY_HEADER,
                "2024-03-01 12:00:00,12.3,40.0",
                "2024-03-01 12:00:05,15.0,41.6",
            ]
        );
    }

    #[test]
    fn test_records_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.csv");

        let mut store = TelemetryStore::open(&path).unwrap();
        store.append(&sample_at(0, 10.0, 30.0)).unwrap();
        store.append(&sample_at(5, 20.0, 50.0)).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].cpu_percent, 20.0);
        assert_eq!(
            records[0].timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2024-03-01 12:00:00"
        );
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("telemetry.csv");
        fs::write(
            &path,
            "timestamp,cpu_percent,ram_percent\n2024-03-01 12:00:00,1.0,2.0\ngarbage\n",
        )
        .unwrap();

        let err = read_records(&path).unwrap_err();
        assert!(matches!(&err, MonitorError::Telemetry(msg) if msg.starts_with("line 3")));
    }

    #[test]
    fn test_summary_uses_sample_std() {
        let ts = NaiveDateTime::parse_from_str("2024-03-01 12:00:00", TIMESTAMP_FORMAT).unwrap();
        let records: Vec<TelemetryRecord> = [(10.0, 40.0), (20.0, 40.0), (30.0, 40.0)]
            .iter()
            .map(|&(cpu, ram)| TelemetryRecord {
                timestamp: ts,
                cpu_percent: cpu,
                ram_percent: ram,
            })
            .collect();

        let summary = TelemetrySummary::from_records(&records).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.cpu.mean, 20.0);
        assert!((summary.cpu.std - 10.0).abs() < 1e-9);
        assert_eq!(summary.cpu.min, 10.0);
        assert_eq!(summary.cpu.max, 30.0);
        assert_eq!(summary.ram.std, 0.0);
        assert_eq!(summary.cpu.p25, 15.0);
        assert_eq!(summary.cpu.p50, 20.0);
        assert_eq!(summary.cpu.p75, 25.0);
    }

    #[test]
    fn test_quartiles_interpolate_unsorted_input() {
        let stats = ColumnStats::from_values(&[4.0, 1.0, 3.0, 2.0]);

        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.p25, 1.75);
        assert_eq!(stats.p50, 2.5);
        assert_eq!(stats.p75, 3.25);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_summary_needs_two_records() {
        assert!(TelemetrySummary::from_records(&[]).is_err());
        let one = vec![TelemetryRecord {
            timestamp: NaiveDateTime::parse_from_str("2024-03-01 12:00:00", TIMESTAMP_FORMAT)
                .unwrap(),
            cpu_percent: 1.0,
            ram_percent: 1.0,
        }];
        assert!(TelemetrySummary::from_records(&one).is_err());
    }
}
