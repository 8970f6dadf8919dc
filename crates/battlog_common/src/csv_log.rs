//! CSV battery log
//!
//! File format:
//! ```text
//! timestamp,ac_connected,battery_life
//! 2025-06-01T10:00:00+02:00,0,87
//! ```
//!
//! Reading is lenient: header names are matched case-insensitively against a
//! few aliases, booleans accept several spellings, and rows that fail to parse
//! are skipped.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{BattlogError, Result};
use crate::sample::Sample;

pub const CSV_HEADER: &str = "timestamp,ac_connected,battery_life";

const TIMESTAMP_ALIASES: [&str; 1] = ["timestamp"];
const AC_ALIASES: [&str; 4] = ["ac_connected", "ac", "ac plugged in (bool)", "ac plugged in"];
const BATTERY_ALIASES: [&str; 3] = ["battery_life", "battery", "battery life (%)"];

const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const OFFSET_LAYOUTS: [&str; 1] = ["%Y-%m-%d %H:%M:%S %z"];

/// Parse a boolean the way hand-edited logs spell it; any integer counts,
/// zero being false
pub fn parse_bool_loose(s: &str) -> Option<bool> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        other => other.parse::<i64>().ok().map(|v| v != 0),
    }
}

/// RFC 3339 first, then the fallback layouts. Timestamps without an offset
/// are local time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Local));
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(t) = DateTime::parse_from_str(s, layout) {
            return Some(t.with_timezone(&Local));
        }
    }
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    None
}

/// Column positions resolved from the header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    timestamp: usize,
    ac: usize,
    battery: usize,
}

impl Columns {
    fn from_header(header: &str) -> std::result::Result<Self, &'static str> {
        let names: Vec<String> = header
            .split(',')
            .map(|h| h.trim().to_lowercase())
            .collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| names.iter().position(|n| n == alias))
        };

        Ok(Self {
            timestamp: find(&TIMESTAMP_ALIASES[..]).ok_or("timestamp")?,
            ac: find(&AC_ALIASES[..]).ok_or("ac_connected")?,
            battery: find(&BATTERY_ALIASES[..]).ok_or("battery_life")?,
        })
    }

    fn parse_row(&self, line: &str) -> Option<Sample> {
        let fields: Vec<&str> = line.split(',').collect();
        let time = parse_timestamp(fields.get(self.timestamp)?)?;
        let ac_connected = parse_bool_loose(fields.get(self.ac)?)?;
        let battery_percent = fields
            .get(self.battery)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && (0.0..=100.0).contains(v))?;
        Some(Sample::new(time, ac_connected, battery_percent))
    }
}

/// Parse a whole log. `source` only names the file in errors.
///
/// The result is sorted by time; rows with equal timestamps keep file order.
pub fn parse_csv(content: &str, source: &Path) -> Result<Vec<Sample>> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::from_header(header).map_err(|column| BattlogError::CsvHeader {
        path: source.to_path_buf(),
        column,
    })?;

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for line in lines {
        match columns.parse_row(line) {
            Some(sample) => samples.push(sample),
            None => {
                skipped += 1;
                debug!("Skipping malformed row in {}: {:?}", source.display(), line);
            }
        }
    }
    if skipped > 0 {
        debug!("Skipped {} malformed rows in {}", skipped, source.display());
    }

    samples.sort_by_key(|s| s.time);
    Ok(samples)
}

/// Append-only CSV log with trimming
#[derive(Debug, Clone)]
pub struct CsvLog {
    path: PathBuf,
}

impl CsvLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, e: std::io::Error) -> BattlogError {
        BattlogError::io(&self.path, e)
    }

    /// Append one row, writing the header first when the file is new
    pub fn append(&self, timestamp: &str, ac_connected: bool, battery_percent: u8) -> Result<()> {
        let is_new = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let mut writer = BufWriter::new(file);
        if is_new {
            writeln!(writer, "{}", CSV_HEADER).map_err(|e| self.io_err(e))?;
        }
        writeln!(
            writer,
            "{},{},{}",
            timestamp,
            u8::from(ac_connected),
            battery_percent
        )
        .map_err(|e| self.io_err(e))?;
        writer.flush().map_err(|e| self.io_err(e))
    }

    /// Lines in the file, header included; 0 when missing
    pub fn line_count(&self) -> Result<usize> {
        match File::open(&self.path) {
            Ok(file) => {
                let mut count = 0;
                for line in BufReader::new(file).lines() {
                    line.map_err(|e| self.io_err(e))?;
                    count += 1;
                }
                Ok(count)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Keep the header and the last `keep` data lines. The file is replaced
    /// through a temporary sibling and a rename.
    pub fn trim_to_last(&self, keep: usize) -> Result<()> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io_err(e)),
        };

        let mut lines = content.lines();
        let header = lines.next();
        let data: Vec<&str> = lines.filter(|l| !l.is_empty()).collect();
        let tail = &data[data.len().saturating_sub(keep)..];

        let tmp = self.path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp).map_err(|e| BattlogError::io(&tmp, e))?;
            let mut writer = BufWriter::new(file);
            for line in header.into_iter().chain(tail.iter().copied()) {
                writeln!(writer, "{}", line).map_err(|e| BattlogError::io(&tmp, e))?;
            }
            writer.flush().map_err(|e| BattlogError::io(&tmp, e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;

        info!(
            "Trimmed {} to {} data lines (dropped {})",
            self.path.display(),
            tail.len(),
            data.len() - tail.len()
        );
        Ok(())
    }

    /// Trim when the file has grown past `threshold` lines
    pub fn trim_if_needed(&self, threshold: usize, keep: usize) -> Result<bool> {
        if self.line_count()? > threshold {
            self.trim_to_last(keep)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// All parseable samples, sorted
    pub fn read_samples(&self) -> Result<Vec<Sample>> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        parse_csv(&content, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_bool_loose() {
        for s in ["true", "T", " yes ", "y", "1", "42", "-1"] {
            assert_eq!(parse_bool_loose(s), Some(true), "{}", s);
        }
        for s in ["false", "F", "no", "n", "0"] {
            assert_eq!(parse_bool_loose(s), Some(false), "{}", s);
        }
        assert_eq!(parse_bool_loose("maybe"), None);
        assert_eq!(parse_bool_loose(""), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2025-06-01T10:00:00+00:00").unwrap();
        let with_offset = parse_timestamp("2025-06-01 10:00:00 +0000").unwrap();
        assert_eq!(rfc, with_offset);

        let naive_space = parse_timestamp("2025-06-01 10:00:00").unwrap();
        let naive_t = parse_timestamp("2025-06-01T10:00:00").unwrap();
        assert_eq!(naive_space, naive_t);
        assert_eq!(naive_space.format("%H:%M").to_string(), "10:00");

        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_parse_csv_skips_non_finite_and_out_of_range_battery() {
        let content = "timestamp,ac_connected,battery_life\n\
                       2025-06-01T10:00:00+00:00,0,90\n\
                       2025-06-01T10:01:00+00:00,0,89\n\
                       2025-06-01T10:02:00+00:00,0,nan\n\
                       2025-06-01T10:03:00+00:00,0,inf\n\
                       2025-06-01T10:04:00+00:00,0,-3\n\
                       2025-06-01T10:05:00+00:00,0,140\n\
                       2025-06-01T10:06:00+00:00,0,86\n\
                       2025-06-01T10:07:00+00:00,0,85\n";
        let samples = parse_csv(content, Path::new("test.csv")).unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.battery_percent).collect();
        assert_eq!(values, vec![90.0, 89.0, 86.0, 85.0]);

        let estimate = crate::analytics::rate_and_estimate(&samples, 85.0, 0.0, 100.0);
        assert!(matches!(
            estimate.status,
            crate::analytics::EstimateStatus::Estimated { samples: 4 }
        ));
        assert!(estimate.rate_per_min < 0.0);
    }

    #[test]
    fn test_parse_csv_aliases_and_bad_rows() {
        let content = "Timestamp, AC Plugged In (bool), Battery Life (%)\n\
                       2025-06-01T10:02:00+00:00,no,80.5\n\
                       garbage,1,50\n\
                       2025-06-01T10:00:00+00:00,yes,81\n\
                       2025-06-01T10:01:00+00:00,0\n";
        let samples = parse_csv(content, Path::new("test.csv")).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].ac_connected);
        assert_eq!(samples[0].battery_percent, 81.0);
        assert!(!samples[1].ac_connected);
        assert_eq!(samples[1].battery_percent, 80.5);
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let err = parse_csv("timestamp,battery\n", Path::new("x.csv")).unwrap_err();
        assert!(matches!(
            err,
            BattlogError::CsvHeader {
                column: "ac_connected",
                ..
            }
        ));
    }

    #[test]
    fn test_parse_csv_empty() {
        assert!(parse_csv("", Path::new("x.csv")).unwrap().is_empty());
        assert!(parse_csv(CSV_HEADER, Path::new("x.csv")).unwrap().is_empty());
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("battery.csv"));
        log.append("2025-06-01T10:00:00+00:00", false, 90).unwrap();
        log.append("2025-06-01T10:01:00+00:00", true, 89).unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            content,
            "timestamp,ac_connected,battery_life\n\
             2025-06-01T10:00:00+00:00,0,90\n\
             2025-06-01T10:01:00+00:00,1,89\n"
        );
        assert_eq!(log.line_count().unwrap(), 3);
        assert_eq!(log.read_samples().unwrap().len(), 2);
    }

    #[test]
    fn test_line_count_missing_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(CsvLog::new(dir.path().join("none.csv")).line_count().unwrap(), 0);
    }

    #[test]
    fn test_trim_keeps_header_and_tail() {
        let dir = TempDir::new().unwrap();
        let log = CsvLog::new(dir.path().join("battery.csv"));
        for i in 0..10u8 {
            log.append(&format!("2025-06-01T10:{:02}:00+00:00", i), false, 90 - i)
                .unwrap();
        }

        assert!(!log.trim_if_needed(11, 3).unwrap());
        assert!(log.trim_if_needed(10, 3).unwrap());

        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("2025-06-01T10:07:00"));
        assert!(lines[3].ends_with(",81"));
        assert!(!dir.path().join("battery.csv.tmp").exists());
    }
}
