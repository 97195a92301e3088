//! Recorded ride files.
//!
//! A script is a list of readings in the order the sensor produced them,
//! stored either as CSV with a header row or as a JSON array:
//!
//! ```text
//! speed,distance,cycles,rpm,delay_ms
//! 18.5,0.01,12,66,1000
//! 19.0,0.02,25,,
//! ```
//!
//! `rpm` and `delay_ms` may be left out. Rows without a delay use the pace
//! given on the command line.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pedalsync_core::ScriptedReading;
use pedalsync_types::SessionReading;
use serde::Deserialize;

/// One line of a ride script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptRow {
    pub speed: f64,
    pub distance: f64,
    pub cycles: u64,
    #[serde(default)]
    pub rpm: Option<f64>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl ScriptRow {
    fn into_scripted(self, pace: Duration) -> ScriptedReading {
        let mut reading = SessionReading::new(self.speed, self.distance, self.cycles);
        reading.rpm = self.rpm;
        ScriptedReading {
            delay: self.delay_ms.map(Duration::from_millis).unwrap_or(pace),
            reading,
        }
    }
}

/// Load a ride script, detecting JSON by extension or a leading `[`.
pub fn load_script(path: &Path, pace: Duration) -> Result<Vec<ScriptedReading>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ride script: {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        || content.trim_start().starts_with('[');

    let rows = if is_json {
        parse_json(&content)
    } else {
        parse_csv(&content)
    }
    .with_context(|| format!("Invalid ride script: {}", path.display()))?;

    if rows.is_empty() {
        bail!("Ride script {} contains no readings", path.display());
    }

    Ok(rows.into_iter().map(|row| row.into_scripted(pace)).collect())
}

fn parse_json(content: &str) -> Result<Vec<ScriptRow>> {
    Ok(serde_json::from_str(content)?)
}

fn parse_csv(content: &str) -> Result<Vec<ScriptRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize().enumerate() {
        // Header is line 1.
        let row: ScriptRow = row.with_context(|| format!("Bad row on line {}", index + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACE: Duration = Duration::from_millis(500);

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_csv_with_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "ride.csv",
            "speed,distance,cycles,rpm,delay_ms\n\
             18.5, 0.01, 12, 66, 1000\n\
             # pause\n\
             0.0, 0.01, 12, ,\n",
        );

        let script = load_script(&path, PACE).unwrap();
        assert_eq!(script.len(), 2);
        assert_eq!(script[0].delay, Duration::from_secs(1));
        assert_eq!(script[0].reading.rpm, Some(66.0));
        assert_eq!(script[1].delay, PACE);
        assert_eq!(script[1].reading.rpm, None);
        assert_eq!(script[1].reading.cycles, 12);
    }

    #[test]
    fn test_csv_without_optional_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ride.txt", "speed,distance,cycles\n20,0.5,100\n");

        let script = load_script(&path, PACE).unwrap();
        assert_eq!(script[0].reading, SessionReading::new(20.0, 0.5, 100));
    }

    #[test]
    fn test_json_detected_by_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "ride.data",
            r#"[{"speed": 21.0, "distance": 0.2, "cycles": 40, "delay_ms": 250}]"#,
        );

        let script = load_script(&path, PACE).unwrap();
        assert_eq!(script.len(), 1);
        assert_eq!(script[0].delay, Duration::from_millis(250));
    }

    #[test]
    fn test_empty_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ride.json", "[]");
        let err = load_script(&path, PACE).unwrap_err();
        assert!(err.to_string().contains("no readings"));
    }

    #[test]
    fn test_bad_row_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ride.csv", "speed,distance,cycles\n20,0.5,100\nfast,0.6,110\n");
        let err = load_script(&path, PACE).unwrap_err();
        assert!(format!("{:#}", err).contains("line 3"));
    }
}
