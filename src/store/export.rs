//! Export of the emotion log.

use crate::core::entry::EmotionLogEntry;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output format for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// One JSON object per line
    JsonLines,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::JsonLines => "jsonl",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "jsonl" | "ndjson" => Ok(ExportFormat::JsonLines),
            other => Err(format!("unknown export format '{other}' (expected json or jsonl)")),
        }
    }
}

/// Serialize entries in the given format.
pub fn render(entries: &[EmotionLogEntry], format: ExportFormat) -> Result<String, StoreError> {
    let to_err = |e: serde_json::Error| StoreError::Serialize(e.to_string());
    match format {
        ExportFormat::Json => serde_json::to_string_pretty(entries).map_err(to_err),
        ExportFormat::JsonLines => {
            let mut out = String::new();
            for entry in entries {
                out.push_str(&serde_json::to_string(entry).map_err(to_err)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Write an export file named after `now` into `dir`. Returns its path.
pub fn write_export(
    entries: &[EmotionLogEntry],
    dir: &Path,
    format: ExportFormat,
    now: DateTime<Utc>,
) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::Io(e.to_string()))?;

    let path = dir.join(format!(
        "emotions_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ));
    let content = render(entries, format)?;
    std::fs::write(&path, content).map_err(|e| StoreError::Io(e.to_string()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time_of_day::LocalZone;
    use crate::detector::types::Emotion;
    use chrono::TimeZone;

    fn entries() -> Vec<EmotionLogEntry> {
        let zone = LocalZone::Named(chrono_tz::UTC);
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        vec![
            EmotionLogEntry::new(Emotion::Happy, 0.9, t, &zone),
            EmotionLogEntry::new(Emotion::Sad, 0.7, t, &zone),
        ]
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("JSONL".parse::<ExportFormat>(), Ok(ExportFormat::JsonLines));
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_jsonl_has_one_entry_per_line() {
        let out = render(&entries(), ExportFormat::JsonLines).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: EmotionLogEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.emotion, Emotion::Happy);
        assert!(lines[1].contains("\"timeOfDay\":\"morning\""));
    }

    #[test]
    fn test_write_export_file() {
        let dir = std::env::temp_dir().join(format!("emotion-tracker-export-{}", uuid::Uuid::new_v4()));
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let written = entries();
        let path = write_export(&written, &dir, ExportFormat::Json, now).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("emotions_20240501_120000.json")
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<EmotionLogEntry> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, written);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
