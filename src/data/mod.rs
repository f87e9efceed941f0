//! File-based response reader for browser front-ends.
//!
//! The front-end writes its trial log as a JSON array of row objects once a
//! run is complete:
//!
//! ```json
//! [
//!   {"stimulus": "<p>Welcome</p>", "rt": 1200, "response": " "},
//!   {"stimulus": "<div style='color: red'>green</div>", "rt": 611, "response": "f"},
//!   {"stimulus": "<div style='color: green'>green</div>", "rt": null, "response": null}
//! ]
//! ```
//!
//! Only rows whose stimulus contains a trial marker are kept. Instruction and
//! fixation rows are dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::collaborators::{ResponseDefaults, ResponseReader, ResponseRecord};
use crate::error::Result;

/// Stimulus markers of the two-color Stroop trials.
pub const STROOP_MARKERS: [&str; 2] = [">red</div>", ">green</div>"];

/// One row of the front-end's log. Fields other than these are ignored.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    rt: Option<f64>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    stimulus: Option<String>,
}

/// Parse a log, keep trial rows and fill in missing fields.
pub fn parse_response_log(
    json: &str,
    markers: &[String],
    defaults: &ResponseDefaults,
) -> Result<Vec<ResponseRecord>> {
    let rows: Vec<RawRow> = serde_json::from_str(json)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let stimulus = row.stimulus?;
            markers
                .iter()
                .any(|m| stimulus.contains(m.as_str()))
                .then(|| defaults.fill(row.rt, row.response, stimulus))
        })
        .collect())
}

/// [`ResponseReader`] over a JSON log file.
#[derive(Debug, Clone)]
pub struct JsonLogReader {
    path: PathBuf,
    markers: Vec<String>,
    defaults: ResponseDefaults,
}

impl JsonLogReader {
    /// Reader for the Stroop markers with the default fill values.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            markers: STROOP_MARKERS.iter().map(|m| m.to_string()).collect(),
            defaults: ResponseDefaults::default(),
        }
    }

    /// Replace the trial markers.
    pub fn with_markers<S: Into<String>>(mut self, markers: impl IntoIterator<Item = S>) -> Self {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the fill values.
    pub fn with_defaults(mut self, defaults: ResponseDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Log file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResponseReader for JsonLogReader {
    async fn clear(&mut self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "removed stale response log");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_latest_responses(&mut self) -> Result<Option<Vec<ResponseRecord>>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match parse_response_log(&json, &self.markers, &self.defaults) {
            Ok(records) => Ok(Some(records)),
            // Still being written
            Err(crate::LoopError::Json(e)) if e.is_eof() => {
                tracing::debug!(path = %self.path.display(), "response log incomplete");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        STROOP_MARKERS.iter().map(|m| m.to_string()).collect()
    }

    const LOG: &str = r#"[
        {"stimulus": "<p>Press any key</p>", "rt": 900, "response": " ", "trial_type": "html-keyboard-response"},
        {"stimulus": "<div style='color: red'>green</div>", "rt": 611.5, "response": "f"},
        {"stimulus": "+", "rt": null, "response": null},
        {"stimulus": "<div style='color: green'>green</div>", "rt": null, "response": null},
        {"stimulus": "<div style='color: green'>red</div>"}
    ]"#;

    #[test]
    fn test_filters_to_trial_rows() {
        let records = parse_response_log(LOG, &markers(), &ResponseDefaults::default()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].reaction_time, 611.5);
        assert_eq!(records[0].response, "f");
    }

    #[test]
    fn test_missing_fields_are_defaulted_exactly() {
        let records = parse_response_log(LOG, &markers(), &ResponseDefaults::default()).unwrap();
        for record in &records[1..] {
            assert_eq!(record.reaction_time, 3000.0);
            assert_eq!(record.response, "j");
        }
    }

    #[test]
    fn test_malformed_log_is_json_error() {
        let err = parse_response_log(r#"{"rt": 1}"#, &markers(), &ResponseDefaults::default())
            .unwrap_err();
        assert!(matches!(err, crate::LoopError::Json(_)));
    }

    #[tokio::test]
    async fn test_reader_reports_not_ready_until_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experimentData.json");
        let mut reader = JsonLogReader::new(&path);

        assert!(reader.read_latest_responses().await.unwrap().is_none());

        std::fs::write(&path, LOG).unwrap();
        let records = reader.read_latest_responses().await.unwrap().unwrap();
        assert_eq!(records.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_removes_stale_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experimentData.json");
        std::fs::write(&path, LOG).unwrap();

        let mut reader = JsonLogReader::new(&path);
        reader.clear().await.unwrap();
        assert!(!path.exists());
        // Clearing twice is fine
        reader.clear().await.unwrap();
        assert!(reader.read_latest_responses().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_log_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experimentData.json");
        std::fs::write(&path, &LOG[..40]).unwrap();

        let mut reader = JsonLogReader::new(&path);
        assert!(reader.read_latest_responses().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_markers_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, r#"[{"stimulus": "TRIAL-1"}, {"stimulus": "other", "rt": 5}]"#).unwrap();

        let mut reader = JsonLogReader::new(&path)
            .with_markers(["TRIAL-"])
            .with_defaults(ResponseDefaults {
                reaction_time: 2500.0,
                response: "none".into(),
            });
        let records = reader.read_latest_responses().await.unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reaction_time, 2500.0);
        assert_eq!(records[0].response, "none");
    }
}
