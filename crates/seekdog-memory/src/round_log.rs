//! Human-readable round log.
//!
//! Every appended round becomes one block:
//!
//! ```text
//! Round 3:
//! - Detected Objects: You detected banana at coordinates (612, 340) with a depth of 1.20 meters.
//! - Feedback: None
//! - Initial State: (0, 2, 0)
//! - Action: move forward
//! - New State: (0, 3, 0)
//! - Reason: banana centred ahead
//! ```
//!
//! A machine-readable copy of each record is written as one JSON line to a
//! sidecar `rounds.jsonl` file next to the log. Both files are flushed after
//! every block so a crash never loses a completed round.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use seekdog_types::RoundRecord;
use thiserror::Error;
use tracing::debug;

/// Errors that can arise while writing the round log.
#[derive(Error, Debug)]
pub enum RoundLogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() { "None" } else { text }
}

/// Render one record in the log block format (without trailing blank line).
pub fn render_record(record: &RoundRecord) -> String {
    let feedback = record.feedback.as_deref().unwrap_or("");
    format!(
        "Round {}:\n\
         - Detected Objects: {}\n\
         - Feedback: {}\n\
         - Initial State: {}\n\
         - Action: {}\n\
         - New State: {}\n\
         - Reason: {}",
        record.round,
        or_none(&record.observation.summary()),
        or_none(feedback),
        record.decision.initial_pose,
        record.action_text(),
        record.decision.new_pose,
        or_none(&record.decision.rationale),
    )
}

/// Append-only writer for the round log and its JSON sidecar.
#[derive(Debug)]
pub struct RoundLog {
    dir: PathBuf,
    text: BufWriter<File>,
    json: BufWriter<File>,
}

impl RoundLog {
    /// Create a fresh session directory `search_<UTC timestamp>` under
    /// `parent` and open `log.log` and `rounds.jsonl` inside it.
    pub fn create_session(parent: impl AsRef<Path>) -> Result<Self, RoundLogError> {
        let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
        let dir = parent.as_ref().join(format!("search_{stamp}"));
        Self::open(dir)
    }

    /// Open (or create) `log.log` and `rounds.jsonl` inside `dir`, appending
    /// to any existing content.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RoundLogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| RoundLogError::Io {
            path: dir.clone(),
            source,
        })?;
        let text = open_append(&dir.join("log.log"))?;
        let json = open_append(&dir.join("rounds.jsonl"))?;
        debug!(dir = %dir.display(), "round log opened");
        Ok(Self {
            dir,
            text: BufWriter::new(text),
            json: BufWriter::new(json),
        })
    }

    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn text_path(&self) -> PathBuf {
        self.dir.join("log.log")
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join("rounds.jsonl")
    }

    /// Write one record to both files and flush them.
    pub fn write_record(&mut self, record: &RoundRecord) -> Result<(), RoundLogError> {
        let text_path = self.text_path();
        let json_path = self.json_path();
        let io = |path: PathBuf| move |source: std::io::Error| RoundLogError::Io { path, source };

        writeln!(self.text, "{}\n", render_record(record)).map_err(io(text_path.clone()))?;
        self.text.flush().map_err(io(text_path))?;

        let line = serde_json::to_string(record)?;
        writeln!(self.json, "{line}").map_err(io(json_path.clone()))?;
        self.json.flush().map_err(io(json_path))?;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File, RoundLogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RoundLogError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seekdog_types::{
        Action, DecisionSummary, Heading, Observation, Pose, RoundSource,
    };

    fn record(round: u32, feedback: Option<&str>) -> RoundRecord {
        let mut r = RoundRecord::new(
            RoundSource::Autonomous,
            Observation::empty(),
            feedback.map(str::to_string),
            DecisionSummary {
                initial_pose: Pose::new(0, 0, Heading::North),
                actions: vec![Action::TurnRight],
                new_pose: Pose::new(0, 0, Heading::East),
                rationale: String::new(),
            },
        );
        r.round = round;
        r
    }

    #[test]
    fn render_uses_none_for_missing_fields() {
        let text = render_record(&record(2, None));
        assert_eq!(
            text,
            "Round 2:\n\
             - Detected Objects: No objects detected in the image.\n\
             - Feedback: None\n\
             - Initial State: (0, 0, 0)\n\
             - Action: turn right\n\
             - New State: (0, 0, 90)\n\
             - Reason: None"
        );
    }

    #[test]
    fn writes_one_block_and_one_json_line_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let mut log = RoundLog::create_session(tmp.path()).unwrap();
        log.write_record(&record(1, None)).unwrap();
        log.write_record(&record(2, Some("go left"))).unwrap();

        let text = fs::read_to_string(log.text_path()).unwrap();
        assert_eq!(text.matches("Round ").count(), 2);
        assert!(text.contains("- Feedback: go left"));

        let json = fs::read_to_string(log.json_path()).unwrap();
        let lines: Vec<&str> = json.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: RoundRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back.round, 2);
    }

    #[test]
    fn reopening_appends() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("session");
        {
            let mut log = RoundLog::open(&dir).unwrap();
            log.write_record(&record(1, None)).unwrap();
        }
        let mut log = RoundLog::open(&dir).unwrap();
        log.write_record(&record(2, None)).unwrap();
        let text = fs::read_to_string(dir.join("log.log")).unwrap();
        assert!(text.contains("Round 1:"));
        assert!(text.contains("Round 2:"));
    }
}
