use crate::error::ProcessingError;
use crate::models::file_key::FileKey;
use crate::models::series::LineError;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Processed {
        samples: usize,
        out_of_range: usize,
        duplicates: usize,
    },
    Skipped {
        kind: String,
        reason: String,
    },
    Cancelled,
}

/// What happened to one archive during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub key: Option<FileKey>,
    pub status: FileStatus,
    pub attempts: u32,
    pub flagged_lines: Vec<LineError>,
}

impl FileOutcome {
    pub fn skipped(path: PathBuf, key: Option<FileKey>, error: &ProcessingError) -> Self {
        Self {
            path,
            key,
            status: FileStatus::Skipped {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            },
            attempts: 0,
            flagged_lines: Vec::new(),
        }
    }

    pub fn cancelled(path: PathBuf, key: Option<FileKey>) -> Self {
        Self {
            path,
            key,
            status: FileStatus::Cancelled,
            attempts: 0,
            flagged_lines: Vec::new(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_processed(&self) -> bool {
        matches!(self.status, FileStatus::Processed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FileStatus::Skipped { .. })
    }

    pub fn is_flagged(&self) -> bool {
        match &self.status {
            FileStatus::Processed {
                out_of_range,
                duplicates,
                ..
            } => !self.flagged_lines.is_empty() || *out_of_range > 0 || *duplicates > 0,
            _ => false,
        }
    }
}

/// Per-file results of a batch run. Failures are recorded here instead of
/// aborting the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = FileOutcome>) {
        self.outcomes.extend(outcomes);
    }

    pub fn processed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_processed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }

    pub fn flagged(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_flagged())
    }

    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == FileStatus::Cancelled)
            .count()
    }

    pub fn flagged_line_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.flagged_lines.len()).sum()
    }

    pub fn sort(&mut self) {
        self.outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
