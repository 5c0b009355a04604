use std::io::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid file name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Station '{code}' is not in the station catalog")]
    UnknownStation { code: String },

    #[error("Archive format error in {archive}: {reason}")]
    ArchiveFormat { archive: String, reason: String },

    #[error("Header format error: {reason}")]
    HeaderFormat { reason: String },

    #[error("Record format error on line {line}: {reason}")]
    RecordFormat { line: usize, reason: String },

    #[error("Duplicate sample for station {station} at {time} (from {source_file}); first-seen value kept")]
    DuplicateSample {
        station: String,
        time: String,
        source_file: String,
    },

    #[error("Required stations absent from merge: {}", .missing.join(", "))]
    StationSetMismatch { missing: Vec<String> },

    #[error("Batch {found} does not belong to series {expected}")]
    BatchMismatch { expected: String, found: String },

    #[error("Data merge error: {0}")]
    DataMerge(String),

    #[error("Archive read timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ProcessingError {
    /// Failures worth retrying: timeouts and interrupted or truncated reads.
    /// Format errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ProcessingError::Timeout { .. } => true,
            ProcessingError::Io(e) => is_transient_io(e.kind()),
            ProcessingError::Zip(zip::result::ZipError::Io(e)) => is_transient_io(e.kind()),
            _ => false,
        }
    }

    /// Short category name used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::InvalidName { .. } => "InvalidName",
            ProcessingError::UnknownStation { .. } => "UnknownStation",
            ProcessingError::ArchiveFormat { .. } => "ArchiveFormat",
            ProcessingError::HeaderFormat { .. } => "HeaderFormat",
            ProcessingError::RecordFormat { .. } => "RecordFormat",
            ProcessingError::DuplicateSample { .. } => "DuplicateSample",
            ProcessingError::StationSetMismatch { .. } => "StationSetMismatch",
            ProcessingError::Timeout { .. } => "Timeout",
            ProcessingError::Io(_) | ProcessingError::Zip(_) => "Io",
            _ => "Internal",
        }
    }
}

fn is_transient_io(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::Interrupted
            | ErrorKind::TimedOut
            | ErrorKind::WouldBlock
    )
}
