pub mod file_key;
pub mod header;
pub mod merged;
pub mod outcome;
pub mod sample;
pub mod series;
pub mod station;

pub use file_key::{CenturyPivot, FileKey, StationDay};
pub use header::{ColumnSpec, Header, CHANNEL_LAYOUT};
pub use merged::{MergedDay, MergedFrame};
pub use outcome::{FileOutcome, FileStatus, RunSummary};
pub use sample::{Channel, ParsedRecord, Sample, SampleTime, SECONDS_PER_DAY};
pub use series::{DuplicateSample, GapInterval, HourBatch, LineError, Slot, TimeSeries};
pub use station::{StationCatalog, StationMetadata};
