pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{normalize_longitude, parse_coordinate};
pub use filename::{generate_default_parquet_filename, generate_merged_filename, NameResolver};
pub use progress::ProgressReporter;
