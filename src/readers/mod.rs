pub mod header_reader;
pub mod record_reader;
pub mod station_reader;

pub use header_reader::{decode_text, HeaderParser};
pub use record_reader::{RecordParser, SanityBounds};
pub use station_reader::StationReader;
