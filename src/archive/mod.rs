pub mod inspector;
pub mod processor;
pub mod reader;

pub use inspector::{ArchiveEntry, ArchiveInspector, ArchiveMetadata, Partition};
pub use processor::ArchiveProcessor;
pub use reader::{ArchiveMember, ArchiveReader, Extraction};
