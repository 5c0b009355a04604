use crate::archive::inspector::ArchiveEntry;
use crate::archive::reader::{ArchiveMember, ArchiveReader};
use crate::error::Result;
use crate::models::HourBatch;
use crate::readers::header_reader::{decode_text, HeaderParser};
use crate::readers::record_reader::RecordParser;
use crate::utils::constants::MAX_SAMPLES_PER_FILE;
use tracing::{debug, warn};

/// Reads and parses one hourly archive. Stateless and cheap to clone, so a
/// copy can move into each blocking task.
#[derive(Debug, Clone)]
pub struct ArchiveProcessor {
    reader: ArchiveReader,
    header_parser: HeaderParser,
    record_parser: RecordParser,
}

impl ArchiveProcessor {
    pub fn new(reader: ArchiveReader) -> Self {
        Self {
            reader,
            header_parser: HeaderParser::new(),
            record_parser: RecordParser::new(),
        }
    }

    pub fn with_record_parser(mut self, record_parser: RecordParser) -> Self {
        self.record_parser = record_parser;
        self
    }

    pub fn reader(&self) -> &ArchiveReader {
        &self.reader
    }

    pub fn process(&self, entry: &ArchiveEntry) -> Result<HourBatch> {
        let member = self.reader.read(&entry.path, &entry.key)?;
        self.parse_member(member)
    }

    /// Header and records of an already extracted member. A header error
    /// fails the whole file; record errors are collected per line.
    pub fn parse_member(&self, member: ArchiveMember) -> Result<HourBatch> {
        let text = decode_text(&member.bytes);
        let (header, header_lines) = self.header_parser.parse(&text)?;

        if let Some(doy) = header.day_of_year {
            if doy != member.key.day_of_year {
                warn!(
                    "{}: header marks day {:03}, file name says {:03}",
                    member.name, doy, member.key.day_of_year
                );
            }
        }

        let (records, line_errors) = self.record_parser.parse_body(&text, header_lines);

        if records.len() > MAX_SAMPLES_PER_FILE {
            warn!(
                "{}: {} samples, more than one hour at 1 Hz",
                member.name,
                records.len()
            );
        }

        debug!(
            "Parsed {}: {} samples, {} bad lines",
            member.name,
            records.len(),
            line_errors.len()
        );

        Ok(HourBatch {
            key: member.key,
            header,
            records,
            line_errors,
        })
    }
}
