use crate::archive::inspector::ArchiveEntry;
use crate::error::{ProcessingError, Result};
use crate::models::{FileKey, FileOutcome};
use crate::utils::filename::NameResolver;
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on the buffer reserved from the size a zip directory declares.
const MAX_PREALLOCATION: u64 = 4 * 1024 * 1024;
use zip::ZipArchive;

/// The raw-data member of an hourly archive, decompressed into memory.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub name: String,
    /// Resolved from the member name, so the year is always known.
    pub key: FileKey,
    pub bytes: Vec<u8>,
}

/// Opens `STNDOYHH.zip` archives and hands back the embedded `STNDOYHH.YYs`.
///
/// Exactly one member must resolve to the expected station, day and hour
/// (and year, when the caller knows it). Anything else is an
/// `ArchiveFormat` error for that archive.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    resolver: NameResolver,
}

impl ArchiveReader {
    pub fn new(resolver: NameResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    pub fn read(&self, path: &Path, expected: &FileKey) -> Result<ArchiveMember> {
        let file = File::open(path)?;
        self.read_from(BufReader::new(file), &path.display().to_string(), expected)
    }

    pub fn read_from<R: Read + Seek>(
        &self,
        reader: R,
        archive_label: &str,
        expected: &FileKey,
    ) -> Result<ArchiveMember> {
        let mut archive = ZipArchive::new(reader)?;
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();

        let (name, key) = self.select_member(archive_label, &names, expected)?;

        let mut member = archive.by_name(&name)?;
        let mut bytes = Vec::with_capacity(member.size().min(MAX_PREALLOCATION) as usize);
        member.read_to_end(&mut bytes)?;

        debug!("Read {} ({} bytes) from {}", name, bytes.len(), archive_label);
        Ok(ArchiveMember { name, key, bytes })
    }

    /// Write the raw member of every entry to `{dir}/{stn}/{year}/{member}`.
    /// Archives that cannot be read are skipped and reported; failing to
    /// write under `dir` aborts.
    pub fn extract_to(&self, entries: &[ArchiveEntry], dir: &Path) -> Result<Extraction> {
        let mut extraction = Extraction::default();

        for entry in entries {
            let member = match self.read(&entry.path, &entry.key) {
                Ok(member) => member,
                Err(e) => {
                    warn!("Skipping {}: {}", entry.path.display(), e);
                    extraction.skipped.push(FileOutcome::skipped(
                        entry.path.clone(),
                        Some(entry.key.clone()),
                        &e,
                    ));
                    continue;
                }
            };

            let file_name = member.name.rsplit('/').next().unwrap_or(&member.name);
            let mut dest = dir.join(&member.key.station);
            if let Some(year) = member.key.year {
                dest.push(year.to_string());
            }
            fs::create_dir_all(&dest)?;
            dest.push(file_name);

            fs::write(&dest, &member.bytes)?;
            debug!("Extracted {} to {}", member.name, dest.display());
            extraction.written.push(dest);
        }

        Ok(extraction)
    }

    /// Pick the one member that belongs to `expected`.
    pub fn select_member(
        &self,
        archive_label: &str,
        names: &[String],
        expected: &FileKey,
    ) -> Result<(String, FileKey)> {
        let format_error = |reason: String| ProcessingError::ArchiveFormat {
            archive: archive_label.to_string(),
            reason,
        };

        let mut matches = names
            .iter()
            .filter(|name| !name.ends_with('/'))
            .filter_map(|name| {
                let file_name = name.rsplit('/').next().unwrap_or(name);
                match self.resolver.resolve_member_name(file_name) {
                    Ok(key) if belongs_to(&key, expected) => Some((name.clone(), key)),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("Ignoring member {} of {}: {}", name, archive_label, e);
                        None
                    }
                }
            });

        let first = matches.next();
        let second = matches.next();

        match (first, second) {
            (Some(found), None) => Ok(found),
            (None, _) => Err(format_error(format!(
                "no member named {}.YYs among {} entries",
                expected.stem(),
                names.len()
            ))),
            (Some((a, _)), Some((b, _))) => Err(format_error(format!(
                "ambiguous members '{}' and '{}'",
                a, b
            ))),
        }
    }
}

/// Result of [`ArchiveReader::extract_to`].
#[derive(Debug, Default)]
pub struct Extraction {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<FileOutcome>,
}

fn belongs_to(member: &FileKey, expected: &FileKey) -> bool {
    member.station == expected.station
        && member.day_of_year == expected.day_of_year
        && member.hour == expected.hour
        && expected.year.map_or(true, |year| member.year == Some(year))
}
