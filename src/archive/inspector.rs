use crate::error::{ProcessingError, Result};
use crate::models::{FileKey, FileOutcome, StationDay};
use crate::utils::constants::ARCHIVE_EXTENSION;
use crate::utils::filename::NameResolver;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A resolved hourly archive with its year attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub key: FileKey,
}

/// All archives of one station-day, in hour order. Each partition is folded
/// by exactly one task.
#[derive(Debug, Clone)]
pub struct Partition {
    pub day: StationDay,
    pub entries: Vec<ArchiveEntry>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveMetadata {
    pub root: PathBuf,
    pub entries: Vec<ArchiveEntry>,
    /// Archives that could not be resolved, with the reason.
    pub rejected: Vec<FileOutcome>,
}

impl ArchiveMetadata {
    pub fn stations(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.key.station.as_str()).collect()
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.entries.iter().filter_map(|e| e.key.date());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Group entries by station-day. Days with fewer than 24 archives are
    /// still returned; their missing hours become gaps.
    pub fn partitions(&self) -> Vec<Partition> {
        let mut grouped: BTreeMap<StationDay, Vec<ArchiveEntry>> = BTreeMap::new();

        for entry in &self.entries {
            if let Some(day) = entry.key.station_day() {
                grouped.entry(day).or_default().push(entry.clone());
            }
        }

        grouped
            .into_iter()
            .map(|(day, mut entries)| {
                entries.sort_by(|a, b| a.key.hour.cmp(&b.key.hour).then(a.path.cmp(&b.path)));
                Partition { day, entries }
            })
            .collect()
    }

    pub fn display_summary(&self) -> String {
        let partitions = self.partitions();
        let mut summary = format!(
            "Archive Inventory:\n  Root: {}\n  Archives: {}\n  Rejected: {}\n  Stations: {}\n  Station-days: {}\n",
            self.root.display(),
            self.entries.len(),
            self.rejected.len(),
            self.stations().len(),
            partitions.len()
        );

        if let Some((start, end)) = self.date_range() {
            summary.push_str(&format!("  Date Range: {} to {}\n", start, end));
        }

        let incomplete = partitions.iter().filter(|p| p.len() < 24).count();
        if incomplete > 0 {
            summary.push_str(&format!("  Station-days with fewer than 24 hours: {}\n", incomplete));
        }

        for station in self.stations() {
            let count = self.entries.iter().filter(|e| e.key.station == station).count();
            summary.push_str(&format!("    {}: {} archives\n", station.to_uppercase(), count));
        }

        summary
    }
}

/// Walks an archive tree laid out as `{root}/{year}/{STN}/STNDOYHH.zip`.
///
/// The year of an archive is the nearest ancestor directory whose name is a
/// four-digit year. Archives outside such a directory use the default year,
/// or are rejected when none is set.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    resolver: NameResolver,
    default_year: Option<i32>,
}

impl ArchiveInspector {
    pub fn new(resolver: NameResolver) -> Self {
        Self {
            resolver,
            default_year: None,
        }
    }

    pub fn with_default_year(mut self, year: Option<i32>) -> Self {
        self.default_year = year;
        self
    }

    pub fn scan(&self, root: &Path) -> Result<ArchiveMetadata> {
        let mut files = Vec::new();
        if root.is_file() {
            files.push(root.to_path_buf());
        } else {
            collect_archives(root, &mut files)?;
        }
        files.sort();

        let mut metadata = ArchiveMetadata {
            root: root.to_path_buf(),
            ..Default::default()
        };

        for path in files {
            match self.classify(&path) {
                Ok(entry) => metadata.entries.push(entry),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    metadata.rejected.push(FileOutcome::skipped(path, None, &e));
                }
            }
        }

        debug!(
            "Scanned {}: {} archives, {} rejected",
            root.display(),
            metadata.entries.len(),
            metadata.rejected.len()
        );
        Ok(metadata)
    }

    pub fn classify(&self, path: &Path) -> Result<ArchiveEntry> {
        let key = self.resolver.resolve_path(path)?;

        let year = year_from_path(path)
            .or(self.default_year)
            .ok_or_else(|| ProcessingError::InvalidName {
                name: path.display().to_string(),
                reason: "year unknown: no year directory and no default year".to_string(),
            })?;

        let key = key.with_year(year);
        if key.date().is_none() {
            return Err(ProcessingError::InvalidName {
                name: path.display().to_string(),
                reason: format!("day {} does not exist in {}", key.day_of_year, year),
            });
        }

        Ok(ArchiveEntry {
            path: path.to_path_buf(),
            key,
        })
    }
}

fn collect_archives(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_archives(&path, files)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
            .unwrap_or(false)
        {
            files.push(path);
        }
    }
    Ok(())
}

fn year_from_path(path: &Path) -> Option<i32> {
    path.ancestors()
        .skip(1)
        .filter_map(|p| p.file_name()?.to_str())
        .find(|name| name.len() == 4 && name.chars().all(|c| c.is_ascii_digit()))
        .and_then(|name| name.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CenturyPivot, StationCatalog};
    use crate::test_utils::write_archive;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn inspector() -> ArchiveInspector {
        ArchiveInspector::new(NameResolver::new(
            Arc::new(StationCatalog::builtin()),
            CenturyPivot::new(70).unwrap(),
        ))
    }

    #[test]
    fn test_year_from_path() {
        assert_eq!(year_from_path(Path::new("/data/2023/CBA/cba00100.zip")), Some(2023));
        assert_eq!(year_from_path(Path::new("/data/2019/x/2023/sjc/a.zip")), Some(2023));
        assert_eq!(year_from_path(Path::new("/data/cba/cba00100.zip")), None);
    }

    #[test]
    fn test_scan_partitions_by_station_day() -> Result<()> {
        let dir = TempDir::new()?;
        let root = dir.path();
        write_archive(&root.join("2023/CBA"), "cba00101.zip", &[("cba00101.23s", "")])?;
        write_archive(&root.join("2023/CBA"), "cba00100.zip", &[("cba00100.23s", "")])?;
        write_archive(&root.join("2023/SJC"), "sjc00100.zip", &[("sjc00100.23s", "")])?;
        write_archive(&root.join("2023/XYZ"), "xyz00100.zip", &[("xyz00100.23s", "")])?;
        write_archive(&root.join("2023/CBA"), "notes.zip", &[])?;
        std::fs::write(root.join("2023/readme.txt"), "ignored")?;

        let metadata = inspector().scan(root)?;

        assert_eq!(metadata.entries.len(), 3);
        assert_eq!(metadata.rejected.len(), 2);

        let partitions = metadata.partitions();
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].day.to_string(), "cba 2023-01-01");
        assert_eq!(
            partitions[0].entries.iter().map(|e| e.key.hour).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert!(metadata.display_summary().contains("Station-days: 2"));
        Ok(())
    }

    #[test]
    fn test_missing_year_uses_default() -> Result<()> {
        let dir = TempDir::new()?;
        let path = write_archive(dir.path(), "sjc36600.zip", &[])?;
        let inspector = inspector();

        assert!(matches!(
            inspector.classify(&path),
            Err(ProcessingError::InvalidName { .. })
        ));

        // 2023 has no day 366
        let with_default = inspector.clone().with_default_year(Some(2023));
        assert!(with_default.classify(&path).is_err());

        let leap = inspector.with_default_year(Some(2024));
        assert_eq!(leap.classify(&path)?.key.year, Some(2024));
        Ok(())
    }
}
