use crate::error::{ProcessingError, Result};
use crate::models::{CenturyPivot, FileKey, StationCatalog};
use crate::utils::constants::{ARCHIVE_EXTENSION, STATION_CODE_LEN};
use chrono::{Datelike, Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const STEM_LEN: usize = STATION_CODE_LEN + 5;

/// Turns archive and member file names into [`FileKey`]s.
///
/// Structural problems are reported as `InvalidName` before the station code
/// is looked up, so an unknown code only surfaces for otherwise well-formed
/// names.
#[derive(Debug, Clone)]
pub struct NameResolver {
    catalog: Arc<StationCatalog>,
    pivot: CenturyPivot,
}

impl NameResolver {
    pub fn new(catalog: Arc<StationCatalog>, pivot: CenturyPivot) -> Self {
        Self { catalog, pivot }
    }

    pub fn catalog(&self) -> &StationCatalog {
        &self.catalog
    }

    pub fn pivot(&self) -> CenturyPivot {
        self.pivot
    }

    /// `STNDOYHH.zip`
    pub fn resolve_archive_name(&self, name: &str) -> Result<FileKey> {
        let invalid = |reason: &str| ProcessingError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let (stem, extension) = name
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing extension"))?;
        if !extension.eq_ignore_ascii_case(ARCHIVE_EXTENSION) {
            return Err(invalid("expected a .zip extension"));
        }

        let key = parse_stem(name, stem)?;
        self.check_station(key)
    }

    /// `STNDOYHH.YYs`, the two-digit year resolved through the century pivot.
    pub fn resolve_member_name(&self, name: &str) -> Result<FileKey> {
        let invalid = |reason: String| ProcessingError::InvalidName {
            name: name.to_string(),
            reason,
        };

        let (stem, suffix) = name
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing year suffix".to_string()))?;

        let suffix_bytes = suffix.as_bytes();
        if suffix_bytes.len() != 3
            || !suffix_bytes[..2].iter().all(u8::is_ascii_digit)
            || !suffix_bytes[2].eq_ignore_ascii_case(&b's')
        {
            return Err(invalid(format!(
                "year suffix '{}' is not two digits followed by 's'",
                suffix
            )));
        }

        let two_digit_year = (suffix_bytes[0] - b'0') * 10 + (suffix_bytes[1] - b'0');
        let year = self.pivot.resolve(two_digit_year);

        let key = parse_stem(name, stem)?.with_year(year);
        if key.date().is_none() {
            return Err(invalid(format!(
                "day {} does not exist in {}",
                key.day_of_year, year
            )));
        }

        self.check_station(key)
    }

    /// Resolve the file name of `path`; the directories are ignored.
    pub fn resolve_path(&self, path: &Path) -> Result<FileKey> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ProcessingError::InvalidName {
                name: path.display().to_string(),
                reason: "path has no UTF-8 file name".to_string(),
            })?;

        let is_archive = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
            .unwrap_or(false);

        if is_archive {
            self.resolve_archive_name(name)
        } else {
            self.resolve_member_name(name)
        }
    }

    fn check_station(&self, key: FileKey) -> Result<FileKey> {
        self.catalog.lookup(&key.station)?;
        Ok(key)
    }
}

fn parse_stem(name: &str, stem: &str) -> Result<FileKey> {
    let invalid = |reason: String| ProcessingError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if stem.len() != STEM_LEN || !stem.is_ascii() {
        return Err(invalid(format!(
            "expected STNDOYHH, found '{}'",
            stem
        )));
    }

    let (station, digits) = stem.split_at(STATION_CODE_LEN);
    if !station.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid(format!("station code '{}' is not alphabetic", station)));
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(format!("'{}' is not a day and hour", digits)));
    }

    let day_of_year: u16 = digits[..3]
        .parse()
        .map_err(|_| invalid(format!("invalid day of year '{}'", &digits[..3])))?;
    let hour: u8 = digits[3..]
        .parse()
        .map_err(|_| invalid(format!("invalid hour '{}'", &digits[3..])))?;

    if !(1..=366).contains(&day_of_year) {
        return Err(invalid(format!("day of year {} outside 1-366", day_of_year)));
    }
    if hour > 23 {
        return Err(invalid(format!("hour {} outside 0-23", hour)));
    }

    Ok(FileKey {
        station: station.to_lowercase(),
        day_of_year,
        hour,
        year: None,
    })
}

/// Generate default Parquet filename with format: embrace-series-{YYMMDD}.parquet
pub fn generate_default_parquet_filename() -> PathBuf {
    let now = Local::now();
    let filename = format!(
        "embrace-series-{:02}{:02}{:02}.parquet",
        now.year() % 100,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}

/// Merged multi-station file for one day: {dir}/embrace-merged-{YYYYMMDD}.{ext}
pub fn generate_merged_filename(output_dir: &Path, date: NaiveDate, extension: &str) -> PathBuf {
    output_dir.join(format!(
        "embrace-merged-{}.{}",
        date.format("%Y%m%d"),
        extension
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NameResolver {
        NameResolver::new(
            Arc::new(StationCatalog::builtin()),
            CenturyPivot::new(70).unwrap(),
        )
    }

    #[test]
    fn test_resolve_archive_name() {
        let key = resolver().resolve_archive_name("cba00100.zip").unwrap();

        assert_eq!(key.station, "cba");
        assert_eq!(key.day_of_year, 1);
        assert_eq!(key.hour, 0);
        assert_eq!(key.year, None);
        assert_eq!(key.archive_name(), "cba00100.zip");
    }

    #[test]
    fn test_resolve_member_name_with_pivot() {
        let resolver = resolver();

        let key = resolver.resolve_member_name("cba00100.23s").unwrap();
        assert_eq!(key.year, Some(2023));
        assert_eq!(key.member_name().as_deref(), Some("cba00100.23s"));

        let key = resolver.resolve_member_name("sjc36523.98S").unwrap();
        assert_eq!(key.year, Some(1998));
        assert_eq!(key.member_name().as_deref(), Some("sjc36523.98s"));
    }

    #[test]
    fn test_round_trip_for_every_station() {
        let resolver = resolver();

        for station in resolver.catalog().iter() {
            let archive = format!("{}15912.zip", station.code);
            let member = format!("{}15912.24s", station.code);

            assert_eq!(
                resolver.resolve_archive_name(&archive).unwrap().archive_name(),
                archive
            );
            assert_eq!(
                resolver
                    .resolve_member_name(&member)
                    .unwrap()
                    .member_name()
                    .unwrap(),
                member
            );
        }
    }

    #[test]
    fn test_uppercase_is_canonicalised() {
        let key = resolver().resolve_archive_name("CBA00100.ZIP").unwrap();
        assert_eq!(key.archive_name(), "cba00100.zip");
    }

    #[test]
    fn test_structural_errors() {
        let resolver = resolver();

        for name in [
            "cba00100.txt",
            "cba0010.zip",
            "cba000100.zip",
            "cba00000.zip",
            "cba36700.zip",
            "cba00124.zip",
            "c1a00100.zip",
            "cba001xx.zip",
            "cba00100",
            "cba00100.2s",
            "cba00100.23x",
        ] {
            assert!(
                matches!(
                    resolver.resolve_path(Path::new(name)),
                    Err(ProcessingError::InvalidName { .. })
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_day_366_needs_leap_year() {
        let resolver = resolver();

        assert!(resolver.resolve_member_name("sjc36600.24s").is_ok());
        assert!(matches!(
            resolver.resolve_member_name("sjc36600.23s"),
            Err(ProcessingError::InvalidName { .. })
        ));
        // Year unknown: accepted until it is attached.
        assert!(resolver.resolve_archive_name("sjc36600.zip").is_ok());
    }

    #[test]
    fn test_unknown_station() {
        assert!(matches!(
            resolver().resolve_archive_name("xyz00100.zip"),
            Err(ProcessingError::UnknownStation { .. })
        ));
    }

    #[test]
    fn test_resolve_path_ignores_directories() {
        let key = resolver()
            .resolve_path(Path::new("/data/2023/CBA/cba00100.zip"))
            .unwrap();
        assert_eq!(key.stem(), "cba00100");
    }

    #[test]
    fn test_generate_default_parquet_filename() {
        let filename = generate_default_parquet_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output/embrace-series-"));
        assert!(filename_str.ends_with(".parquet"));
    }

    #[test]
    fn test_generate_merged_filename() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(
            generate_merged_filename(Path::new("out"), date, "csv"),
            PathBuf::from("out/embrace-merged-20230101.csv")
        );
    }
}
