use crate::error::{ProcessingError, Result};
use crate::models::{StationCatalog, StationMetadata};
use crate::utils::coordinates::{normalize_longitude, parse_coordinate};
use std::fs;
use std::path::Path;
use tracing::debug;

const README_MARKER: &str = "station coordinates:";
const DEACTIVATED_NOTE: &str = "(deactivated)";

/// Leading columns of `station_coordinates.csv`. Magnetic columns after
/// them are optional and ignored.
const CATALOG_COLUMNS: [&str; 4] = ["station", "active", "geo_lon", "geo_lat"];

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ProcessingError::Config(format!(
            "invalid active flag '{}'",
            other
        ))),
    }
}

/// Loads station catalogs from the files shipped alongside the archive.
pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a catalog CSV with header `station,active,geo_lon,geo_lat[,...]`.
    pub fn read_catalog_csv(&self, path: &Path) -> Result<StationCatalog> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)?;

        let mut stations = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            let field = |index: usize| {
                record.get(index).ok_or_else(|| {
                    ProcessingError::Config(format!(
                        "{} line {}: missing '{}' column",
                        path.display(),
                        line,
                        CATALOG_COLUMNS[index]
                    ))
                })
            };

            let active = parse_flag(field(1)?)?;
            let longitude = normalize_longitude(parse_coordinate(field(2)?)?);
            let latitude = parse_coordinate(field(3)?)?;
            stations.push(StationMetadata::new(field(0)?, longitude, latitude, active));
        }

        debug!("Loaded {} stations from {}", stations.len(), path.display());
        StationCatalog::from_stations(stations)
    }

    /// Read the station table of the network readme: every line after the
    /// `station coordinates:` marker and its column header is
    /// `LON LAT CODE [(deactivated)]`.
    pub fn read_readme(&self, path: &Path) -> Result<StationCatalog> {
        let content = fs::read_to_string(path)?;
        self.parse_readme(&content)
    }

    pub fn parse_readme(&self, content: &str) -> Result<StationCatalog> {
        let start = content.find(README_MARKER).ok_or_else(|| {
            ProcessingError::Config(format!("readme has no '{}' section", README_MARKER))
        })?;

        let section = content[start + README_MARKER.len()..].trim();
        let mut stations = Vec::new();

        for line in section.lines().skip(1) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                continue;
            }

            let (Ok(longitude), Ok(latitude)) = (parse_coordinate(parts[0]), parse_coordinate(parts[1]))
            else {
                continue;
            };

            let code = parts[2].split('(').next().unwrap_or_default().trim();
            let active = !line.contains(DEACTIVATED_NOTE);
            stations.push(StationMetadata::new(
                code,
                normalize_longitude(longitude),
                latitude,
                active,
            ));
        }

        StationCatalog::from_stations(stations)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
