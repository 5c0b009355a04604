use crate::error::{ProcessingError, Result};
use crate::utils::constants::EMBRACE_STATIONS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct StationMetadata {
    /// Three-letter station code, stored lower case.
    #[validate(length(equal = 3))]
    pub code: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// Deactivated stations stay in the catalog; their archives still resolve.
    pub active: bool,
}

impl StationMetadata {
    pub fn new(code: &str, longitude: f64, latitude: f64, active: bool) -> Self {
        Self {
            code: code.trim().to_lowercase(),
            latitude,
            longitude,
            active,
        }
    }
}

/// Read-only station reference table, built once at startup and shared
/// (usually behind an `Arc`) with every component that needs it.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: BTreeMap<String, StationMetadata>,
}

impl StationCatalog {
    /// The EMBRACE network as published with the one-second archive.
    pub fn builtin() -> Self {
        let stations = EMBRACE_STATIONS
            .iter()
            .map(|&(lon, lat, code, active)| StationMetadata::new(code, lon, lat, active))
            .map(|s| (s.code.clone(), s))
            .collect();

        Self { stations }
    }

    /// Build a catalog from externally supplied metadata. Every entry is
    /// validated and codes must be unique (case-insensitively).
    pub fn from_stations<I>(stations: I) -> Result<Self>
    where
        I: IntoIterator<Item = StationMetadata>,
    {
        let mut map = BTreeMap::new();

        for mut station in stations {
            station.code = station.code.trim().to_lowercase();
            station.validate()?;

            if map.contains_key(&station.code) {
                return Err(ProcessingError::Config(format!(
                    "Duplicate station code in catalog: {}",
                    station.code
                )));
            }
            map.insert(station.code.clone(), station);
        }

        Ok(Self { stations: map })
    }

    pub fn get(&self, code: &str) -> Option<&StationMetadata> {
        self.stations.get(&code.trim().to_lowercase())
    }

    pub fn lookup(&self, code: &str) -> Result<&StationMetadata> {
        self.get(code).ok_or_else(|| ProcessingError::UnknownStation {
            code: code.to_string(),
        })
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationMetadata> {
        self.stations.values()
    }

    pub fn active_stations(&self) -> impl Iterator<Item = &StationMetadata> {
        self.stations.values().filter(|s| s.active)
    }

    pub fn deactivated_stations(&self) -> impl Iterator<Item = &StationMetadata> {
        self.stations.values().filter(|s| !s.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = StationCatalog::builtin();

        assert_eq!(catalog.len(), 18);
        assert_eq!(catalog.deactivated_stations().count(), 3);
        assert_eq!(catalog.active_stations().count(), 15);

        for station in catalog.iter() {
            assert!(station.validate().is_ok(), "invalid entry {}", station.code);
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let catalog = StationCatalog::builtin();

        assert!(catalog.contains("CBA"));
        assert!(catalog.contains("cba"));
        assert_eq!(catalog.get("Sjc").map(|s| s.code.as_str()), Some("sjc"));
        assert!(matches!(
            catalog.lookup("xyz"),
            Err(ProcessingError::UnknownStation { .. })
        ));
    }

    #[test]
    fn test_deactivated_station_is_present() {
        let catalog = StationCatalog::builtin();
        let inactive = catalog.deactivated_stations().next().unwrap();

        assert!(catalog.contains(&inactive.code));
        assert!(!inactive.active);
    }

    #[test]
    fn test_from_stations_rejects_duplicates_and_bad_coordinates() {
        let dup = StationCatalog::from_stations(vec![
            StationMetadata::new("abc", -45.0, -23.0, true),
            StationMetadata::new("ABC", -46.0, -22.0, true),
        ]);
        assert!(dup.is_err());

        let bad = StationCatalog::from_stations(vec![StationMetadata::new(
            "abc", -45.0, -95.0, true,
        )]);
        assert!(matches!(bad, Err(ProcessingError::Validation(_))));
    }
}
