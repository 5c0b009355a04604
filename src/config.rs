use crate::error::{ProcessingError, Result};
use crate::models::{CenturyPivot, StationCatalog};
use crate::readers::record_reader::SanityBounds;
use crate::readers::station_reader::StationReader;
use crate::utils::constants::*;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::{Validate, ValidationError};

pub const ENV_PREFIX: &str = "EMBRACE";

/// Run configuration. Sources, later ones winning: built-in defaults, an
/// optional TOML file, `EMBRACE__*` environment variables, command-line
/// flags.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bounds"))]
pub struct Settings {
    /// Two-digit years at or above this are 19xx. No default.
    #[validate(range(max = 100))]
    pub century_pivot: u8,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    #[validate(range(min = 1))]
    pub io_timeout_secs: u64,

    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    pub field_min: f64,
    pub field_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,

    pub strict_merge: bool,
    pub required_stations: Vec<String>,

    /// Station table (CSV or network readme). The built-in table otherwise.
    pub station_catalog: Option<PathBuf>,

    /// Year for archives that sit outside a `{year}` directory.
    pub default_year: Option<i32>,

    pub compression: String,

    #[validate(range(min = 1))]
    pub row_group_size: usize,

    #[validate(range(min = 0.0, max = 1.0))]
    pub min_coverage: f64,
}

fn validate_bounds(settings: &Settings) -> std::result::Result<(), ValidationError> {
    if settings.field_min >= settings.field_max
        || settings.temperature_min >= settings.temperature_max
    {
        return Err(ValidationError::new("sanity_bounds_inverted"));
    }
    Ok(())
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub century_pivot: Option<u8>,
    pub max_workers: Option<usize>,
    pub io_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub strict_merge: Option<bool>,
    pub required_stations: Option<Vec<String>>,
    pub station_catalog: Option<PathBuf>,
    pub default_year: Option<i32>,
    pub compression: Option<String>,
    pub min_coverage: Option<f64>,
}

impl Settings {
    pub fn load(config_file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        Self::load_with_env(config_file, overrides, None)
    }

    /// As [`Settings::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        config_file: Option<&Path>,
        overrides: &SettingsOverrides,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("max_workers", num_cpus::get() as i64)?
            .set_default("io_timeout_secs", DEFAULT_IO_TIMEOUT_SECS as i64)?
            .set_default("max_retries", i64::from(DEFAULT_MAX_RETRIES))?
            .set_default("retry_backoff_ms", DEFAULT_RETRY_BACKOFF_MS as i64)?
            .set_default("field_min", DEFAULT_FIELD_MIN)?
            .set_default("field_max", DEFAULT_FIELD_MAX)?
            .set_default("temperature_min", DEFAULT_TEMPERATURE_MIN)?
            .set_default("temperature_max", DEFAULT_TEMPERATURE_MAX)?
            .set_default("strict_merge", false)?
            .set_default("required_stations", Vec::<String>::new())?
            .set_default("compression", COMPRESSION_SNAPPY)?
            .set_default("row_group_size", DEFAULT_ROW_GROUP_SIZE as i64)?
            .set_default("min_coverage", DEFAULT_MIN_COVERAGE)?;

        if let Some(path) = config_file {
            debug!("Reading settings from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("required_stations")
                .source(env),
        );

        builder = builder
            .set_override_option("century_pivot", overrides.century_pivot.map(i64::from))?
            .set_override_option("max_workers", overrides.max_workers.map(|v| v as i64))?
            .set_override_option("io_timeout_secs", overrides.io_timeout_secs.map(|v| v as i64))?
            .set_override_option("max_retries", overrides.max_retries.map(i64::from))?
            .set_override_option("strict_merge", overrides.strict_merge)?
            .set_override_option("required_stations", overrides.required_stations.clone())?
            .set_override_option(
                "station_catalog",
                overrides
                    .station_catalog
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )?
            .set_override_option("default_year", overrides.default_year.map(i64::from))?
            .set_override_option("compression", overrides.compression.clone())?
            .set_override_option("min_coverage", overrides.min_coverage)?;

        let config = builder.build()?;

        if config.get::<i64>("century_pivot").is_err() {
            return Err(ProcessingError::Config(format!(
                "century_pivot is required: pass --century-pivot, set {}__CENTURY_PIVOT or add it to the config file",
                ENV_PREFIX
            )));
        }

        let mut settings: Settings = config.try_deserialize()?;
        settings.required_stations = settings
            .required_stations
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        settings.validate()?;
        Ok(settings)
    }

    pub fn century_pivot(&self) -> Result<CenturyPivot> {
        CenturyPivot::new(self.century_pivot)
    }

    pub fn sanity_bounds(&self) -> SanityBounds {
        SanityBounds {
            field_min: self.field_min,
            field_max: self.field_max,
            temperature_min: self.temperature_min,
            temperature_max: self.temperature_max,
        }
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// The configured station table, or the built-in network.
    pub fn load_catalog(&self) -> Result<StationCatalog> {
        let Some(path) = &self.station_catalog else {
            return Ok(StationCatalog::builtin());
        };

        let reader = StationReader::new();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);

        if is_csv {
            reader.read_catalog_csv(path)
        } else {
            reader.read_readme(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_century_pivot_is_required() {
        let result = Settings::load_with_env(None, &SettingsOverrides::default(), no_env());
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let overrides = SettingsOverrides {
            century_pivot: Some(70),
            ..Default::default()
        };
        let settings = Settings::load_with_env(None, &overrides, no_env())?;

        assert_eq!(settings.century_pivot()?.resolve(23), 2023);
        assert_eq!(settings.io_timeout(), Duration::from_secs(30));
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.compression, "snappy");
        assert_eq!(settings.row_group_size, 86_400);
        assert!(!settings.strict_merge);
        assert!(settings.required_stations.is_empty());
        assert_eq!(settings.load_catalog()?.len(), 18);
        Ok(())
    }

    #[test]
    fn test_layering_file_env_flags() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "century_pivot = 50")?;
        writeln!(file, "max_retries = 5")?;
        writeln!(file, "io_timeout_secs = 10")?;
        writeln!(file, "required_stations = [\"sjc\"]")?;

        let env = HashMap::from([
            ("EMBRACE__MAX_RETRIES".to_string(), "4".to_string()),
            ("EMBRACE__REQUIRED_STATIONS".to_string(), "SJC,vss".to_string()),
            ("EMBRACE__STRICT_MERGE".to_string(), "true".to_string()),
        ]);

        let overrides = SettingsOverrides {
            max_retries: Some(1),
            ..Default::default()
        };

        let settings = Settings::load_with_env(Some(file.path()), &overrides, Some(env))?;

        assert_eq!(settings.century_pivot, 50);
        assert_eq!(settings.io_timeout_secs, 10);
        assert_eq!(settings.max_retries, 1);
        assert!(settings.strict_merge);
        assert_eq!(settings.required_stations, vec!["sjc", "vss"]);
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let overrides = SettingsOverrides {
            century_pivot: Some(70),
            min_coverage: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            Settings::load_with_env(None, &overrides, no_env()),
            Err(ProcessingError::Validation(_))
        ));

        let env = HashMap::from([("EMBRACE__FIELD_MIN".to_string(), "2e6".to_string())]);
        let overrides = SettingsOverrides {
            century_pivot: Some(70),
            ..Default::default()
        };
        assert!(matches!(
            Settings::load_with_env(None, &overrides, Some(env)),
            Err(ProcessingError::Validation(_))
        ));
    }
}
