use crate::error::Result;
use crate::models::{MergedDay, StationCatalog, StationDay, TimeSeries};
use crate::writers::{merged_rows, series_rows, ExportRow};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct SeriesCsvRow {
    time: String,
    #[serde(rename = "H")]
    horizontal: Option<f64>,
    #[serde(rename = "D")]
    declination: Option<f64>,
    #[serde(rename = "Z")]
    vertical: Option<f64>,
    #[serde(rename = "T1")]
    temp1: Option<f64>,
    #[serde(rename = "T2")]
    temp2: Option<f64>,
    observed: bool,
    valid: Option<bool>,
}

#[derive(Debug, Serialize)]
struct MergedCsvRow {
    station: String,
    time: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    observed: bool,
    valid: Option<bool>,
    #[serde(rename = "H")]
    horizontal: Option<f64>,
    #[serde(rename = "D")]
    declination: Option<f64>,
    #[serde(rename = "Z")]
    vertical: Option<f64>,
    #[serde(rename = "T1")]
    temp1: Option<f64>,
    #[serde(rename = "T2")]
    temp2: Option<f64>,
}

impl From<ExportRow> for MergedCsvRow {
    fn from(row: ExportRow) -> Self {
        Self {
            time: row.timestamp.format(TIME_FORMAT).to_string(),
            station: row.station,
            latitude: row.latitude,
            longitude: row.longitude,
            observed: row.observed,
            valid: row.valid,
            horizontal: row.horizontal,
            declination: row.declination,
            vertical: row.vertical,
            temp1: row.temp1,
            temp2: row.temp2,
        }
    }
}

/// Writes one CSV per station-day under `{out}/{stn}/{year}/`, 86400 rows
/// each, with empty cells for missing seconds.
pub struct CsvWriter {
    output_dir: PathBuf,
}

impl CsvWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `{out}/{stn}/{year}/{stn}_{YYYYMMDD}_s.csv`
    pub fn series_path(&self, day: &StationDay) -> PathBuf {
        self.output_dir
            .join(day.station())
            .join(day.year().to_string())
            .join(format!("{}_{}_s.csv", day.station(), day.date().format("%Y%m%d")))
    }

    pub fn write_series(&self, series: &TimeSeries) -> Result<PathBuf> {
        let path = self.series_path(&series.day);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        for row in series_rows(series) {
            writer.serialize(SeriesCsvRow {
                time: row.timestamp.format(TIME_FORMAT).to_string(),
                horizontal: row.horizontal,
                declination: row.declination,
                vertical: row.vertical,
                temp1: row.temp1,
                temp2: row.temp2,
                observed: row.observed,
                valid: row.valid,
            })?;
        }
        writer.flush()?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }

    pub fn write_all(&self, series: &[TimeSeries]) -> Result<Vec<PathBuf>> {
        series.iter().map(|s| self.write_series(s)).collect()
    }

    /// Long-form merged day at an explicit path.
    pub fn write_merged(
        &self,
        day: &MergedDay,
        catalog: &StationCatalog,
        path: &Path,
    ) -> Result<usize> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        let mut written = 0;
        for row in merged_rows(day, catalog) {
            writer.serialize(MergedCsvRow::from(row))?;
            written += 1;
        }
        writer.flush()?;

        Ok(written)
    }
}
