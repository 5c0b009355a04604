pub mod csv_writer;
pub mod parquet_writer;

pub use csv_writer::CsvWriter;
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};

use crate::models::{MergedDay, Slot, StationCatalog, TimeSeries};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One station-second in export form. Missing seconds keep their row with
/// `observed = false` and empty channels; they are never written as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub station: String,
    pub timestamp: NaiveDateTime,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observed: bool,
    pub valid: Option<bool>,
    pub horizontal: Option<f64>,
    pub declination: Option<f64>,
    pub vertical: Option<f64>,
    pub temp1: Option<f64>,
    pub temp2: Option<f64>,
}

impl ExportRow {
    pub fn new(
        station: &str,
        coordinates: Option<(f64, f64)>,
        timestamp: NaiveDateTime,
        slot: &Slot,
    ) -> Self {
        let record = slot.record();
        let sample = record.map(|r| r.sample);

        Self {
            station: station.to_string(),
            timestamp,
            latitude: coordinates.map(|(lat, _)| lat),
            longitude: coordinates.map(|(_, lon)| lon),
            observed: record.is_some(),
            valid: record.map(|r| r.valid),
            horizontal: sample.map(|s| s.horizontal),
            declination: sample.map(|s| s.declination),
            vertical: sample.map(|s| s.vertical),
            temp1: sample.map(|s| s.temp1),
            temp2: sample.map(|s| s.temp2),
        }
    }
}

pub fn series_rows(series: &TimeSeries) -> impl Iterator<Item = ExportRow> + '_ {
    let coordinates = Some((series.latitude, series.longitude));
    series
        .iter()
        .map(move |(timestamp, slot)| ExportRow::new(series.station(), coordinates, timestamp, slot))
}

/// Merged frames flattened to one row per station and second, frame order
/// first. Coordinates come from the catalog.
pub fn merged_rows<'a>(
    day: &'a MergedDay,
    catalog: &'a StationCatalog,
) -> impl Iterator<Item = ExportRow> + 'a {
    day.frames.iter().flat_map(move |frame| {
        frame.readings.iter().map(move |(station, slot)| {
            let coordinates = catalog.get(station).map(|s| (s.latitude, s.longitude));
            ExportRow::new(station, coordinates, frame.timestamp, slot)
        })
    })
}
