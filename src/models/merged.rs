use crate::models::series::Slot;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All stations at one second. Each reading stands on its own: a missing
/// station is reported missing, never filled from its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFrame {
    pub timestamp: NaiveDateTime,
    pub readings: BTreeMap<String, Slot>,
}

impl MergedFrame {
    pub fn reading(&self, station: &str) -> Option<&Slot> {
        self.readings.get(&station.to_lowercase())
    }

    pub fn observed_count(&self) -> usize {
        self.readings.values().filter(|s| !s.is_missing()).count()
    }
}

/// One day of merged frames, in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDay {
    pub date: NaiveDate,
    pub stations: Vec<String>,
    pub frames: Vec<MergedFrame>,
}

impl MergedDay {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
