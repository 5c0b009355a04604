use crate::error::{ProcessingError, Result};
use crate::models::header::{CHANNEL_LAYOUT, TIME_COLUMNS};
use crate::models::series::LineError;
use crate::models::{Channel, ParsedRecord, Sample, SampleTime};
use crate::utils::constants::{
    DATA_COLUMNS, DEFAULT_FIELD_MAX, DEFAULT_FIELD_MIN, DEFAULT_TEMPERATURE_MAX,
    DEFAULT_TEMPERATURE_MIN,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Soft limits on raw channel values. A value outside them marks the
/// record invalid but keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanityBounds {
    pub field_min: f64,
    pub field_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
}

impl Default for SanityBounds {
    fn default() -> Self {
        Self {
            field_min: DEFAULT_FIELD_MIN,
            field_max: DEFAULT_FIELD_MAX,
            temperature_min: DEFAULT_TEMPERATURE_MIN,
            temperature_max: DEFAULT_TEMPERATURE_MAX,
        }
    }
}

impl SanityBounds {
    pub fn range(&self, channel: Channel) -> (f64, f64) {
        if channel.is_temperature() {
            (self.temperature_min, self.temperature_max)
        } else {
            (self.field_min, self.field_max)
        }
    }

    pub fn contains(&self, sample: &Sample) -> bool {
        Channel::ALL.iter().all(|&channel| {
            let (min, max) = self.range(channel);
            (min..=max).contains(&sample.value(channel))
        })
    }
}

/// Turns data lines into samples, one line at a time.
#[derive(Debug, Clone, Default)]
pub struct RecordParser {
    bounds: SanityBounds,
}

impl RecordParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds(mut self, bounds: SanityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn bounds(&self) -> &SanityBounds {
        &self.bounds
    }

    /// Parse one data line. Blank lines give `Ok(None)`.
    pub fn parse_line(&self, line_number: usize, line: &str) -> Result<Option<ParsedRecord>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(None);
        }

        let fail = |reason: String| ProcessingError::RecordFormat {
            line: line_number,
            reason,
        };

        if tokens.len() != DATA_COLUMNS {
            return Err(fail(format!(
                "expected {} columns, found {}",
                DATA_COLUMNS,
                tokens.len()
            )));
        }

        let [h, m, s] = TIME_COLUMNS.map(|i| tokens[i].parse::<u8>());
        let (hour, minute, second) = match (h, m, s) {
            (Ok(h), Ok(m), Ok(s)) => (h, m, s),
            _ => {
                return Err(fail(format!(
                    "time '{} {} {}' is not integral",
                    tokens[0], tokens[1], tokens[2]
                )))
            }
        };

        if SampleTime::new(hour, minute, second).is_none() {
            return Err(fail(format!(
                "time {:02}:{:02}:{:02} out of range",
                hour, minute, second
            )));
        }

        let mut values = [0.0f64; 5];
        for (value, spec) in values.iter_mut().zip(CHANNEL_LAYOUT.iter()) {
            let token = tokens[spec.data_column];
            *value = token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| fail(format!("{} value '{}' is not a finite number", spec.channel, token)))?;
        }

        let sample = Sample {
            hour,
            minute,
            second,
            horizontal: values[0],
            declination: values[1],
            vertical: values[2],
            temp1: values[3],
            temp2: values[4],
        };

        Ok(Some(ParsedRecord {
            valid: self.bounds.contains(&sample),
            sample,
        }))
    }

    /// Fold numbered lines into records and per-line errors. A bad line never
    /// stops the fold.
    pub fn parse_lines<'a, I>(&self, lines: I) -> (Vec<ParsedRecord>, Vec<LineError>)
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        lines.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut records, mut errors), (number, line)| {
                match self.parse_line(number, line) {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => {
                        debug!("Skipping line {}: {}", number, e);
                        errors.push(LineError::from_error(number, &e));
                    }
                }
                (records, errors)
            },
        )
    }

    /// Parse the data section of a member whose header spans
    /// `header_lines` lines. Line numbers are 1-based file lines.
    pub fn parse_body(&self, text: &str, header_lines: usize) -> (Vec<ParsedRecord>, Vec<LineError>) {
        self.parse_lines(
            text.lines()
                .enumerate()
                .skip(header_lines)
                .map(|(i, line)| (i + 1, line)),
        )
    }
}
