use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECONDS_PER_DAY: usize = 86_400;

/// Time of day at one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl SampleTime {
    pub fn new(hour: u8, minute: u8, second: u8) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Self {
            hour,
            minute,
            second,
        })
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        if slot >= SECONDS_PER_DAY {
            return None;
        }
        Some(Self {
            hour: (slot / 3600) as u8,
            minute: ((slot % 3600) / 60) as u8,
            second: (slot % 60) as u8,
        })
    }

    /// Seconds since midnight.
    pub fn slot(&self) -> usize {
        usize::from(self.hour) * 3600 + usize::from(self.minute) * 60 + usize::from(self.second)
    }
}

impl fmt::Display for SampleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

/// One raw reading in instrument units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub horizontal: f64,
    pub declination: f64,
    pub vertical: f64,
    pub temp1: f64,
    pub temp2: f64,
}

impl Sample {
    pub fn time(&self) -> SampleTime {
        SampleTime {
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        }
    }

    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Horizontal => self.horizontal,
            Channel::Declination => self.declination,
            Channel::Vertical => self.vertical,
            Channel::Temp1 => self.temp1,
            Channel::Temp2 => self.temp2,
        }
    }
}

/// A parsed data line. `valid` is false when a channel fell outside the soft
/// sanity bounds; the values are kept either way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub sample: Sample,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Horizontal,  // H(Ch2)
    Declination, // D(Ch4)
    Vertical,    // Z(Ch6)
    Temp1,       // T1(Ch7)
    Temp2,       // T2(Ch8)
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Horizontal,
        Channel::Declination,
        Channel::Vertical,
        Channel::Temp1,
        Channel::Temp2,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Horizontal => "H",
            Channel::Declination => "D",
            Channel::Vertical => "Z",
            Channel::Temp1 => "T1",
            Channel::Temp2 => "T2",
        }
    }

    pub fn is_temperature(&self) -> bool {
        matches!(self, Channel::Temp1 | Channel::Temp2)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_conversion() {
        let noon = SampleTime::new(12, 0, 0).unwrap();
        assert_eq!(noon.slot(), 43_200);
        assert_eq!(SampleTime::from_slot(43_200), Some(noon));

        let last = SampleTime::from_slot(SECONDS_PER_DAY - 1).unwrap();
        assert_eq!(last.to_string(), "23:59:59");
        assert_eq!(SampleTime::from_slot(SECONDS_PER_DAY), None);
    }

    #[test]
    fn test_invalid_time_components() {
        assert!(SampleTime::new(24, 0, 0).is_none());
        assert!(SampleTime::new(0, 60, 0).is_none());
        assert!(SampleTime::new(0, 0, 60).is_none());
    }
}
