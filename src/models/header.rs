use crate::models::sample::Channel;
use serde::{Deserialize, Serialize};

/// Where each channel lives, in the column-header line and in a data row.
///
/// Label text differs between firmware revisions, so positions are the
/// contract; the header tokens are never matched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub channel: Channel,
    pub header_token: usize,
    pub data_column: usize,
}

/// Column-header line: `HH MM SS H(Ch2) D(Ch4) Z(Ch6) T1 (Ch7) T2 (Ch8)`.
/// Tokens 7 and 9 are the detached channel suffixes of the temperature labels.
pub const CHANNEL_LAYOUT: [ColumnSpec; 5] = [
    ColumnSpec {
        channel: Channel::Horizontal,
        header_token: 3,
        data_column: 3,
    },
    ColumnSpec {
        channel: Channel::Declination,
        header_token: 4,
        data_column: 4,
    },
    ColumnSpec {
        channel: Channel::Vertical,
        header_token: 5,
        data_column: 5,
    },
    ColumnSpec {
        channel: Channel::Temp1,
        header_token: 6,
        data_column: 6,
    },
    ColumnSpec {
        channel: Channel::Temp2,
        header_token: 8,
        data_column: 7,
    },
];

pub const TIME_COLUMNS: [usize; 3] = [0, 1, 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Line 1 as written by the logger.
    pub station_name: String,
    pub equipment: Option<String>,
    /// The `<DOY>` marker of line 1, when present.
    pub day_of_year: Option<u16>,
    /// Labels in H, D, Z, T1, T2 order.
    pub channel_labels: Vec<String>,
    pub column_tokens: Vec<String>,
    pub units: Option<Vec<String>>,
}

impl Header {
    pub fn channel_label(&self, channel: Channel) -> &str {
        CHANNEL_LAYOUT
            .iter()
            .position(|spec| spec.channel == channel)
            .and_then(|i| self.channel_labels.get(i))
            .map(String::as_str)
            .unwrap_or_else(|| channel.label())
    }
}
