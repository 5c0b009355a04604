use crate::error::{ProcessingError, Result};
use crate::models::header::{Header, CHANNEL_LAYOUT};
use crate::utils::constants::{HEADER_COLUMN_TOKENS, HEADER_LINES};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use tracing::debug;

/// Decode a raw member. Loggers write UTF-8 or Latin-1 (station names carry
/// accents), so invalid UTF-8 falls back to Windows-1252.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!("Member is not UTF-8, decoding as Windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text
        }
    }
}

/// Parses the fixed five-line header of a raw one-second file.
///
/// Line 1 is the free-text description `NAME EQUIPMENT <DOY>`. Blank lines
/// and separator rules (`-----`) are skipped; the first remaining line after
/// line 1 is the column header, the next one (if any) the units line.
/// Everything after line 5 is data.
#[derive(Debug, Clone, Default)]
pub struct HeaderParser;

impl HeaderParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse the header at the top of `text` and return it together with the
    /// number of lines it occupies.
    pub fn parse(&self, text: &str) -> Result<(Header, usize)> {
        let lines: Vec<&str> = text.lines().take(HEADER_LINES).collect();
        Ok((self.parse_lines(&lines)?, HEADER_LINES))
    }

    pub fn parse_lines(&self, lines: &[&str]) -> Result<Header> {
        if lines.len() < HEADER_LINES {
            return Err(ProcessingError::HeaderFormat {
                reason: format!(
                    "expected {} header lines, found {}",
                    HEADER_LINES,
                    lines.len()
                ),
            });
        }

        let description = lines[0].trim();
        if description.is_empty() {
            return Err(ProcessingError::HeaderFormat {
                reason: "line 1 (station description) is blank".to_string(),
            });
        }

        let mut rest = lines[1..HEADER_LINES]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !is_separator(line));

        let column_line = rest.next().ok_or_else(|| ProcessingError::HeaderFormat {
            reason: "no column header line".to_string(),
        })?;

        let column_tokens: Vec<String> = column_line
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if column_tokens.len() != HEADER_COLUMN_TOKENS {
            return Err(ProcessingError::HeaderFormat {
                reason: format!(
                    "column header has {} tokens, expected {}: '{}'",
                    column_tokens.len(),
                    HEADER_COLUMN_TOKENS,
                    column_line
                ),
            });
        }

        let channel_labels = CHANNEL_LAYOUT
            .iter()
            .map(|spec| column_tokens[spec.header_token].clone())
            .collect();

        let units = rest
            .next()
            .map(|line| line.split_whitespace().map(str::to_string).collect());

        let (equipment, day_of_year) = parse_description(description);

        Ok(Header {
            station_name: lines[0].trim_end().to_string(),
            equipment,
            day_of_year,
            channel_labels,
            column_tokens,
            units,
        })
    }
}

/// Blank, or punctuation only (`----`, `====`).
fn is_separator(line: &str) -> bool {
    !line.chars().any(char::is_alphanumeric)
}

/// Pull the equipment id (last word before the marker) and the `<DOY>`
/// marker out of line 1. Both are optional.
fn parse_description(line: &str) -> (Option<String>, Option<u16>) {
    let (name_part, day_of_year) = match line.split_once('<') {
        Some((before, marker)) => {
            let doy = marker
                .split('>')
                .next()
                .and_then(|d| d.trim().parse::<u16>().ok());
            (before, doy)
        }
        None => (line, None),
    };

    let words: Vec<&str> = name_part.split_whitespace().collect();
    let equipment = if words.len() >= 2 {
        words.last().map(|w| w.to_string())
    } else {
        None
    };

    (equipment, day_of_year)
}
