use crate::error::{ProcessingError, Result};

/// Parse a coordinate written either as signed decimal degrees or as
/// `D:M:S`. A leading minus applies to the whole value.
pub fn parse_coordinate(coord_str: &str) -> Result<f64> {
    let trimmed = coord_str.trim();

    if !trimmed.contains(':') {
        let value = trimmed.parse::<f64>().map_err(|_| {
            ProcessingError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", coord_str))
        })?;
        if !value.is_finite() {
            return Err(ProcessingError::InvalidCoordinate(format!(
                "Coordinate is not finite: '{}'",
                coord_str
            )));
        }
        return Ok(value);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() != 3 {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Invalid DMS format: '{}'. Expected format: 'DD:MM:SS'",
            coord_str
        )));
    }

    let field = |value: &str, what: &str| {
        value.parse::<f64>().map_err(|_| {
            ProcessingError::InvalidCoordinate(format!("Invalid {} value: '{}'", what, value))
        })
    };

    let degrees = field(parts[0], "degrees")?;
    let minutes = field(parts[1], "minutes")?;
    let seconds = field(parts[2], "seconds")?;

    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Minutes and seconds must be below 60 in '{}'",
            coord_str
        )));
    }

    let magnitude = degrees.abs() + minutes / 60.0 + seconds / 3600.0;
    Ok(if trimmed.starts_with('-') {
        -magnitude
    } else {
        magnitude
    })
}

/// Map an east-positive 0..360 longitude onto -180..180. Values already in
/// range are returned unchanged.
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude > 180.0 {
        longitude - 360.0
    } else {
        longitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_coordinate() {
        assert!((parse_coordinate("-45.96").unwrap() - -45.96).abs() < 1e-9);
        assert!((parse_coordinate(" -23.21 ").unwrap() - -23.21).abs() < 1e-9);
        assert!(parse_coordinate("south").is_err());
        assert!(parse_coordinate("NaN").is_err());
    }

    #[test]
    fn test_parse_dms_coordinate() {
        // -23:12:36 = -(23 + 0.2 + 0.01)
        assert!((parse_coordinate("-23:12:36").unwrap() - -23.21).abs() < 1e-9);
        assert!(parse_coordinate("23:12").is_err());
        assert!(parse_coordinate("23:72:00").is_err());
    }

    #[test]
    fn test_normalize_longitude() {
        assert!((normalize_longitude(314.04) - -45.96).abs() < 1e-9);
        assert_eq!(normalize_longitude(-45.96), -45.96);
        assert_eq!(normalize_longitude(180.0), 180.0);
    }
}
