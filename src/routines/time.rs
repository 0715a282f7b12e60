use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::OiError;

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp written as a date, a naive datetime or an RFC 3339 string.
///
/// RFC 3339 values are converted to UTC before the offset is dropped.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, OiError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| OiError::InvalidEpoch {
            value: value.to_string(),
        })
}

/// Fractional days elapsed from `epoch` to `time`.
pub fn days_since(epoch: NaiveDateTime, time: NaiveDateTime) -> f64 {
    let delta = time - epoch;
    let seconds = delta.num_seconds() as f64;
    let subsec = (delta - Duration::seconds(delta.num_seconds()))
        .num_nanoseconds()
        .unwrap_or(0) as f64
        * 1e-9;
    (seconds + subsec) / SECONDS_PER_DAY
}

/// Inverse of [days_since], rounded to the millisecond.
pub fn from_days(epoch: NaiveDateTime, days: f64) -> Result<NaiveDateTime, OiError> {
    let millis = days * SECONDS_PER_DAY * 1e3;
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return Err(OiError::InvalidEpoch {
            value: days.to_string(),
        });
    }
    epoch
        .checked_add_signed(Duration::milliseconds(millis.round() as i64))
        .ok_or_else(|| OiError::InvalidEpoch {
            value: days.to_string(),
        })
}

/// Parse a time column value: either a timestamp or a plain number of days since `epoch`.
pub fn parse_time_value(value: &str, epoch: NaiveDateTime) -> Result<f64, OiError> {
    match value.trim().parse::<f64>() {
        Ok(days) => Ok(days),
        Err(_) => parse_datetime(value).map(|t| days_since(epoch, t)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> NaiveDateTime {
        parse_datetime("2012-10-01").unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        for value in [
            "2012-10-02",
            "2012-10-02 00:00:00",
            "2012-10-02T00:00:00",
            "2012-10-02T00:00:00.000",
            "2012-10-02T00:00:00Z",
            "2012-10-02T02:00:00+02:00",
        ] {
            let t = parse_datetime(value).unwrap();
            assert_eq!(days_since(epoch(), t), 1.0, "{value}");
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_datetime("first of october"),
            Err(OiError::InvalidEpoch { .. })
        ));
    }

    #[test]
    fn fractional_days() {
        let t = parse_datetime("2012-10-01T12:00:00").unwrap();
        assert_eq!(days_since(epoch(), t), 0.5);
        assert_eq!(from_days(epoch(), 0.5).unwrap(), t);
    }

    #[test]
    fn numeric_time_is_days() {
        assert_eq!(parse_time_value("3.25", epoch()).unwrap(), 3.25);
        assert_eq!(parse_time_value("2012-09-30", epoch()).unwrap(), -1.0);
    }
}
