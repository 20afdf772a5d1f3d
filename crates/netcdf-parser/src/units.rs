//! CF time units (`<unit> since <epoch>`).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{DecodeError, DecodeResult};

/// Parsed CF time units attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    /// Seconds per unit, in milliseconds to stay integral for `milliseconds`.
    millis_per_unit: i64,
    epoch: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse strings like `seconds since 2019-12-01T00:00:08Z`.
    pub fn parse(units: &str) -> DecodeResult<Self> {
        let invalid = || DecodeError::InvalidFormat(format!("unsupported time units '{}'", units));

        let (unit, epoch) = units.split_once(" since ").ok_or_else(invalid)?;
        let millis_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
            "milliseconds" | "millisecond" | "ms" => 1,
            "seconds" | "second" | "secs" | "sec" | "s" => 1_000,
            "minutes" | "minute" | "mins" | "min" => 60_000,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3_600_000,
            "days" | "day" | "d" => 86_400_000,
            _ => return Err(invalid()),
        };
        let epoch = parse_epoch(epoch).ok_or_else(invalid)?;

        Ok(Self {
            millis_per_unit,
            epoch,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Convert an offset in these units to an absolute time.
    pub fn to_datetime(&self, value: f64) -> DecodeResult<DateTime<Utc>> {
        if !value.is_finite() {
            return Err(DecodeError::InvalidFormat(format!(
                "non-finite time value {}",
                value
            )));
        }
        let out_of_range = || DecodeError::InvalidFormat(format!("time value {} out of range", value));

        let millis = (value * self.millis_per_unit as f64).round();
        // `as i64` saturates; anything this large is unrepresentable anyway.
        if millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        Duration::try_milliseconds(millis as i64)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .ok_or_else(out_of_range)
    }
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s
        .strip_suffix("UTC")
        .or_else(|| s.strip_suffix('Z'))
        .unwrap_or(s)
        .trim()
        .replacen('T', " ", 1);

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cfradial_seconds() {
        let units = TimeUnits::parse("seconds since 2019-12-01T00:00:08Z").unwrap();
        let t = units.to_datetime(52.4).unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2019, 12, 1, 0, 1, 0).unwrap() + Duration::milliseconds(400));
    }

    #[test]
    fn test_epoch_variants() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 5, 0, 0, 0).unwrap();
        for units in [
            "days since 2020-01-05",
            "hours since 2020-01-05 00:00:00",
            "minutes since 2020-01-05 00:00 UTC",
            "seconds since 2020-01-05T00:00:00.000Z",
        ] {
            assert_eq!(TimeUnits::parse(units).unwrap().epoch(), expected, "{units}");
        }
    }

    #[test]
    fn test_unit_scaling() {
        let units = TimeUnits::parse("hours since 2020-01-05").unwrap();
        assert_eq!(
            units.to_datetime(1.5).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 5, 1, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_unknown_units() {
        assert!(TimeUnits::parse("fortnights since 2020-01-05").is_err());
        assert!(TimeUnits::parse("seconds after 2020-01-05").is_err());
        assert!(TimeUnits::parse("seconds since yesterday").is_err());
    }

    #[test]
    fn test_rejects_nan_offset() {
        let units = TimeUnits::parse("seconds since 2020-01-05").unwrap();
        assert!(units.to_datetime(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_huge_offsets() {
        let units = TimeUnits::parse("seconds since 2019-12-01T00:00:00Z").unwrap();
        for value in [-1e300, 1e300, 9.3e15, -9.3e15, f64::MAX] {
            let err = units.to_datetime(value).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidFormat(_)), "{value}");
        }
        // Representable as milliseconds but past chrono's date range.
        assert!(units.to_datetime(1e13).is_err());
    }
}
