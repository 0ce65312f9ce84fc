//! Relative time labels ("3w", "published • 6mo") to absolute timestamps.
//!
//! Months and years are fixed 30- and 365-day spans. Stored posts already
//! carry dates computed that way, so the approximation stays.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeLabelError {
    #[error("unparseable time label {0:?}: no quantity")]
    NoQuantity(String),

    #[error("unparseable time label {label:?}: unknown unit {unit:?}")]
    UnknownUnit { label: String, unit: String },

    #[error("unparseable time label {0:?}: offset out of range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(TimeUnit::Minute),
            "h" => Some(TimeUnit::Hour),
            "d" => Some(TimeUnit::Day),
            "w" => Some(TimeUnit::Week),
            "mo" => Some(TimeUnit::Month),
            "yr" => Some(TimeUnit::Year),
            _ => None,
        }
    }
}

/// A parsed `(quantity, unit)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime {
    pub quantity: i64,
    pub unit: TimeUnit,
}

impl RelativeTime {
    /// Parse the first token of `label` that contains digits.
    pub fn parse(label: &str) -> Result<Self, TimeLabelError> {
        let lowered = label.to_lowercase();
        let token = lowered
            .split_whitespace()
            .find(|t| t.chars().any(|c| c.is_ascii_digit()))
            .ok_or_else(|| TimeLabelError::NoQuantity(label.to_string()))?;

        let rest = token.trim_start_matches(|c: char| !c.is_ascii_digit());
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(digits_end);
        let unit_code: String = tail.chars().take_while(|c| c.is_alphabetic()).collect();

        let quantity = digits
            .parse::<i64>()
            .map_err(|_| TimeLabelError::OutOfRange(label.to_string()))?;
        let unit = TimeUnit::from_code(&unit_code).ok_or_else(|| TimeLabelError::UnknownUnit {
            label: label.to_string(),
            unit: unit_code.clone(),
        })?;

        Ok(Self { quantity, unit })
    }

    pub fn offset(&self) -> Option<Duration> {
        let q = self.quantity;
        match self.unit {
            TimeUnit::Minute => Duration::try_minutes(q),
            TimeUnit::Hour => Duration::try_hours(q),
            TimeUnit::Day => Duration::try_days(q),
            TimeUnit::Week => Duration::try_weeks(q),
            TimeUnit::Month => q.checked_mul(30).and_then(Duration::try_days),
            TimeUnit::Year => q.checked_mul(365).and_then(Duration::try_days),
        }
    }
}

/// Resolve `label` against a fixed `now`.
pub fn parse_relative_at(label: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, TimeLabelError> {
    let relative = RelativeTime::parse(label)?;
    relative
        .offset()
        .and_then(|offset| now.checked_sub_signed(offset))
        .ok_or_else(|| TimeLabelError::OutOfRange(label.to_string()))
}

pub fn parse_relative(label: &str) -> Result<DateTime<Utc>, TimeLabelError> {
    parse_relative_at(label, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn every_unit_subtracts_its_offset() {
        let cases = [
            ("5m", Duration::minutes(5)),
            ("2h", Duration::hours(2)),
            ("4d", Duration::days(4)),
            ("3w", Duration::weeks(3)),
            ("6mo", Duration::days(180)),
            ("2yr", Duration::days(730)),
        ];
        for (label, offset) in cases {
            assert_eq!(parse_relative_at(label, now()).unwrap(), now() - offset, "{label}");
        }
    }

    #[test]
    fn month_is_not_minute() {
        let parsed = RelativeTime::parse("1mo").unwrap();
        assert_eq!(parsed.unit, TimeUnit::Month);
        let parsed = RelativeTime::parse("1m").unwrap();
        assert_eq!(parsed.unit, TimeUnit::Minute);
    }

    #[test]
    fn multi_token_labels() {
        assert_eq!(
            parse_relative_at("Published • 6mo", now()).unwrap(),
            now() - Duration::days(180)
        );
        assert_eq!(
            parse_relative_at("3w • Edited", now()).unwrap(),
            now() - Duration::weeks(3)
        );
    }

    #[test]
    fn trailing_punctuation_is_not_part_of_unit() {
        assert_eq!(
            parse_relative_at("1d•", now()).unwrap(),
            now() - Duration::days(1)
        );
    }

    #[test]
    fn uppercase_is_accepted() {
        assert_eq!(parse_relative_at("3W", now()).unwrap(), now() - Duration::weeks(3));
    }

    #[test]
    fn result_is_strictly_before_now() {
        let parsed = parse_relative("1m").unwrap();
        assert!(parsed < Utc::now());
    }

    #[test]
    fn unknown_unit_is_an_error() {
        match parse_relative_at("3s", now()) {
            Err(TimeLabelError::UnknownUnit { unit, .. }) => assert_eq!(unit, "s"),
            other => panic!("expected UnknownUnit, got {other:?}"),
        }
        assert!(matches!(
            parse_relative_at("12", now()),
            Err(TimeLabelError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn no_digits_is_an_error() {
        assert_eq!(
            parse_relative_at("Edited", now()),
            Err(TimeLabelError::NoQuantity("Edited".to_string()))
        );
        assert!(parse_relative_at("", now()).is_err());
    }

    #[test]
    fn huge_quantity_is_out_of_range() {
        assert!(matches!(
            parse_relative_at("99999999999999999999yr", now()),
            Err(TimeLabelError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_relative_at("999999999999yr", now()),
            Err(TimeLabelError::OutOfRange(_))
        ));
    }
}
