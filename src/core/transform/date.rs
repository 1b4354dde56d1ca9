//! Date parsing and formatting

use crate::domain::field::FieldValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// Date-only layouts tried in order after ISO and RFC 3339
const DATE_LAYOUTS: &[&str] = &[
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses the date notations found in clinical records
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::transform::date::parse_date;
/// use chrono::NaiveDate;
///
/// let expected = NaiveDate::from_ymd_opt(1980, 12, 25);
/// assert_eq!(parse_date("1980-12-25"), expected);
/// assert_eq!(parse_date("12/25/1980"), expected);
/// assert_eq!(parse_date("December 25, 1980"), expected);
/// assert_eq!(parse_date("not a date"), None);
/// ```
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Some(datetime.date_naive());
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(input, layout) {
            return Some(datetime.date());
        }
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
}

/// Date carried by a field value, if any
pub fn date_of(value: &FieldValue) -> Option<NaiveDate> {
    match value {
        FieldValue::Date(date) => Some(*date),
        FieldValue::Text(text) => parse_date(text),
        FieldValue::Number(_) => parse_date(&value.as_text()),
        FieldValue::List(items) => items.iter().find_map(date_of),
        FieldValue::Boolean(_) => None,
    }
}

/// Formats a date, returning an empty string for an unusable format
pub fn format_date(date: NaiveDate, format: &str) -> String {
    let mut output = String::new();
    match write!(output, "{}", date.format(format)) {
        Ok(()) => output,
        Err(_) => String::new(),
    }
}

/// Reformats a value as a date; unparsable input yields `""`
pub fn transform_date(value: &FieldValue, format: &str) -> String {
    date_of(value)
        .map(|date| format_date(date, format))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1980-12-25" ; "iso date")]
    #[test_case("1980-12-25T08:30:00" ; "iso datetime")]
    #[test_case("1980-12-25T08:30:00.123" ; "iso datetime with fraction")]
    #[test_case("1980-12-25T08:30:00-05:00" ; "rfc3339")]
    #[test_case("1980-12-25 08:30:00" ; "sql timestamp")]
    #[test_case("12/25/1980" ; "us slashes")]
    #[test_case("12-25-1980" ; "us dashes")]
    #[test_case("1980/12/25" ; "year first slashes")]
    #[test_case("19801225" ; "compact")]
    #[test_case("December 25, 1980" ; "month name")]
    #[test_case("Dec 25, 1980" ; "abbreviated month")]
    fn test_parse_date_layouts(input: &str) {
        assert_eq!(parse_date(input), NaiveDate::from_ymd_opt(1980, 12, 25));
    }

    #[test_case("" ; "empty")]
    #[test_case("soon" ; "word")]
    #[test_case("13/45/2020" ; "impossible date")]
    fn test_parse_date_rejects(input: &str) {
        assert_eq!(parse_date(input), None);
    }

    #[test]
    fn test_transform_date_formats() {
        let value = FieldValue::from("1980-12-25");
        assert_eq!(transform_date(&value, "%m/%d/%Y"), "12/25/1980");
        assert_eq!(transform_date(&value, "%Y-%m-%d"), "1980-12-25");
        assert_eq!(transform_date(&FieldValue::from("n/a"), "%m/%d/%Y"), "");
    }

    #[test]
    fn test_format_date_invalid_format_is_empty() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(format_date(date, "%Q"), "");
    }

    #[test]
    fn test_date_of_numeric_compact_date() {
        assert_eq!(
            date_of(&FieldValue::from(19801225.0)),
            NaiveDate::from_ymd_opt(1980, 12, 25)
        );
    }
}
