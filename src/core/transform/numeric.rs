//! Numeric formatting and the wound area helper

use crate::domain::field::FieldValue;

/// Rounds to `decimals` places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // avoid rendering "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Numeric reading of an optional value; absent or non-numeric is 0
pub fn numeric_or_zero(value: Option<&FieldValue>) -> f64 {
    value.and_then(FieldValue::as_number).unwrap_or(0.0)
}

/// Fixed-point rendering, e.g. `16.12`
pub fn format_number(value: f64, decimals: u32) -> String {
    format!("{:.*}", decimals as usize, round_to(value, decimals))
}

/// Dollar amount with thousands separators, e.g. `$1,234.50`
pub fn format_currency(value: f64, decimals: u32) -> String {
    let rounded = round_to(value, decimals);
    let fixed = format!("{:.*}", decimals as usize, rounded.abs());
    let (whole, fraction) = match fixed.split_once('.') {
        Some((whole, fraction)) => (whole.to_string(), Some(fraction.to_string())),
        None => (fixed.clone(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{sign}${grouped}.{fraction}"),
        None => format!("{sign}${grouped}"),
    }
}

/// Percentage with a trailing sign, e.g. `12.50%`
pub fn format_percentage(value: f64, decimals: u32) -> String {
    format!("{}%", format_number(value, decimals))
}

/// Wound area: length × width, non-numeric parts count as 0, 2 dp
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::transform::numeric::wound_area;
/// use ivr_mapper::domain::FieldValue;
///
/// let length = FieldValue::from(5.2);
/// let width = FieldValue::from("3.1");
/// assert_eq!(wound_area(Some(&length), Some(&width)), 16.12);
/// assert_eq!(wound_area(Some(&length), None), 0.0);
/// ```
pub fn wound_area(length: Option<&FieldValue>, width: Option<&FieldValue>) -> f64 {
    round_to(numeric_or_zero(length) * numeric_or_zero(width), 2)
}
