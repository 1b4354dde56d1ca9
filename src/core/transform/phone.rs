//! Phone number formatting

/// Formats North American numbers
///
/// Ten digits become `(XXX) XXX-XXXX`, eleven digits with a leading `1`
/// become `+1 (XXX) XXX-XXXX`. Anything else is returned trimmed.
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::transform::phone::format_phone;
///
/// assert_eq!(format_phone("555.123.4567"), "(555) 123-4567");
/// assert_eq!(format_phone("15551234567"), "+1 (555) 123-4567");
/// assert_eq!(format_phone(" ext 12 "), "ext 12");
/// ```
pub fn format_phone(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    match digits.len() {
        10 => format!("({}) {}-{}", &digits[0..3], &digits[3..6], &digits[6..]),
        11 if digits.starts_with('1') => {
            format!("+1 ({}) {}-{}", &digits[1..4], &digits[4..7], &digits[7..])
        }
        _ => input.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("5551234567", "(555) 123-4567" ; "ten digits")]
    #[test_case("(555) 123-4567", "(555) 123-4567" ; "already formatted")]
    #[test_case("555-123-4567", "(555) 123-4567" ; "dashes")]
    #[test_case("15551234567", "+1 (555) 123-4567" ; "country code")]
    #[test_case("+1 555 123 4567", "+1 (555) 123-4567" ; "international notation")]
    #[test_case("25551234567", "25551234567" ; "eleven digits without country code")]
    #[test_case(" 12345 ", "12345" ; "short number")]
    #[test_case("", "" ; "empty")]
    fn test_format_phone(input: &str, expected: &str) {
        assert_eq!(format_phone(input), expected);
    }
}
