//! String shaping

pub fn upper(text: &str) -> String {
    text.trim().to_uppercase()
}

pub fn lower(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Capitalizes each word; underscores count as spaces
pub fn title(text: &str) -> String {
    text.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Prepends `prefix` unless the value already starts with it
pub fn prefix(text: &str, prefix: &str) -> String {
    let text = text.trim();
    let marker = prefix.trim();
    if marker.is_empty() || text.to_lowercase().starts_with(&marker.to_lowercase()) {
        text.to_string()
    } else {
        format!("{prefix}{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("diabetic_foot_ulcer", "Diabetic Foot Ulcer" ; "underscores")]
    #[test_case("FEMALE", "Female" ; "upper input")]
    #[test_case("  left   heel ", "Left Heel" ; "spacing")]
    fn test_title(input: &str, expected: &str) {
        assert_eq!(title(input), expected);
    }

    #[test]
    fn test_prefix_not_duplicated() {
        assert_eq!(prefix("11", "POS "), "POS 11");
        assert_eq!(prefix("POS 11", "POS "), "POS 11");
        assert_eq!(prefix("pos 11", "POS "), "pos 11");
    }

    #[test]
    fn test_case_shaping() {
        assert_eq!(upper(" tx "), "TX");
        assert_eq!(lower("Jane.Doe@Example.COM"), "jane.doe@example.com");
    }
}
