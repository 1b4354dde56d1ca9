//! Person name splitting

/// First whitespace-separated token
pub fn first_name(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Last token when the name has more than one, otherwise `""`
pub fn last_name(full_name: &str) -> String {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    if tokens.len() > 1 {
        tokens[tokens.len() - 1].to_string()
    } else {
        String::new()
    }
}
