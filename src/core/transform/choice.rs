//! Boolean and checkbox values

use crate::domain::field::FieldValue;
use crate::domain::profile::{BooleanStyle, CheckboxSpec};

const TRUTHY: &[&str] = &["true", "yes", "y", "1", "on", "checked", "x"];

/// Whether a value reads as "yes"
pub fn is_truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Boolean(b) => *b,
        FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
        FieldValue::Text(text) => TRUTHY.contains(&text.trim().to_lowercase().as_str()),
        FieldValue::List(items) => items.iter().any(is_truthy),
        FieldValue::Date(_) => false,
    }
}

/// Renders a boolean in the form's widget convention
pub fn format_boolean(value: &FieldValue, style: BooleanStyle) -> String {
    if is_truthy(value) {
        style.on_value().to_string()
    } else {
        style.off_value().to_string()
    }
}

/// Ticks the box when any keyword appears in the value
///
/// Text and list items are compared case-insensitively on whole words, so
/// the keyword `dfu` matches `"DFU"` and `"Diabetic Foot Ulcer (DFU)"` but
/// not `"DFUX"`. Boolean and numeric values fall back to truthiness.
pub fn format_checkbox(value: &FieldValue, spec: &CheckboxSpec, style: BooleanStyle) -> String {
    let ticked = match value {
        FieldValue::Boolean(_) | FieldValue::Number(_) => is_truthy(value),
        _ => {
            let items: Vec<String> = value.as_list().iter().map(|i| normalize(i)).collect();
            spec.keywords.iter().any(|keyword| {
                let keyword = normalize(keyword);
                !keyword.is_empty()
                    && items.iter().any(|item| {
                        item == &keyword || format!(" {item} ").contains(&format!(" {keyword} "))
                    })
            })
        }
    };

    if ticked {
        spec.on_value.clone()
    } else {
        style.off_value().to_string()
    }
}

/// Lowercase words separated by single spaces
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
