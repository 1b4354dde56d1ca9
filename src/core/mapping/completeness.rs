//! Completeness scoring

use crate::core::transform::numeric::round_to;
use crate::domain::mapping::{Completeness, FieldMapping};

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 2).clamp(0.0, 100.0)
}

/// Scores formatted mappings
///
/// A target is filled when its formatted value is non-blank. With no
/// required targets the required percentage is 100.
pub fn compute(mappings: &[FieldMapping]) -> Completeness {
    let total = mappings.len();
    let filled = mappings.iter().filter(|m| m.is_filled()).count();
    let required_total = mappings.iter().filter(|m| m.required).count();
    let required_filled = mappings
        .iter()
        .filter(|m| m.required && m.is_filled())
        .count();

    Completeness {
        filled,
        total,
        percentage: percentage(filled, total),
        required_filled,
        required_total,
        required_percentage: if required_total == 0 {
            100.0
        } else {
            percentage(required_filled, required_total)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field::FieldKey;

    fn mapping(name: &str, value: &str, required: bool) -> FieldMapping {
        let mut mapping = FieldMapping::unresolved(FieldKey::new(name).unwrap(), required);
        mapping.value = value.to_string();
        mapping
    }

    #[test]
    fn test_compute_counts_filled_and_required() {
        let mappings = vec![
            mapping("patient_name", "Jane Doe", true),
            mapping("patient_dob", "", true),
            mapping("wound_size", "0", false),
        ];
        let completeness = compute(&mappings);
        assert_eq!(completeness.filled, 2);
        assert_eq!(completeness.total, 3);
        assert_eq!(completeness.percentage, 66.67);
        assert_eq!(completeness.required_filled, 1);
        assert_eq!(completeness.required_total, 2);
        assert_eq!(completeness.required_percentage, 50.0);
    }

    #[test]
    fn test_compute_empty_profile() {
        let completeness = compute(&[]);
        assert_eq!(completeness.percentage, 0.0);
        assert_eq!(completeness.required_percentage, 100.0);
    }

    #[test]
    fn test_whitespace_is_not_filled() {
        let completeness = compute(&[mapping("notes", "   ", false)]);
        assert_eq!(completeness.filled, 0);
        assert_eq!(completeness.required_percentage, 100.0);
    }
}
