//! Field-name similarity scoring

use crate::config::SimilarityWeights;
use std::collections::BTreeSet;

/// Lowercases and collapses every run of non-alphanumerics into `_`
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::matching::fuzzy::normalize_name;
///
/// assert_eq!(normalize_name("Patient DOB"), "patient_dob");
/// assert_eq!(normalize_name("__Physician-NPI__"), "physician_npi");
/// ```
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !normalized.is_empty() {
                normalized.push('_');
            }
            pending_separator = false;
            normalized.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    normalized
}

/// Tokens of a normalized name
pub fn tokens(normalized: &str) -> BTreeSet<&str> {
    normalized.split('_').filter(|t| !t.is_empty()).collect()
}

/// Jaccard index of the two token sets
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let left = tokens(a);
    let right = tokens(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

/// Blended similarity of two normalized names, 0.0 to 1.0
pub fn similarity(a: &str, b: &str, weights: &SimilarityWeights) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let score = weights.levenshtein * strsim::normalized_levenshtein(a, b)
        + weights.jaro_winkler * strsim::jaro_winkler(a, b)
        + weights.token * token_similarity(a, b);
    score.clamp(0.0, 1.0)
}

/// Names ending in the same type token (`phone`, `npi`, `zip`) that share
/// at least one other token
pub fn shares_type_suffix(a: &str, b: &str) -> bool {
    let suffix_a = a.rsplit('_').next().unwrap_or_default();
    let suffix_b = b.rsplit('_').next().unwrap_or_default();
    if suffix_a.is_empty() || suffix_a != suffix_b || a == suffix_a || b == suffix_b {
        return false;
    }
    let left: BTreeSet<&str> = tokens(a).into_iter().filter(|t| *t != suffix_a).collect();
    let right: BTreeSet<&str> = tokens(b).into_iter().filter(|t| *t != suffix_b).collect();
    left.intersection(&right).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Patient  First Name"), "patient_first_name");
        assert_eq!(normalize_name("provider.npi"), "provider_npi");
        assert_eq!(normalize_name("***"), "");
    }

    #[test]
    fn test_token_similarity() {
        assert_eq!(token_similarity("patient_phone", "patient_phone"), 1.0);
        assert!((token_similarity("patient_home_phone", "patient_phone") - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(token_similarity("", "patient"), 0.0);
    }

    #[test]
    fn test_similarity_bounds() {
        let weights = SimilarityWeights::default();
        assert!((similarity("patient_dob", "patient_dob", &weights) - 1.0).abs() < 1e-9);
        let close = similarity("patient_dob", "patient_dobb", &weights);
        let far = similarity("patient_dob", "facility_fax", &weights);
        assert!(close > far);
        assert!((0.0..=1.0).contains(&far));
    }

    #[test]
    fn test_shares_type_suffix() {
        assert!(!shares_type_suffix("physician_npi", "provider_npi"));
        assert!(shares_type_suffix("patient_home_phone", "patient_phone"));
        assert!(!shares_type_suffix("patient_phone", "facility_fax"));
        assert!(!shares_type_suffix("npi", "provider_npi"));
    }
}
