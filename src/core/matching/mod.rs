//! Field matching
//!
//! The [`FieldMatcher`] resolves every target field of a manufacturer profile
//! against a [`SourceFieldBag`]. Declared source expressions are evaluated
//! directly with confidence 1.0; targets without an expression are handed to
//! a [`FieldPredictor`] and accepted above the configured threshold.
//!
//! Resolution order per target, first success wins:
//!
//! 1. `Direct(key)` - the key's value when present and non-empty
//! 2. `Concat(keys)` - non-empty parts joined by a single space
//! 3. `Product(keys)` - numeric product rounded to 2 dp
//! 4. `Fallback(keys)` - first non-empty value, left to right
//! 5. no expression - predictor, when its confidence reaches the threshold
//!
//! A declared expression that resolves to nothing leaves the target
//! unmatched; only undeclared targets are predicted.

pub mod fuzzy;
pub mod predictor;

pub use predictor::{FieldPredictor, HeuristicPredictor, Prediction, SemanticAliases};

use crate::config::MatchingConfig;
use crate::core::transform::numeric::round_to;
use crate::domain::field::{FieldKey, FieldValue, SourceFieldBag};
use crate::domain::mapping::{Candidate, FieldMapping, ResolutionMethod};
use crate::domain::profile::{ManufacturerProfile, SourceExpression, TargetField};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Raw resolutions of one profile against one bag
///
/// `mappings` carry raw values only; formatting happens afterwards.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// One entry per target field, in profile order
    pub mappings: Vec<FieldMapping>,
    pub unmatched_targets: Vec<FieldKey>,
    /// Filled source keys no mapping consumed
    pub unmatched_sources: Vec<FieldKey>,
}

/// Value produced by a source expression
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: FieldValue,
    pub sources: Vec<FieldKey>,
    pub method: ResolutionMethod,
}

/// Evaluates a declared source expression
///
/// Returns `None` when nothing usable was found. A product with at least
/// one present operand counts missing or non-numeric operands as 0.
///
/// # Examples
///
/// ```
/// use ivr_mapper::core::matching::evaluate_expression;
/// use ivr_mapper::domain::{SourceExpression, SourceFieldBag, FieldValue};
///
/// let mut bag = SourceFieldBag::new();
/// bag.set("wound_size_length", 5.2);
/// bag.set("wound_size_width", 3.1);
///
/// let area = SourceExpression::parse("wound_size_length * wound_size_width").unwrap();
/// let resolved = evaluate_expression(&area, &bag).unwrap();
/// assert_eq!(resolved.value, FieldValue::Number(16.12));
/// ```
pub fn evaluate_expression(
    expression: &SourceExpression,
    bag: &SourceFieldBag,
) -> Option<Resolution> {
    match expression {
        SourceExpression::Direct(key) => bag.get_filled(key.as_str()).map(|value| Resolution {
            value: value.clone(),
            sources: vec![key.clone()],
            method: ResolutionMethod::Exact,
        }),
        SourceExpression::Concat(keys) => {
            let mut parts = Vec::new();
            let mut sources = Vec::new();
            for key in keys {
                if let Some(value) = bag.get_filled(key.as_str()) {
                    let text = value.as_text();
                    if !text.is_empty() {
                        parts.push(text);
                        sources.push(key.clone());
                    }
                }
            }
            (!parts.is_empty()).then(|| Resolution {
                value: FieldValue::Text(parts.join(" ")),
                sources,
                method: ResolutionMethod::Concat,
            })
        }
        SourceExpression::Product(keys) => {
            let sources: Vec<FieldKey> = keys
                .iter()
                .filter(|key| bag.get_filled(key.as_str()).is_some())
                .cloned()
                .collect();
            if sources.is_empty() {
                return None;
            }
            let product = keys
                .iter()
                .map(|key| {
                    bag.get_filled(key.as_str())
                        .and_then(FieldValue::as_number)
                        .unwrap_or(0.0)
                })
                .product::<f64>();
            Some(Resolution {
                value: FieldValue::Number(round_to(product, 2)),
                sources,
                method: ResolutionMethod::Computed,
            })
        }
        SourceExpression::Fallback(keys) => keys.iter().find_map(|key| {
            bag.get_filled(key.as_str()).map(|value| Resolution {
                value: value.clone(),
                sources: vec![key.clone()],
                method: ResolutionMethod::Fallback,
            })
        }),
    }
}

/// Resolves profile targets against source bags
#[derive(Clone)]
pub struct FieldMatcher {
    predictor: Arc<dyn FieldPredictor>,
    confidence_threshold: f64,
    max_alternatives: usize,
}

impl FieldMatcher {
    pub fn new(predictor: Arc<dyn FieldPredictor>, config: &MatchingConfig) -> Self {
        Self {
            predictor,
            confidence_threshold: config.confidence_threshold,
            max_alternatives: config.max_alternatives,
        }
    }

    /// Name of the configured predictor
    pub fn predictor_name(&self) -> &'static str {
        self.predictor.name()
    }

    /// Resolves every target field of `profile`
    pub async fn match_fields(
        &self,
        bag: &SourceFieldBag,
        profile: &ManufacturerProfile,
    ) -> MatchOutcome {
        let available: Vec<FieldKey> = bag
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, _)| key.clone())
            .collect();

        let mut mappings = Vec::with_capacity(profile.fields.len());
        for field in &profile.fields {
            let mapping = match &field.expression {
                Some(expression) => Self::declared(field, expression, bag),
                None => self.predicted(field, bag, &available).await,
            };
            mappings.push(mapping);
        }

        let unmatched_targets = mappings
            .iter()
            .filter(|m| m.raw_value.is_none())
            .map(|m| m.target.clone())
            .collect();

        let consumed: BTreeSet<&FieldKey> = mappings.iter().flat_map(|m| m.sources.iter()).collect();
        let unmatched_sources = available
            .iter()
            .filter(|key| !consumed.contains(key))
            .cloned()
            .collect();

        MatchOutcome {
            mappings,
            unmatched_targets,
            unmatched_sources,
        }
    }

    fn declared(
        field: &TargetField,
        expression: &SourceExpression,
        bag: &SourceFieldBag,
    ) -> FieldMapping {
        match evaluate_expression(expression, bag) {
            Some(resolution) => FieldMapping {
                target: field.name.clone(),
                sources: resolution.sources,
                raw_value: Some(resolution.value),
                value: String::new(),
                confidence: 1.0,
                method: Some(resolution.method),
                alternatives: Vec::new(),
                required: field.required,
            },
            None => FieldMapping::unresolved(field.name.clone(), field.required),
        }
    }

    async fn predicted(
        &self,
        field: &TargetField,
        bag: &SourceFieldBag,
        available: &[FieldKey],
    ) -> FieldMapping {
        let mut mapping = FieldMapping::unresolved(field.name.clone(), field.required);
        if available.is_empty() {
            return mapping;
        }

        let prediction = match self.predictor.predict(available, &field.name).await {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(
                    target_field = %field.name,
                    predictor = self.predictor.name(),
                    error = %e,
                    "Field prediction failed"
                );
                return mapping;
            }
        };

        let Prediction {
            best,
            method,
            alternatives,
        } = prediction;

        match best {
            Some(best) if best.confidence >= self.confidence_threshold => {
                match bag.get_filled(best.field.as_str()) {
                    Some(value) => {
                        mapping.raw_value = Some(value.clone());
                        mapping.sources = vec![best.field.clone()];
                        mapping.confidence = best.confidence;
                        mapping.method = Some(method);
                        mapping.alternatives = truncate(alternatives, self.max_alternatives);
                    }
                    None => {
                        mapping.alternatives =
                            truncate(prepend(best, alternatives), self.max_alternatives);
                    }
                }
            }
            Some(best) => {
                tracing::debug!(
                    target_field = %field.name,
                    confidence = best.confidence,
                    threshold = self.confidence_threshold,
                    "Best candidate below confidence threshold"
                );
                mapping.alternatives = truncate(prepend(best, alternatives), self.max_alternatives);
            }
            None => {}
        }
        mapping
    }
}

fn prepend(first: Candidate, rest: Vec<Candidate>) -> Vec<Candidate> {
    std::iter::once(first).chain(rest).collect()
}

fn truncate(mut candidates: Vec<Candidate>, max: usize) -> Vec<Candidate> {
    candidates.truncate(max);
    candidates
}
