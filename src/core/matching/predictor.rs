//! Source-field prediction for targets without a declared expression

use super::fuzzy::{normalize_name, shares_type_suffix, similarity};
use crate::config::{ManufacturerCatalog, MatchingConfig};
use crate::domain::field::FieldKey;
use crate::domain::mapping::{rank_candidates, Candidate, ResolutionMethod};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Base confidence of a semantic alias match
pub const SEMANTIC_CONFIDENCE: f64 = 0.95;

/// Base confidence of a type-suffix pattern match
pub const PATTERN_CONFIDENCE: f64 = 0.85;

/// Upper bound for anything but an exact name match
pub const MAX_INEXACT_CONFIDENCE: f64 = 0.99;

/// Ranked guess for one target field
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub best: Option<Candidate>,
    /// How `best` was found
    pub method: ResolutionMethod,
    /// Runner-up candidates, best first
    pub alternatives: Vec<Candidate>,
}

impl Prediction {
    /// Prediction with no candidate
    pub fn none(method: ResolutionMethod) -> Self {
        Self {
            best: None,
            method,
            alternatives: Vec::new(),
        }
    }

    /// Splits a ranked list into the best candidate and at most `max_alternatives` others
    pub fn from_ranked(
        mut ranked: Vec<Candidate>,
        method: ResolutionMethod,
        max_alternatives: usize,
    ) -> Self {
        rank_candidates(&mut ranked);
        let mut ranked = ranked.into_iter();
        let best = ranked.next();
        Self {
            best,
            method,
            alternatives: ranked.take(max_alternatives).collect(),
        }
    }
}

/// Field prediction capability
///
/// Implementations rank the available source keys for a target field name.
/// They must be deterministic for the same input and never return a key
/// that is not in `sources`.
#[async_trait]
pub trait FieldPredictor: Send + Sync {
    /// Ranks `sources` as candidates for `target`
    ///
    /// # Errors
    ///
    /// Returns an error when the prediction backend fails; callers fall back
    /// to treating the target as unmatched.
    async fn predict(&self, sources: &[FieldKey], target: &FieldKey) -> Result<Prediction>;

    /// Short name used in logs and the mapping log
    fn name(&self) -> &'static str;
}

/// Normalized alias groups from the catalog
///
/// Every name in a group, including the group's canonical key, is treated
/// as a synonym of every other.
#[derive(Debug, Clone, Default)]
pub struct SemanticAliases {
    groups: Vec<BTreeSet<String>>,
}

impl SemanticAliases {
    pub fn new(alias_groups: &BTreeMap<String, Vec<String>>) -> Self {
        let groups = alias_groups
            .iter()
            .map(|(canonical, variations)| {
                std::iter::once(canonical)
                    .chain(variations.iter())
                    .map(|name| normalize_name(name))
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .collect();
        Self { groups }
    }

    /// Whether two normalized names are listed in the same group
    pub fn are_synonyms(&self, a: &str, b: &str) -> bool {
        self.groups
            .iter()
            .any(|group| group.contains(a) && group.contains(b))
    }
}

/// Deterministic name-based predictor
///
/// Strategies per source key, the highest score wins:
/// exact normalized equality (1.0), semantic alias (0.95 × boost),
/// shared type suffix (0.85 × boost) and blended string similarity
/// (× boost). Everything but exact equality is capped at 0.99.
#[derive(Debug, Clone)]
pub struct HeuristicPredictor {
    aliases: SemanticAliases,
    config: MatchingConfig,
}

impl HeuristicPredictor {
    pub fn new(aliases: SemanticAliases, config: MatchingConfig) -> Self {
        Self { aliases, config }
    }

    /// Predictor using the catalog's alias table
    pub fn from_catalog(catalog: &ManufacturerCatalog, config: MatchingConfig) -> Self {
        Self::new(SemanticAliases::new(catalog.alias_groups()), config)
    }

    /// Score of one source name against the normalized target
    fn score(&self, target: &str, source: &str) -> f64 {
        if target == source {
            return 1.0;
        }
        let boosts = &self.config.boosts;
        let mut best = similarity(target, source, &self.config.weights) * boosts.fuzzy;
        if self.aliases.are_synonyms(target, source) {
            best = best.max(SEMANTIC_CONFIDENCE * boosts.semantic);
        }
        if shares_type_suffix(target, source) {
            best = best.max(PATTERN_CONFIDENCE * boosts.pattern);
        }
        best.clamp(0.0, MAX_INEXACT_CONFIDENCE)
    }

    /// Synchronous core of [`FieldPredictor::predict`]
    pub fn rank(&self, sources: &[FieldKey], target: &FieldKey) -> Prediction {
        let target_name = normalize_name(target.as_str());
        if target_name.is_empty() {
            return Prediction::none(ResolutionMethod::Fuzzy);
        }

        let candidates: Vec<Candidate> = sources
            .iter()
            .filter_map(|source| {
                let score = self.score(&target_name, &normalize_name(source.as_str()));
                (score > 0.0).then(|| Candidate::new(source.clone(), score))
            })
            .collect();

        let mut prediction =
            Prediction::from_ranked(candidates, ResolutionMethod::Fuzzy, self.config.max_alternatives);
        if prediction
            .best
            .as_ref()
            .is_some_and(|best| best.confidence >= 1.0)
        {
            prediction.method = ResolutionMethod::Exact;
        }
        prediction
    }
}

#[async_trait]
impl FieldPredictor for HeuristicPredictor {
    async fn predict(&self, sources: &[FieldKey], target: &FieldKey) -> Result<Prediction> {
        Ok(self.rank(sources, target))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
