//! Technology stack recommendation
//!
//! Scans the document for every known signature, keeps the most confident
//! hit per category, fills required categories with generic fallbacks, and
//! surfaces incompatible category pairs as decision points.

pub mod catalog;
pub mod conflict;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::Feature;
use super::text;

pub use catalog::TechCategory;
pub use conflict::{
    ConflictKind, ConflictResolver, Decision, DecisionPoint, NonInteractive, Preset, Resolution,
};

/// Recommendations below this confidence produce a warning
pub const LOW_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyRecommendation {
    pub category: TechCategory,
    pub technology: String,
    pub version: String,
    /// Heuristic certainty in [0, 1]
    pub confidence: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackRecommendation {
    /// Ordered by confidence, highest first
    pub technologies: Vec<TechnologyRecommendation>,
    pub mean_confidence: f64,
    pub warnings: Vec<String>,
    pub clarifications: Vec<String>,
    pub decisions: Vec<Decision>,
}

impl StackRecommendation {
    pub fn has_category(&self, category: TechCategory) -> bool {
        self.technologies.iter().any(|t| t.category == category)
    }

    /// Decision points nobody settled
    pub fn unresolved(&self) -> impl Iterator<Item = &DecisionPoint> {
        self.decisions
            .iter()
            .filter(|d| d.resolution.is_none())
            .map(|d| &d.point)
    }
}

/// Signature matches, at most one per category
pub fn detect_technologies(document: &str) -> Vec<TechnologyRecommendation> {
    let lower = document.to_lowercase();
    let mut best: BTreeMap<TechCategory, &catalog::Signature> = BTreeMap::new();

    for sig in catalog::SIGNATURES {
        if !text::mentions_lower(&lower, sig.phrase) {
            continue;
        }
        debug!(phrase = sig.phrase, technology = sig.technology, "Technology signature matched");
        match best.get(&sig.category) {
            Some(existing) if existing.confidence >= sig.confidence => {}
            _ => {
                best.insert(sig.category, sig);
            }
        }
    }

    let mut technologies: Vec<TechnologyRecommendation> = best
        .into_values()
        .map(|sig| TechnologyRecommendation {
            category: sig.category,
            technology: sig.technology.to_string(),
            version: sig.version.to_string(),
            confidence: sig.confidence,
            rationale: sig.rationale.to_string(),
        })
        .collect();

    for fallback in catalog::FALLBACKS {
        let covered = technologies
            .iter()
            .any(|t| fallback.covered_by.contains(&t.category));
        if !covered && text::mentions_any(&lower, fallback.triggers) {
            technologies.push(TechnologyRecommendation {
                category: fallback.category,
                technology: fallback.technology.to_string(),
                version: fallback.version.to_string(),
                confidence: fallback.confidence,
                rationale: fallback.rationale.to_string(),
            });
        }
    }

    technologies
}

/// Recommend a stack, letting `resolver` settle detected conflicts
pub fn recommend(
    document: &str,
    features: &[Feature],
    resolver: &dyn ConflictResolver,
) -> StackRecommendation {
    let mut technologies = detect_technologies(document);

    let mut decisions = Vec::new();
    for point in conflict::detect(&technologies) {
        let resolution = resolver.resolve(&point);
        if let Some(resolution) = resolution {
            debug!(resolution = resolution.as_str(), "Stack conflict resolved");
            resolution.apply(&mut technologies);
        }
        decisions.push(Decision { point, resolution });
    }

    technologies.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.category.cmp(&b.category))
    });

    let mean_confidence = if technologies.is_empty() {
        0.0
    } else {
        technologies.iter().map(|t| t.confidence).sum::<f64>() / technologies.len() as f64
    };

    let mut warnings: Vec<String> = technologies
        .iter()
        .filter(|t| t.confidence < LOW_CONFIDENCE)
        .map(|t| {
            format!(
                "Low confidence ({:.2}) in {} for {}; confirm before committing",
                t.confidence, t.technology, t.category
            )
        })
        .collect();
    for decision in decisions.iter().filter(|d| d.resolution.is_none()) {
        warnings.push(format!(
            "Unresolved stack conflict: {} are all recommended. {}",
            decision.point.technologies.join(", "),
            decision.point.question
        ));
    }

    let mut clarifications = clarifications(document, features, &technologies);
    for decision in decisions.iter().filter(|d| d.resolution.is_none()) {
        if !clarifications.contains(&decision.point.question) {
            clarifications.push(decision.point.question.clone());
        }
    }

    StackRecommendation {
        technologies,
        mean_confidence,
        warnings,
        clarifications,
        decisions,
    }
}

fn clarifications(
    document: &str,
    features: &[Feature],
    technologies: &[TechnologyRecommendation],
) -> Vec<String> {
    let in_categories = |categories: &[TechCategory]| -> Vec<&TechnologyRecommendation> {
        technologies
            .iter()
            .filter(|t| categories.contains(&t.category))
            .collect()
    };
    let unclear = |found: &[&TechnologyRecommendation]| {
        found.is_empty() || found.iter().any(|t| t.confidence < LOW_CONFIDENCE)
    };

    let mut questions = Vec::new();

    let frontend = in_categories(&[TechCategory::FrontendFramework, TechCategory::FullstackFramework]);
    if unclear(&frontend) {
        questions.push("Frontend framework preference: React, Vue.js, or Angular?".to_string());
    }

    let backend = in_categories(&[
        TechCategory::Backend,
        TechCategory::BackendFramework,
        TechCategory::FullstackFramework,
    ]);
    if unclear(&backend) {
        questions.push("Backend technology preference: Node.js, Python, Java, or other?".to_string());
    }

    if in_categories(&[TechCategory::Database]).is_empty() {
        questions.push("Database preference: PostgreSQL, MongoDB, or other?".to_string());
    }

    let feature_mentions = |term: &str| {
        features
            .iter()
            .any(|f| text::mentions(&f.name, term))
    };
    if feature_mentions("auth") {
        questions.push("Authentication method: JWT, OAuth2, or custom?".to_string());
    }
    if feature_mentions("payment") {
        questions.push("Payment providers: Stripe, PayPal, or other?".to_string());
    }

    let lower = document.to_lowercase();
    if !text::mentions_any(&lower, &["deploy", "host"]) {
        questions.push("Deployment preference: AWS, GCP, Azure, or other?".to_string());
    }

    questions
}
