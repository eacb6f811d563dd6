//! Feature extraction
//!
//! Features come from headings (level 3 and deeper) that use
//! feature-indicating vocabulary. When a document has none, bullet items
//! under a "features"/"requirements" anchor are used instead.

use serde::{Deserialize, Serialize};

use super::Priority;
use super::text;

/// Maximum number of features kept from one document
pub const MAX_FEATURES: usize = 10;

const FEATURE_TERMS: &[&str] = &[
    "feature",
    "functionality",
    "system",
    "management",
    "interface",
    "api",
    "service",
];
const ANCHOR_TERMS: &[&str] = &["feature", "functionality", "requirement"];
const EXCLUDED_SECTION_TERMS: &[&str] = &["non-functional", "nonfunctional", "technical", "acceptance"];

const HIGH_PRIORITY_TERMS: &[&str] = &["core", "main", "primary", "essential"];
const LOW_PRIORITY_TERMS: &[&str] = &["optional", "nice", "future", "enhancement"];
const COMPLEX_TERMS: &[&str] = &["auth", "payment", "real-time", "realtime", "multiplayer", "sync"];
const SIMPLE_TERMS: &[&str] = &["ui", "display", "list", "view"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureComplexity {
    Simple,
    Medium,
    Complex,
}

impl FeatureComplexity {
    /// Story points for this complexity
    pub fn effort_points(&self) -> u32 {
        match self {
            FeatureComplexity::Simple => 5,
            FeatureComplexity::Medium => 8,
            FeatureComplexity::Complex => 13,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureComplexity::Simple => "simple",
            FeatureComplexity::Medium => "medium",
            FeatureComplexity::Complex => "complex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "simple" => Some(FeatureComplexity::Simple),
            "medium" => Some(FeatureComplexity::Medium),
            "complex" => Some(FeatureComplexity::Complex),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub description: String,
    pub priority: Priority,
    pub complexity: FeatureComplexity,
    pub effort_points: u32,
    /// Never inferred; stays empty unless a caller supplies it
    pub dependencies: Vec<String>,
}

impl Feature {
    /// Classify a feature from its name
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        let priority = if text::mentions_any(&lower, HIGH_PRIORITY_TERMS) {
            Priority::High
        } else if text::mentions_any(&lower, LOW_PRIORITY_TERMS) {
            Priority::Low
        } else {
            Priority::Medium
        };
        let complexity = if text::mentions_any(&lower, COMPLEX_TERMS) {
            FeatureComplexity::Complex
        } else if text::mentions_any(&lower, SIMPLE_TERMS) {
            FeatureComplexity::Simple
        } else {
            FeatureComplexity::Medium
        };

        Self {
            name: name.to_string(),
            description: format!("Implementation of {}", lower),
            priority,
            complexity,
            effort_points: complexity.effort_points(),
            dependencies: Vec::new(),
        }
    }
}

/// Extract up to [`MAX_FEATURES`] features from a document
pub fn extract_features(document: &str) -> Vec<Feature> {
    let mut features: Vec<Feature> = document
        .lines()
        .filter_map(text::heading)
        .filter(|(level, title)| {
            *level >= 3 && text::mentions_any(&title.to_lowercase(), FEATURE_TERMS)
        })
        .map(|(_, title)| Feature::from_name(title))
        .collect();

    if features.is_empty() {
        features = features_from_lists(document);
    }

    features.truncate(MAX_FEATURES);
    features
}

fn features_from_lists(document: &str) -> Vec<Feature> {
    let mut features = Vec::new();
    let mut in_section = false;

    for line in document.lines() {
        if let Some(item) = text::list_item(line) {
            if in_section && item.chars().count() > 5 {
                features.push(Feature::from_name(item));
            }
            continue;
        }

        let lower = line.to_lowercase();
        let is_anchor = text::mentions_any(&lower, ANCHOR_TERMS)
            && !text::mentions_any(&lower, EXCLUDED_SECTION_TERMS);

        if is_anchor {
            in_section = true;
        } else if text::heading(line).is_some() {
            in_section = false;
        }
    }

    features
}
