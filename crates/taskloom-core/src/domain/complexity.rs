//! Project complexity, timeline and risk estimation

use serde::{Deserialize, Serialize};

use super::features::Feature;
use super::text;

/// Effort (story points) above which scope itself is a risk
const LARGE_SCOPE_EFFORT: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityIndicator {
    Auth,
    Database,
    Api,
    Realtime,
    Payment,
    Mobile,
    MultiUser,
}

impl ComplexityIndicator {
    pub const ALL: [ComplexityIndicator; 7] = [
        ComplexityIndicator::Auth,
        ComplexityIndicator::Database,
        ComplexityIndicator::Api,
        ComplexityIndicator::Realtime,
        ComplexityIndicator::Payment,
        ComplexityIndicator::Mobile,
        ComplexityIndicator::MultiUser,
    ];

    fn terms(&self) -> &'static [&'static str] {
        match self {
            ComplexityIndicator::Auth => &["auth", "login", "register", "user"],
            ComplexityIndicator::Database => &["database", "data", "store", "save"],
            ComplexityIndicator::Api => &["api", "endpoint", "service", "backend"],
            ComplexityIndicator::Realtime => &["real-time", "realtime", "live", "socket", "sync"],
            ComplexityIndicator::Payment => &["payment", "pay", "money", "billing"],
            ComplexityIndicator::Mobile => &["mobile", "app", "ios", "android"],
            ComplexityIndicator::MultiUser => &["multiplayer", "multi-user", "collaborative"],
        }
    }

    /// Risk implied by this indicator, if any
    fn risk(&self) -> Option<&'static str> {
        match self {
            ComplexityIndicator::Payment => Some("Payment integration complexity"),
            ComplexityIndicator::Realtime => Some("Real-time synchronization challenges"),
            ComplexityIndicator::MultiUser => Some("Multiplayer scalability requirements"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    /// In [0, 10]
    pub score: f64,
    pub total_effort: u32,
    pub weeks: u32,
    pub timeline: String,
    pub risks: Vec<String>,
    pub indicators: Vec<ComplexityIndicator>,
}

pub fn analyze(document: &str, features: &[Feature]) -> ComplexityAnalysis {
    let lower = document.to_lowercase();
    let indicators: Vec<ComplexityIndicator> = ComplexityIndicator::ALL
        .into_iter()
        .filter(|i| text::mentions_any(&lower, i.terms()))
        .collect();

    let score = (0.5 * features.len() as f64 + 1.5 * indicators.len() as f64).min(10.0);
    let total_effort: u32 = features.iter().map(|f| f.effort_points).sum();
    let weeks = (total_effort / 8).max(4);

    let mut risks: Vec<String> = indicators
        .iter()
        .filter_map(|i| i.risk())
        .map(str::to_string)
        .collect();
    if total_effort > LARGE_SCOPE_EFFORT {
        risks.push("Large project scope".to_string());
    }

    ComplexityAnalysis {
        score,
        total_effort,
        weeks,
        timeline: format!("{}-{} weeks", weeks, weeks + 2),
        risks,
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_project() {
        let analysis = analyze("a todo app", &[]);
        assert_eq!(analysis.indicators, vec![ComplexityIndicator::Mobile]);
        assert_eq!(analysis.score, 1.5);
        assert_eq!(analysis.weeks, 4);
        assert_eq!(analysis.timeline, "4-6 weeks");
        assert!(analysis.risks.is_empty());
    }

    #[test]
    fn test_risky_project() {
        let features: Vec<Feature> = (0..6)
            .map(|i| Feature::from_name(&format!("Payment Service {}", i)))
            .collect();
        let doc = "Multiplayer game with real-time sync, user login, payment billing, \
                   stored data behind an API, on iOS";
        let analysis = analyze(doc, &features);

        assert_eq!(analysis.indicators.len(), 7);
        assert_eq!(analysis.score, 10.0);
        assert_eq!(analysis.total_effort, 78);
        assert_eq!(analysis.weeks, 9);
        assert_eq!(analysis.timeline, "9-11 weeks");
        assert_eq!(
            analysis.risks,
            vec![
                "Real-time synchronization challenges",
                "Payment integration complexity",
                "Multiplayer scalability requirements",
                "Large project scope"
            ]
        );
    }
}
