//! Document quality assessment
//!
//! A pure heuristic: seven boolean indicators, score = 10 * passed / total.

use serde::{Deserialize, Serialize};

use super::text;

/// Minimum word count for a document to count as detailed
pub const MIN_DETAILED_WORDS: usize = 500;

/// Documents scoring below this are considered weak
pub const WEAK_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIndicator {
    Length,
    StandardSections,
    DetailedFeatures,
    TechnicalSpecs,
    UserStories,
    AcceptanceCriteria,
    NonFunctional,
}

impl QualityIndicator {
    pub const ALL: [QualityIndicator; 7] = [
        QualityIndicator::Length,
        QualityIndicator::StandardSections,
        QualityIndicator::DetailedFeatures,
        QualityIndicator::TechnicalSpecs,
        QualityIndicator::UserStories,
        QualityIndicator::AcceptanceCriteria,
        QualityIndicator::NonFunctional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityIndicator::Length => "length",
            QualityIndicator::StandardSections => "standard_sections",
            QualityIndicator::DetailedFeatures => "detailed_features",
            QualityIndicator::TechnicalSpecs => "technical_specs",
            QualityIndicator::UserStories => "user_stories",
            QualityIndicator::AcceptanceCriteria => "acceptance_criteria",
            QualityIndicator::NonFunctional => "non_functional",
        }
    }

    fn evaluate(&self, text: &str, lower: &str) -> bool {
        match self {
            QualityIndicator::Length => text::word_count(text) >= MIN_DETAILED_WORDS,
            QualityIndicator::StandardSections => text::mentions_any(
                lower,
                &["objective", "feature", "functionality", "requirement"],
            ),
            QualityIndicator::DetailedFeatures => text::list_items(text).len() >= 3,
            QualityIndicator::TechnicalSpecs => text::mentions_any(
                lower,
                &["api", "database", "frontend", "backend", "technology", "framework"],
            ),
            QualityIndicator::UserStories => {
                text::mentions_any(lower, &["as a", "persona", "user"])
            }
            QualityIndicator::AcceptanceCriteria => text::mentions_any(
                lower,
                &["acceptance", "criteria", "must", "when", "then"],
            ),
            QualityIndicator::NonFunctional => text::mentions_any(
                lower,
                &["performance", "security", "scalability", "availability", "usability"],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorCheck {
    pub indicator: QualityIndicator,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Completeness score in [0, 10]
    pub score: f64,
    pub weaknesses: Vec<String>,
    pub missing_sections: Vec<String>,
    pub suggestions: Vec<String>,
    pub is_weak: bool,
    pub checks: Vec<IndicatorCheck>,
}

impl QualityReport {
    pub fn passed(&self, indicator: QualityIndicator) -> bool {
        self.checks
            .iter()
            .any(|c| c.indicator == indicator && c.passed)
    }
}

/// Score a document's completeness
pub fn assess(text: &str) -> QualityReport {
    let lower = text.to_lowercase();
    let checks: Vec<IndicatorCheck> = QualityIndicator::ALL
        .iter()
        .map(|indicator| IndicatorCheck {
            indicator: *indicator,
            passed: indicator.evaluate(text, &lower),
        })
        .collect();

    let passed = checks.iter().filter(|c| c.passed).count();
    let score = 10.0 * passed as f64 / checks.len() as f64;

    let mut weaknesses = Vec::new();
    let mut missing_sections = Vec::new();
    for check in checks.iter().filter(|c| !c.passed) {
        match check.indicator {
            QualityIndicator::Length => {
                weaknesses.push("Document is too short to describe the project in detail".into())
            }
            QualityIndicator::StandardSections => missing_sections.extend([
                "Objectives".to_string(),
                "Features".to_string(),
                "Technical Requirements".to_string(),
            ]),
            QualityIndicator::DetailedFeatures => {
                weaknesses.push("Features are described too vaguely".into())
            }
            QualityIndicator::TechnicalSpecs => {
                missing_sections.push("Technical Specifications".into())
            }
            QualityIndicator::UserStories => missing_sections.push("User Stories".into()),
            QualityIndicator::AcceptanceCriteria => {
                weaknesses.push("Acceptance criteria are missing".into())
            }
            QualityIndicator::NonFunctional => {
                missing_sections.push("Non-Functional Requirements".into())
            }
        }
    }

    QualityReport {
        score,
        weaknesses,
        missing_sections,
        suggestions: suggestions_for(score),
        is_weak: score < WEAK_THRESHOLD,
        checks,
    }
}

fn suggestions_for(score: f64) -> Vec<String> {
    let items: &[&str] = if score < 5.0 {
        &[
            "Add more detail about each feature",
            "Include user stories with defined personas",
            "Specify technical and performance requirements",
            "Describe the main user flows",
        ]
    } else if score < 7.0 {
        &[
            "Expand the acceptance criteria",
            "Add security considerations",
            "Include success metrics",
        ]
    } else {
        &[]
    };
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_word_document_is_weak() {
        let report = assess("a todo app");
        assert!(report.is_weak);
        assert!(report.score < WEAK_THRESHOLD);
        assert_eq!(report.score, 0.0);
        assert_eq!(report.suggestions.len(), 4);
        assert!(report.missing_sections.contains(&"User Stories".to_string()));
    }

    #[test]
    fn test_structured_document_scores_higher() {
        let text = "# Shop\n## Objectives\n- sell books\n- ship fast\n- track orders\n\
                    ## Technical\nREST API backed by a database.\n\
                    As a user I want to browse.\nAcceptance: orders must persist.\n\
                    Performance under load matters.";
        let report = assess(text);
        assert!(!report.is_weak);
        assert!(!report.passed(QualityIndicator::Length));
        assert!((report.score - 60.0 / 7.0).abs() < 1e-9);
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn test_score_is_bounded() {
        for text in ["", "x", "feature api user must performance - a\n- b\n- c"] {
            let report = assess(text);
            assert!((0.0..=10.0).contains(&report.score));
        }
    }

    #[test]
    fn test_length_indicator() {
        let long = "word ".repeat(MIN_DETAILED_WORDS);
        assert!(assess(&long).passed(QualityIndicator::Length));
    }

    #[test]
    fn test_mid_range_suggestions() {
        assert_eq!(suggestions_for(5.5).len(), 3);
        assert!(suggestions_for(7.2).is_empty());
    }
}
