//! Initial task synthesis
//!
//! A flat list built from fixed category templates plus a
//! core/testing/UI triad per feature. No dependencies are inferred.

use crate::domain::Priority;
use crate::domain::features::Feature;
use crate::domain::text;

use super::task::{TaskComplexity, TaskDraft};

const SETUP: &[&str] = &[
    "Project foundation and setup",
    "Development environment configuration",
    "CI/CD pipeline setup",
];
const FRONTEND: &[&str] = &[
    "UI/UX design and layout",
    "Component library creation",
    "Responsive design implementation",
    "Frontend routing setup",
];
const BACKEND: &[&str] = &[
    "API design and documentation",
    "Database schema design",
    "Authentication system",
    "API endpoints implementation",
];
const TESTING: &[&str] = &[
    "Unit tests implementation",
    "Integration tests setup",
    "E2E testing framework",
    "Performance testing",
];
const DEPLOYMENT: &[&str] = &[
    "Production deployment setup",
    "Monitoring and logging",
    "Security audit",
    "Documentation finalization",
];

/// Build the initial task list, ids assigned in order starting at 1
pub fn synthesize(project_name: &str, features: &[Feature]) -> Vec<TaskDraft> {
    let feature_titles: Vec<String> = features
        .iter()
        .flat_map(|f| {
            [
                format!("{} - Core implementation", f.name),
                format!("{} - Testing and validation", f.name),
                format!("{} - UI integration", f.name),
            ]
        })
        .collect();

    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    let groups: [(&str, Vec<String>); 6] = [
        ("setup", owned(SETUP)),
        ("frontend", owned(FRONTEND)),
        ("backend", owned(BACKEND)),
        ("features", feature_titles),
        ("testing", owned(TESTING)),
        ("deployment", owned(DEPLOYMENT)),
    ];

    groups
        .iter()
        .flat_map(|(category, titles)| titles.iter().map(move |title| (*category, title)))
        .enumerate()
        .map(|(i, (category, title))| TaskDraft {
            local_id: i as u32 + 1,
            title: title.clone(),
            description: format!("Implement {} for {}", title.to_lowercase(), project_name),
            priority: priority_for(category, title),
            estimated_hours: hours_for(category, title),
            complexity: complexity_for(title),
            category: category.to_string(),
            dependencies: Vec::new(),
        })
        .collect()
}

fn priority_for(category: &str, title: &str) -> Priority {
    if matches!(category, "setup" | "backend") || text::mentions(title, "core") {
        Priority::High
    } else if matches!(category, "testing" | "deployment") {
        Priority::Low
    } else {
        Priority::Medium
    }
}

fn hours_for(category: &str, title: &str) -> f64 {
    let lower = title.to_lowercase();
    if category == "setup" {
        4.0
    } else if lower.contains("implementation") {
        12.0
    } else if lower.contains("testing") {
        6.0
    } else {
        8.0
    }
}

fn complexity_for(title: &str) -> TaskComplexity {
    let lower = title.to_lowercase();
    if text::mentions_any(&lower, &["auth", "payment", "real-time"]) {
        TaskComplexity::High
    } else if text::mentions_any(&lower, &["setup", "config", "ui"]) {
        TaskComplexity::Low
    } else {
        TaskComplexity::Medium
    }
}
