//! Subtask descriptors: prompt, per-item validation and the fixed fallback

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::Priority;
use crate::domain::graph::ProjectContext;
use crate::domain::tasks::{Task, TaskComplexity};

pub const MIN_SUBTASK_HOURS: f64 = 1.0;
pub const MAX_SUBTASK_HOURS: f64 = 8.0;

pub const SUBTASK_SCHEMA: &str = r#"[
  {
    "title": "Specific action-oriented title",
    "description": "What needs to be done",
    "estimated_hours": 2,
    "complexity": "low|medium|high",
    "priority": "low|medium|high",
    "category": "same as parent or more specific",
    "depends_on": ["titles of sibling subtasks this depends on"]
  }
]"#;

/// One validated child of an expanded task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSpec {
    pub title: String,
    pub description: String,
    /// Always within [1, 8]
    pub estimated_hours: f64,
    pub complexity: TaskComplexity,
    pub priority: Priority,
    pub category: String,
    /// Titles of sibling subtasks
    pub depends_on: Vec<String>,
}

pub fn build_context(task: &Task, project: Option<&ProjectContext>) -> String {
    let mut context = format!(
        "Task to expand:\n\
         - Title: {}\n\
         - Description: {}\n\
         - Category: {}\n\
         - Priority: {}\n\
         - Estimated Hours: {}\n\
         - Complexity: {}\n",
        task.title,
        task.description,
        task.category,
        task.priority,
        task.estimated_hours,
        task.complexity.as_str()
    );

    if let Some(project) = project {
        context.push_str(&format!(
            "\nProject Context:\n\
             - Name: {}\n\
             - Technologies: {}\n\
             - Complexity: {}/10\n\
             - Package Manager: {}\n",
            project.name,
            project.technologies.join(", "),
            project.complexity_score,
            project.package_manager.as_str()
        ));
    }
    context
}

pub fn build_prompt(context: &str, min: usize, max: usize) -> String {
    format!(
        "Break down the following task into {min}-{max} specific, actionable subtasks.\n\n\
         {context}\n\
         Requirements:\n\
         1. Each subtask is completable in 1-8 hours\n\
         2. Subtasks are specific and actionable\n\
         3. Sequence them and list dependencies by sibling title\n\
         4. Keep the project's technology stack\n\n\
         Return a JSON array of {min}-{max} objects."
    )
}

/// Validate generated items against the subtask contract.
///
/// Items without a usable title or hours are dropped, hours are clamped,
/// unknown enum values fall back to the parent's. Returns `None` when
/// fewer than `min` items survive; extra items beyond `max` are cut.
pub fn validate_items(
    items: &[Value],
    parent: &Task,
    min: usize,
    max: usize,
) -> Option<Vec<SubtaskSpec>> {
    let mut specs: Vec<SubtaskSpec> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (idx, item) in items.iter().enumerate() {
        match validate_item(item, parent) {
            Some(spec) if !seen.insert(spec.title.to_lowercase()) => {
                debug!(index = idx, title = %spec.title, "Dropping duplicate subtask title");
            }
            Some(spec) => specs.push(spec),
            None => debug!(index = idx, "Dropping invalid subtask item"),
        }
    }

    if specs.len() < min {
        debug!(valid = specs.len(), min, "Too few valid subtasks");
        return None;
    }
    specs.truncate(max);

    // Only keep edges that point at surviving siblings.
    let titles: Vec<String> = specs.iter().map(|s| s.title.to_lowercase()).collect();
    for spec in &mut specs {
        let own = spec.title.to_lowercase();
        spec.depends_on.retain(|d| {
            let dep = d.to_lowercase();
            dep != own && titles.contains(&dep)
        });
    }
    Some(specs)
}

fn validate_item(item: &Value, parent: &Task) -> Option<SubtaskSpec> {
    let obj = item.as_object()?;

    let title = obj.get("title")?.as_str()?.trim();
    if title.is_empty() {
        return None;
    }

    let hours = match obj.get("estimated_hours")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !hours.is_finite() {
        return None;
    }

    let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::trim);

    let description = text("description")
        .filter(|d| !d.is_empty())
        .unwrap_or(title)
        .to_string();
    let complexity = text("complexity")
        .and_then(TaskComplexity::parse)
        .unwrap_or(TaskComplexity::Medium);
    let priority = text("priority")
        .and_then(Priority::parse)
        .unwrap_or(parent.priority);
    let category = text("category")
        .filter(|c| !c.is_empty())
        .unwrap_or(parent.category.as_str())
        .to_string();
    let depends_on = obj
        .get("depends_on")
        .and_then(Value::as_array)
        .map(|deps| {
            deps.iter()
                .filter_map(Value::as_str)
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(SubtaskSpec {
        title: title.to_string(),
        description,
        estimated_hours: hours.clamp(MIN_SUBTASK_HOURS, MAX_SUBTASK_HOURS),
        complexity,
        priority,
        category,
        depends_on,
    })
}

/// Design, implement, validate, test; each step depends on the previous
pub fn fallback(parent: &Task) -> Vec<SubtaskSpec> {
    let t = &parent.title;
    let design = format!("Design {} architecture", t);
    let core = format!("Implement core {} logic", t);
    let validation = format!("Add {} validation", t);

    vec![
        SubtaskSpec {
            title: design.clone(),
            description: format!("Create architectural design and data flow for {}", t),
            estimated_hours: 2.0,
            complexity: TaskComplexity::Medium,
            priority: Priority::High,
            category: "design".to_string(),
            depends_on: Vec::new(),
        },
        SubtaskSpec {
            title: core.clone(),
            description: format!("Develop the main business logic for {}", t),
            estimated_hours: 4.0,
            complexity: TaskComplexity::High,
            priority: Priority::High,
            category: "implementation".to_string(),
            depends_on: vec![design],
        },
        SubtaskSpec {
            title: validation.clone(),
            description: "Implement input validation and error handling".to_string(),
            estimated_hours: 2.0,
            complexity: TaskComplexity::Medium,
            priority: Priority::Medium,
            category: "validation".to_string(),
            depends_on: vec![core],
        },
        SubtaskSpec {
            title: format!("Test {} integration", t),
            description: format!("Create and run integration tests for {}", t),
            estimated_hours: 3.0,
            complexity: TaskComplexity::Medium,
            priority: Priority::Medium,
            category: "testing".to_string(),
            depends_on: vec![validation],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::setup::PackageManager;
    use crate::domain::tasks::TaskStatus;
    use chrono::Utc;
    use serde_json::json;

    fn parent() -> Task {
        Task {
            id: 7,
            project_id: 1,
            title: "Payment Service - Core implementation".into(),
            description: "Implement payments".into(),
            priority: Priority::High,
            estimated_hours: 20.0,
            complexity: TaskComplexity::High,
            category: "features".into(),
            status: TaskStatus::Todo,
            parent_task_id: None,
            expansion_level: 0,
            is_expanded: false,
            dependencies: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn item(title: &str, hours: Value) -> Value {
        json!({ "title": title, "description": "d", "estimated_hours": hours })
    }

    #[test]
    fn test_hours_are_clamped() {
        let items = vec![
            item("Schema", json!(0.25)),
            item("Handlers", json!(12)),
            item("Wiring", json!("3")),
        ];
        let specs = validate_items(&items, &parent(), 3, 7).unwrap();
        let hours: Vec<f64> = specs.iter().map(|s| s.estimated_hours).collect();
        assert_eq!(hours, vec![1.0, 8.0, 3.0]);
    }

    #[test]
    fn test_invalid_items_dropped_and_defaults_inherited() {
        let items = vec![
            json!("not an object"),
            json!({ "title": "", "estimated_hours": 2 }),
            json!({ "title": "No hours" }),
            json!({ "title": "A", "estimated_hours": 2, "complexity": "weird", "priority": "urgent" }),
            item("B", json!(2)),
            item("b", json!(2)),
            item("C", json!(2)),
        ];
        let specs = validate_items(&items, &parent(), 3, 7).unwrap();
        let titles: Vec<&str> = specs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(specs[0].complexity, TaskComplexity::Medium);
        assert_eq!(specs[0].priority, Priority::High);
        assert_eq!(specs[0].category, "features");
        assert_eq!(specs[0].description, "A");
    }

    #[test]
    fn test_non_ascii_titles_deduplicated_by_case() {
        let items = vec![
            item("Überprüfung", json!(2)),
            item("ÜBERPRÜFUNG", json!(2)),
            item("Écran", json!(2)),
            item("Zahlung", json!(2)),
        ];
        let specs = validate_items(&items, &parent(), 3, 7).unwrap();
        let titles: Vec<&str> = specs.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Überprüfung", "Écran", "Zahlung"]);
    }

    #[test]
    fn test_too_few_and_too_many() {
        let two = vec![item("A", json!(1)), item("B", json!(1))];
        assert!(validate_items(&two, &parent(), 3, 7).is_none());

        let ten: Vec<Value> = (0..10).map(|i| item(&format!("Step {}", i), json!(2))).collect();
        assert_eq!(validate_items(&ten, &parent(), 3, 7).unwrap().len(), 7);
    }

    #[test]
    fn test_dangling_dependencies_removed() {
        let items = vec![
            json!({ "title": "A", "estimated_hours": 2, "depends_on": ["A", "Ghost"] }),
            json!({ "title": "B", "estimated_hours": 2, "depends_on": ["a"] }),
            item("C", json!(2)),
        ];
        let specs = validate_items(&items, &parent(), 3, 7).unwrap();
        assert!(specs[0].depends_on.is_empty());
        assert_eq!(specs[1].depends_on, vec!["a"]);
    }

    #[test]
    fn test_fallback_chain() {
        let specs = fallback(&parent());
        assert_eq!(specs.len(), 4);
        assert_eq!(
            specs[0].title,
            "Design Payment Service - Core implementation architecture"
        );
        assert!(specs[0].depends_on.is_empty());
        for pair in specs.windows(2) {
            assert_eq!(pair[1].depends_on, vec![pair[0].title.clone()]);
        }
        let total: f64 = specs.iter().map(|s| s.estimated_hours).sum();
        assert_eq!(total, 11.0);
    }

    #[test]
    fn test_context_includes_project() {
        let project = ProjectContext {
            name: "Shop".into(),
            technologies: vec!["React".into(), "PostgreSQL".into()],
            complexity_score: 4.5,
            package_manager: PackageManager::Pnpm,
        };
        let context = build_context(&parent(), Some(&project));
        assert!(context.contains("- Title: Payment Service - Core implementation"));
        assert!(context.contains("- Priority: high"));
        assert!(context.contains("- Technologies: React, PostgreSQL"));
        assert!(context.contains("- Complexity: 4.5/10"));
        assert!(context.contains("- Package Manager: pnpm"));

        assert!(!build_context(&parent(), None).contains("Project Context"));
    }
}
