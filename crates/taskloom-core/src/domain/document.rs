//! Requirements document and project information extraction

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::text;

const DEFAULT_PROJECT_NAME: &str = "Untitled Project";
const DEFAULT_DESCRIPTION: &str = "Project extracted from requirements document";

/// Raw requirements text. Immutable once ingested and never blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    text: String,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::EmptyDocument);
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        text::word_count(&self.text)
    }

    pub fn project_info(&self) -> ProjectInfo {
        ProjectInfo {
            name: extract_name(&self.text),
            description: extract_description(&self.text),
        }
    }
}

/// Name and one-line description of the project a document describes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub description: String,
}

fn extract_name(text: &str) -> String {
    text.lines()
        .take(10)
        .filter_map(text::heading)
        .find(|(level, _)| *level == 1)
        .map(|(_, title)| match title.split_once(" - ") {
            Some((head, _)) => head.trim().to_string(),
            None => title.to_string(),
        })
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
}

fn extract_description(text: &str) -> String {
    let mut in_overview = false;
    for line in text.lines() {
        if let Some((_, title)) = text::heading(line) {
            let title = title.to_lowercase();
            in_overview = title.contains("overview") || title.contains("summary");
            continue;
        }
        if in_overview && !line.trim().is_empty() {
            return line.trim().to_string();
        }
    }

    text.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty() && text::heading(line).is_none() && text::list_item(line).is_none()
        })
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(Document::new(""), Err(Error::EmptyDocument)));
        assert!(matches!(Document::new("  \n\t"), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_project_name_from_title() {
        let doc = Document::new("# Snake Game - Requirements\n\nA classic game.").unwrap();
        assert_eq!(doc.project_info().name, "Snake Game");
    }

    #[test]
    fn test_project_name_default() {
        let doc = Document::new("a todo app").unwrap();
        assert_eq!(doc.project_info().name, DEFAULT_PROJECT_NAME);
        assert_eq!(doc.project_info().description, "a todo app");
    }

    #[test]
    fn test_description_prefers_overview() {
        let doc = Document::new(
            "# Shop\nIntro line\n## Overview\n\nAn online shop for books.\n## Features\n- cart",
        )
        .unwrap();
        assert_eq!(doc.project_info().description, "An online shop for books.");
    }

    #[test]
    fn test_description_skips_lists() {
        let doc = Document::new("# Shop\n- cart\nSells books online.").unwrap();
        assert_eq!(doc.project_info().description, "Sells books online.");
    }
}
