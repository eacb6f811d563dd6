//! Stack conflicts and their resolution

use serde::{Deserialize, Serialize};

use super::TechnologyRecommendation;
use super::catalog::TechCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A full-stack framework alongside a standalone server technology
    ServerRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep the full-stack framework, drop the standalone backend
    FullstackOnly,
    /// Keep both: full-stack app plus a separate API service
    FullstackWithSeparateApi,
    /// Drop the full-stack framework: plain frontend plus a separate API
    FrontendWithSeparateApi,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [
        Resolution::FullstackOnly,
        Resolution::FullstackWithSeparateApi,
        Resolution::FrontendWithSeparateApi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::FullstackOnly => "fullstack-only",
            Resolution::FullstackWithSeparateApi => "fullstack-with-api",
            Resolution::FrontendWithSeparateApi => "frontend-with-api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fullstack-only" => Some(Resolution::FullstackOnly),
            "fullstack-with-api" => Some(Resolution::FullstackWithSeparateApi),
            "frontend-with-api" => Some(Resolution::FrontendWithSeparateApi),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::FullstackOnly => "Full-stack framework only",
            Resolution::FullstackWithSeparateApi => "Full-stack framework plus a separate API",
            Resolution::FrontendWithSeparateApi => "Frontend only plus a separate API",
        }
    }

    /// Prune the recommendation set according to this resolution
    pub fn apply(&self, technologies: &mut Vec<TechnologyRecommendation>) {
        match self {
            Resolution::FullstackOnly => technologies.retain(|t| {
                !matches!(
                    t.category,
                    TechCategory::Backend | TechCategory::BackendFramework
                )
            }),
            Resolution::FullstackWithSeparateApi => {}
            Resolution::FrontendWithSeparateApi => {
                technologies.retain(|t| t.category != TechCategory::FullstackFramework)
            }
        }
    }
}

/// A detected conflict awaiting a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPoint {
    pub kind: ConflictKind,
    pub question: String,
    /// Technologies involved, e.g. ["React Router v7", "Node.js"]
    pub technologies: Vec<String>,
    pub options: Vec<Resolution>,
}

/// A decision point together with how (or whether) it was settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub point: DecisionPoint,
    pub resolution: Option<Resolution>,
}

/// Chooses a resolution for a decision point. `None` leaves it open.
pub trait ConflictResolver {
    fn resolve(&self, point: &DecisionPoint) -> Option<Resolution>;
}

/// Leaves every conflict open
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl ConflictResolver for NonInteractive {
    fn resolve(&self, _point: &DecisionPoint) -> Option<Resolution> {
        None
    }
}

/// Applies a resolution chosen ahead of time
#[derive(Debug, Clone, Copy)]
pub struct Preset(pub Resolution);

impl ConflictResolver for Preset {
    fn resolve(&self, point: &DecisionPoint) -> Option<Resolution> {
        point.options.contains(&self.0).then_some(self.0)
    }
}

/// A full-stack framework next to any other server-side technology
pub fn detect(technologies: &[TechnologyRecommendation]) -> Vec<DecisionPoint> {
    let Some(fullstack) = technologies
        .iter()
        .find(|t| t.category == TechCategory::FullstackFramework)
    else {
        return Vec::new();
    };

    let mut servers: Vec<&str> = Vec::new();
    for tech in technologies {
        if tech.category != TechCategory::FullstackFramework
            && tech.category.is_server_side()
            && !servers.contains(&tech.technology.as_str())
        {
            servers.push(&tech.technology);
        }
    }
    let Some(first) = servers.first() else {
        return Vec::new();
    };

    let question = format!(
        "{} is a full-stack framework but {} was also requested as a standalone server. How should the server side be built?",
        fullstack.technology, first
    );
    let mut involved = vec![fullstack.technology.clone()];
    involved.extend(servers.iter().map(|s| s.to_string()));

    vec![DecisionPoint {
        kind: ConflictKind::ServerRole,
        question,
        technologies: involved,
        options: Resolution::ALL.to_vec(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(category: TechCategory, technology: &str) -> TechnologyRecommendation {
        TechnologyRecommendation {
            category,
            technology: technology.to_string(),
            version: "latest".to_string(),
            confidence: 0.9,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_detects_server_role_conflict_once() {
        let techs = vec![
            rec(TechCategory::FullstackFramework, "React Router v7"),
            rec(TechCategory::Backend, "Node.js"),
            rec(TechCategory::BackendFramework, "Express"),
        ];
        let points = detect(&techs);
        assert_eq!(points.len(), 1);
        assert_eq!(
            points[0].technologies,
            vec!["React Router v7", "Node.js", "Express"]
        );
        assert_eq!(points[0].options.len(), 3);
    }

    #[test]
    fn test_non_server_categories_do_not_conflict() {
        let techs = vec![
            rec(TechCategory::FullstackFramework, "Next.js"),
            rec(TechCategory::Database, "PostgreSQL"),
            rec(TechCategory::Orm, "Prisma"),
        ];
        assert!(detect(&techs).is_empty());
    }

    #[test]
    fn test_no_conflict_without_fullstack() {
        let techs = vec![
            rec(TechCategory::FrontendFramework, "React"),
            rec(TechCategory::Backend, "Node.js"),
        ];
        assert!(detect(&techs).is_empty());
    }

    #[test]
    fn test_resolutions_prune() {
        let base = vec![
            rec(TechCategory::FullstackFramework, "React Router v7"),
            rec(TechCategory::Backend, "Node.js"),
            rec(TechCategory::Database, "PostgreSQL"),
        ];

        let mut techs = base.clone();
        Resolution::FullstackOnly.apply(&mut techs);
        assert!(techs.iter().all(|t| t.category != TechCategory::Backend));
        assert_eq!(techs.len(), 2);

        let mut techs = base.clone();
        Resolution::FrontendWithSeparateApi.apply(&mut techs);
        assert!(techs.iter().all(|t| t.category != TechCategory::FullstackFramework));

        let mut techs = base.clone();
        Resolution::FullstackWithSeparateApi.apply(&mut techs);
        assert_eq!(techs, base);
    }

    #[test]
    fn test_resolution_parse() {
        for r in Resolution::ALL {
            assert_eq!(Resolution::parse(r.as_str()), Some(r));
        }
        assert_eq!(
            Resolution::parse("FULLSTACK_ONLY"),
            Some(Resolution::FullstackOnly)
        );
        assert_eq!(Resolution::parse("both"), None);
    }

    #[test]
    fn test_resolvers() {
        let point = DecisionPoint {
            kind: ConflictKind::ServerRole,
            question: String::new(),
            technologies: vec![],
            options: Resolution::ALL.to_vec(),
        };
        assert_eq!(NonInteractive.resolve(&point), None);
        assert_eq!(
            Preset(Resolution::FullstackOnly).resolve(&point),
            Some(Resolution::FullstackOnly)
        );
    }
}
