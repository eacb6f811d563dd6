//! Lexical signature table for technology detection

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechCategory {
    FullstackFramework,
    FrontendFramework,
    UiLibrary,
    Styling,
    Validation,
    Orm,
    Database,
    RoutingPattern,
    Backend,
    BackendFramework,
    Language,
    Authentication,
    Security,
    Deployment,
    Mobile,
    Realtime,
    Payments,
}

impl TechCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TechCategory::FullstackFramework => "fullstack_framework",
            TechCategory::FrontendFramework => "frontend_framework",
            TechCategory::UiLibrary => "ui_library",
            TechCategory::Styling => "styling",
            TechCategory::Validation => "validation",
            TechCategory::Orm => "orm",
            TechCategory::Database => "database",
            TechCategory::RoutingPattern => "routing_pattern",
            TechCategory::Backend => "backend",
            TechCategory::BackendFramework => "backend_framework",
            TechCategory::Language => "language",
            TechCategory::Authentication => "authentication",
            TechCategory::Security => "security",
            TechCategory::Deployment => "deployment",
            TechCategory::Mobile => "mobile",
            TechCategory::Realtime => "realtime",
            TechCategory::Payments => "payments",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let category = match s {
            "fullstack_framework" => TechCategory::FullstackFramework,
            "frontend_framework" => TechCategory::FrontendFramework,
            "ui_library" => TechCategory::UiLibrary,
            "styling" => TechCategory::Styling,
            "validation" => TechCategory::Validation,
            "orm" => TechCategory::Orm,
            "database" => TechCategory::Database,
            "routing_pattern" => TechCategory::RoutingPattern,
            "backend" => TechCategory::Backend,
            "backend_framework" => TechCategory::BackendFramework,
            "language" => TechCategory::Language,
            "authentication" => TechCategory::Authentication,
            "security" => TechCategory::Security,
            "deployment" => TechCategory::Deployment,
            "mobile" => TechCategory::Mobile,
            "realtime" => TechCategory::Realtime,
            "payments" => TechCategory::Payments,
            _ => return None,
        };
        Some(category)
    }

    /// Categories that can serve HTTP requests on their own
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            TechCategory::FullstackFramework
                | TechCategory::Backend
                | TechCategory::BackendFramework
        )
    }
}

impl std::fmt::Display for TechCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phrase whose presence implies a technology choice
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub phrase: &'static str,
    pub category: TechCategory,
    pub technology: &'static str,
    pub version: &'static str,
    pub rationale: &'static str,
    pub confidence: f64,
}

const fn sig(
    phrase: &'static str,
    category: TechCategory,
    technology: &'static str,
    version: &'static str,
    rationale: &'static str,
    confidence: f64,
) -> Signature {
    Signature {
        phrase,
        category,
        technology,
        version,
        rationale,
        confidence,
    }
}

use TechCategory::*;

/// Phrases are lowercase and matched at word starts. Table order breaks
/// confidence ties within a category.
pub const SIGNATURES: &[Signature] = &[
    sig("react router v7", FullstackFramework, "React Router v7", "latest", "Full-stack React framework (Remix successor)", 0.95),
    sig("react-router v7", FullstackFramework, "React Router v7", "latest", "Full-stack React framework (Remix successor)", 0.95),
    sig("remix", FullstackFramework, "Remix", "latest", "Full-stack React framework", 0.9),
    sig("next.js", FullstackFramework, "Next.js", "14", "React framework with server rendering and API routes", 0.9),
    sig("nextjs", FullstackFramework, "Next.js", "14", "React framework with server rendering and API routes", 0.9),
    sig("react", FrontendFramework, "React", "18.3.0", "Component-based UI library", 0.85),
    sig("vue", FrontendFramework, "Vue.js", "3.4", "Progressive component framework", 0.85),
    sig("angular", FrontendFramework, "Angular", "17", "Batteries-included frontend framework", 0.8),
    sig("svelte", FrontendFramework, "Svelte", "4", "Compile-time UI framework", 0.8),
    sig("jquery", FrontendFramework, "jQuery", "3.7", "Legacy DOM manipulation library", 0.6),
    sig("shadcn/ui", UiLibrary, "Shadcn/ui", "latest", "Modern React component library", 0.95),
    sig("shadcn-ui", UiLibrary, "Shadcn/ui", "latest", "Modern React component library", 0.95),
    sig("shadcn", UiLibrary, "Shadcn/ui", "latest", "Modern React component library", 0.9),
    sig("tailwind", Styling, "Tailwind CSS", "latest", "Utility-first CSS framework", 0.9),
    sig("zod", Validation, "Zod", "latest", "TypeScript-first schema validation", 0.95),
    sig("drizzle orm", Orm, "Drizzle ORM", "latest", "TypeScript-first ORM", 0.95),
    sig("drizzle", Orm, "Drizzle ORM", "latest", "TypeScript-first ORM", 0.95),
    sig("prisma", Orm, "Prisma", "5", "Schema-driven ORM with migrations", 0.9),
    sig("postgresql", Database, "PostgreSQL", "16.0", "Reliable relational database", 0.9),
    sig("postgres", Database, "PostgreSQL", "16.0", "Reliable relational database", 0.9),
    sig("mysql", Database, "MySQL", "8.0", "Widely deployed relational database", 0.85),
    sig("mongodb", Database, "MongoDB", "7.0", "Document database", 0.85),
    sig("sqlite", Database, "SQLite", "3", "Embedded relational database", 0.8),
    sig("firebase", Database, "Firebase", "latest", "Hosted backend-as-a-service datastore", 0.65),
    sig("remix flat routes", RoutingPattern, "Remix Flat Routes", "latest", "File-based routing pattern", 0.95),
    sig("flat routes", RoutingPattern, "Remix Flat Routes", "latest", "File-based routing pattern", 0.95),
    sig("node.js", Backend, "Node.js", "20.0.0", "JavaScript runtime", 0.8),
    sig("nodejs", Backend, "Node.js", "20.0.0", "JavaScript runtime", 0.8),
    sig("python", Backend, "Python", "3.12", "General-purpose server language", 0.75),
    sig("express", BackendFramework, "Express", "latest", "Minimal Node.js framework", 0.8),
    sig("fastapi", BackendFramework, "FastAPI", "latest", "Typed Python API framework", 0.85),
    sig("django", BackendFramework, "Django", "5", "Batteries-included Python web framework", 0.85),
    sig("typescript", Language, "TypeScript", "5.0+", "Type-safe JavaScript", 0.9),
    sig("jwt", Authentication, "JWT", "latest", "JSON Web Tokens", 0.85),
    sig("oauth", Authentication, "OAuth 2.0", "2.0", "Delegated authorization", 0.8),
    sig("bcrypt", Security, "bcrypt", "latest", "Password hashing", 0.9),
    sig("docker", Deployment, "Docker", "latest", "Containerization", 0.85),
    sig("react native", Mobile, "React Native", "0.74", "Cross-platform mobile apps", 0.9),
    sig("socket.io", Realtime, "Socket.io", "4", "Bidirectional real-time messaging", 0.85),
    sig("websocket", Realtime, "WebSockets", "latest", "Persistent real-time connections", 0.7),
    sig("stripe", Payments, "Stripe", "latest", "Payment processing API", 0.9),
];

/// A generic recommendation used when a required category has no match
#[derive(Debug, Clone, Copy)]
pub struct Fallback {
    pub category: TechCategory,
    pub technology: &'static str,
    pub version: &'static str,
    pub rationale: &'static str,
    pub confidence: f64,
    /// Any of these lowercase terms implies the category is required
    pub triggers: &'static [&'static str],
    /// The category is already covered by any of these
    pub covered_by: &'static [TechCategory],
}

pub const FALLBACKS: &[Fallback] = &[
    Fallback {
        category: FrontendFramework,
        technology: "React",
        version: "18.3.0",
        rationale: "Modern component-based architecture",
        confidence: 0.7,
        triggers: &["web", "browser", "ui", "interface", "page", "dashboard", "app"],
        covered_by: &[FrontendFramework, FullstackFramework],
    },
    Fallback {
        category: Backend,
        technology: "Node.js",
        version: "20.0.0",
        rationale: "JavaScript ecosystem shared with the frontend",
        confidence: 0.7,
        triggers: &["api", "server", "backend", "endpoint"],
        covered_by: &[Backend, BackendFramework, FullstackFramework],
    },
    Fallback {
        category: Database,
        technology: "PostgreSQL",
        version: "16.0",
        rationale: "Reliable relational database",
        confidence: 0.8,
        triggers: &["data", "store", "user", "save", "database"],
        covered_by: &[Database],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for sig in SIGNATURES {
            assert_eq!(TechCategory::parse(sig.category.as_str()), Some(sig.category));
        }
    }

    #[test]
    fn test_signatures_are_well_formed() {
        for sig in SIGNATURES {
            assert_eq!(sig.phrase, sig.phrase.to_lowercase());
            assert!((0.0..=1.0).contains(&sig.confidence), "{}", sig.phrase);
        }
        for fallback in FALLBACKS {
            assert!((0.7..=0.8).contains(&fallback.confidence));
        }
    }

    #[test]
    fn test_server_side_categories() {
        assert!(TechCategory::FullstackFramework.is_server_side());
        assert!(TechCategory::Backend.is_server_side());
        assert!(!TechCategory::Database.is_server_side());
    }
}
