use serde::Serialize;
use strum::{AsRefStr, Display};

/// Which channel of the external engine to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchMode {
    Lexical,
    Semantic,
}

/// How a related result was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Relationship {
    /// Declared in the source document's `related` frontmatter
    Explicit,
    /// Discovered by embedding similarity
    Semantic,
}

/// Normalized search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<Relationship>,
}

impl SearchResult {
    pub fn path_only(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            score: None,
            context: None,
            relationship: None,
        }
    }

    pub fn scored(path: impl Into<String>, score: f64, context: Option<String>) -> Self {
        Self {
            path: path.into(),
            score: Some(score),
            context,
            relationship: None,
        }
    }

    pub fn explicit(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            score: Some(1.0),
            context: None,
            relationship: Some(Relationship::Explicit),
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.relationship == Some(Relationship::Explicit)
    }
}
