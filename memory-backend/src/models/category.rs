//! Fixed enumerations carried in memory frontmatter.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{MemoryError, Result};

/// Storage category. Each category is a subdirectory of the store root.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    EnumString, AsRefStr, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Facts,
    Context,
    Patterns,
    Reflections,
    Soul,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Facts => "facts",
            Category::Context => "context",
            Category::Patterns => "patterns",
            Category::Reflections => "reflections",
            Category::Soul => "soul",
        }
    }

    /// Parse a category name, rejecting anything outside the fixed set.
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse()
            .map_err(|_| MemoryError::InvalidCategory(name.to_string()))
    }

    /// All categories in storage order
    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, PartialOrd, Ord, Serialize, Deserialize,
    EnumString, AsRefStr, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumString,
    AsRefStr, EnumIter, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}
