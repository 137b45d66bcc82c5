use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

use super::category::Category;
use super::metadata::Metadata;

/// A stored memory: one markdown file under `<root>/<category>/<slug>.md`
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Directory the file lives in (authoritative for enumeration)
    pub category: Category,
    pub slug: String,
    /// Absolute path on disk
    pub path: PathBuf,
    /// Path relative to the store root, e.g. `facts/favorite-editor.md`
    pub rel_path: String,
    pub metadata: Metadata,
    pub body: String,
}

impl Document {
    /// The `type` field, which may drift from the directory category
    pub fn memory_type(&self) -> Option<&str> {
        self.metadata.get_text(super::keys::TYPE)
    }
}

/// A document's change summary, derived by the temporal index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    pub path: PathBuf,
    pub rel_path: String,
    pub category: Category,
    pub created: Option<NaiveDate>,
    pub last_accessed: Option<NaiveDate>,
    pub last_change: NaiveDate,
}
