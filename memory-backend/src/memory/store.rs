//! MemoryStore: category-organized markdown memories on disk
//!
//! Every memory is `<root>/<category>/<slug>.md`. Writes always replace the whole
//! file; there is no locking, so concurrent writers to one path are
//! last-writer-wins.

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{file_ops, frontmatter, today};
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::models::{
    keys, Category, Document, Importance, MemoryFrontmatter, Metadata, Priority,
};

/// Request to create a memory
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    /// Category name; validated against the fixed set on create
    pub category: String,
    /// Human-readable name the slug is derived from
    pub name: String,
    pub body: String,
    pub tags: Vec<String>,
    pub importance: Importance,
    pub related: Vec<String>,
    pub conversation_id: Option<String>,
    pub priority: Option<Priority>,
    /// Additional fields appended after the standard ones (may override `type`)
    pub extra: Metadata,
}

impl NewMemory {
    pub fn new(category: &str, name: &str, body: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_related<I, S>(mut self, related: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related = related.into_iter().map(Into::into).collect();
        self
    }
}

/// End-of-session handoff written into `context/`
#[derive(Debug, Clone)]
pub struct SessionBridge {
    pub conversation_id: String,
    pub status: String,
    pub momentum: String,
    pub pending: String,
    pub markers: String,
}

/// Per-category document counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub counts: Vec<(Category, usize)>,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: PathBuf,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    /// Create every category directory that does not exist yet
    pub fn ensure_dirs(&self) -> Result<()> {
        for category in Category::all() {
            let dir = self.category_dir(category);
            std::fs::create_dir_all(&dir).map_err(|e| MemoryError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Resolve a caller-supplied path: absolute paths are used as-is, relative
    /// ones are taken from the store root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Path relative to the store root, or the full path for files outside it
    pub fn relative(&self, path: &Path) -> String {
        file_ops::relative_path(&self.root, path).unwrap_or_else(|| path.to_string_lossy().to_string())
    }

    /// Create a memory. An existing memory with the same slug is replaced.
    pub fn create(&self, request: NewMemory) -> Result<Document> {
        let category = Category::from_name(&request.category)?;
        let slug = file_ops::slugify(&request.name);
        if slug.is_empty() {
            return Err(MemoryError::MissingField("name"));
        }

        self.ensure_dirs()?;

        let now = today();
        let fm = MemoryFrontmatter {
            memory_type: Some(category.as_str().to_string()),
            tags: request.tags,
            created: Some(now),
            last_accessed: Some(now),
            importance: Some(request.importance),
            related: request.related,
            conversation_id: request.conversation_id.filter(|id| !id.is_empty()),
            priority: request.priority,
            extra: Metadata::new(),
        };

        let mut metadata = fm.to_metadata();
        for (key, value) in request.extra.iter() {
            if is_date_key(key) {
                log::debug!("[MEMORY] Ignoring `{}` in extra fields on create", key);
                continue;
            }
            metadata.insert(key, value.clone());
        }

        let body = with_trailing_newline(&request.body);
        let path = self.category_dir(category).join(format!("{}.md", slug));
        self.write_document(category, &slug, path, metadata, body)
    }

    /// Read a memory's raw content
    pub fn read(&self, path: impl AsRef<Path>) -> Result<String> {
        let full_path = self.resolve(path);
        if !full_path.is_file() {
            return Err(MemoryError::NotFound(full_path));
        }
        file_ops::read_memory(&full_path).map_err(|e| MemoryError::io(&full_path, e))
    }

    /// Read and parse a memory
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document> {
        let full_path = self.resolve(path);
        let content = self.read(&full_path)?;
        let parsed = frontmatter::parse_memory(&content);
        let category = self.category_of(&full_path, &parsed.metadata);
        Ok(self.document(category, full_path, parsed.metadata, parsed.body))
    }

    /// Merge `updates` into a memory's metadata. `last_accessed` always becomes
    /// today, `created` is never touched, and the body is written back unchanged.
    pub fn update(&self, path: impl AsRef<Path>, updates: Metadata) -> Result<Document> {
        let current = self.load(path)?;
        let mut metadata = current.metadata;

        for (key, value) in updates.iter() {
            if key == keys::CREATED {
                log::warn!("[MEMORY] Ignoring update to `created` on {}", current.rel_path);
                continue;
            }
            metadata.insert(key, value.clone());
        }
        metadata.insert(keys::LAST_ACCESSED, today());

        self.write_document(current.category, &current.slug, current.path, metadata, current.body)
    }

    /// Append a tag if it is not already present, then update as usual
    pub fn add_tag(&self, path: impl AsRef<Path>, tag: &str) -> Result<Document> {
        let path = path.as_ref();
        let current = self.load(path)?;
        let mut tags = current.metadata.tags();
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }

        let mut updates = Metadata::new();
        updates.insert(keys::TAGS, tags);
        self.update(path, updates)
    }

    /// List `(path, metadata)` for every memory in a category
    pub fn enumerate(&self, category: Category) -> Vec<(PathBuf, Metadata)> {
        self.documents(category)
            .into_iter()
            .map(|doc| (doc.path, doc.metadata))
            .collect()
    }

    /// Parse every memory in a category. Unreadable files are skipped.
    pub fn documents(&self, category: Category) -> Vec<Document> {
        let dir = self.category_dir(category);
        let files = match file_ops::list_category(&dir) {
            Ok(files) => files,
            Err(e) => {
                log::warn!("[MEMORY] Cannot list {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let mut docs = Vec::with_capacity(files.len());
        for path in files {
            match file_ops::read_memory(&path) {
                Ok(content) => {
                    let parsed = frontmatter::parse_memory(&content);
                    docs.push(self.document(category, path, parsed.metadata, parsed.body));
                }
                Err(e) => log::warn!("[MEMORY] Skipping unreadable {}: {}", path.display(), e),
            }
        }
        docs
    }

    /// Every memory across all categories, in category order then file name
    pub fn scan(&self) -> Vec<Document> {
        Category::all().flat_map(|c| self.documents(c)).collect()
    }

    pub fn stats(&self) -> StoreStats {
        let counts: Vec<(Category, usize)> = Category::all()
            .map(|c| {
                let count = file_ops::list_category(&self.category_dir(c))
                    .map(|files| files.len())
                    .unwrap_or(0);
                (c, count)
            })
            .collect();
        let total = counts.iter().map(|(_, n)| n).sum();
        StoreStats { counts, total }
    }

    /// Write a session handoff into `context/bridge-<id tail>-<timestamp>.md`
    pub fn close_session(&self, bridge: &SessionBridge) -> Result<Document> {
        let id = bridge.conversation_id.trim();
        if id.is_empty() {
            return Err(MemoryError::MissingField("conversation_id"));
        }

        let now = Local::now();
        let id_tail: String = {
            let chars: Vec<char> = id.chars().collect();
            chars[chars.len().saturating_sub(8)..].iter().collect()
        };
        let slug = format!(
            "bridge-{}-{}",
            file_ops::slugify(&id_tail),
            now.format("%Y%m%d-%H%M%S")
        );

        let today = now.date_naive();
        let mut metadata = Metadata::new();
        metadata.insert(keys::TYPE, "conversation_bridge");
        metadata.insert(keys::TAGS, vec!["bridge", "continuity"]);
        metadata.insert(keys::CREATED, today);
        metadata.insert(keys::LAST_ACCESSED, today);
        metadata.insert(keys::IMPORTANCE, Importance::High.as_ref());
        metadata.insert(keys::CONVERSATION_ID, id);

        let body = format!(
            "# Conversation Bridge: {}\n\n## STATUS\n{}\n\n## MOMENTUM\n{}\n\n## PENDING\n{}\n\n## RETRIEVAL-MARKERS\n{}\n",
            id,
            bridge.status.trim(),
            bridge.momentum.trim(),
            bridge.pending.trim(),
            bridge.markers.trim()
        );

        self.ensure_dirs()?;
        let path = self
            .category_dir(Category::Context)
            .join(format!("{}.md", slug));
        self.write_document(Category::Context, &slug, path, metadata, body)
    }

    /// Write pre-built metadata and body to `<category>/<slug>.md`
    pub fn store_raw(
        &self,
        category: Category,
        name: &str,
        metadata: Metadata,
        body: &str,
    ) -> Result<Document> {
        let slug = file_ops::slugify(name);
        if slug.is_empty() {
            return Err(MemoryError::MissingField("name"));
        }
        self.ensure_dirs()?;
        let path = self.category_dir(category).join(format!("{}.md", slug));
        self.write_document(category, &slug, path, metadata, with_trailing_newline(body))
    }

    fn write_document(
        &self,
        category: Category,
        slug: &str,
        path: PathBuf,
        metadata: Metadata,
        body: String,
    ) -> Result<Document> {
        let existed = path.exists();
        let content = frontmatter::compose_memory(&metadata, &body);
        file_ops::write_memory(&path, &content).map_err(|e| MemoryError::io(&path, e))?;

        let doc = Document {
            category,
            slug: slug.to_string(),
            rel_path: self.relative(&path),
            path,
            metadata,
            body,
        };
        if existed {
            log::info!("[MEMORY] Wrote {}", doc.rel_path);
        } else {
            log::info!("[MEMORY] Created {}", doc.rel_path);
        }
        Ok(doc)
    }

    fn document(&self, category: Category, path: PathBuf, metadata: Metadata, body: String) -> Document {
        let slug = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Document {
            category,
            slug,
            rel_path: self.relative(&path),
            path,
            metadata,
            body,
        }
    }

    /// The directory a file sits in decides its category; files outside a
    /// category directory fall back to their `type` field, then to `context`.
    fn category_of(&self, path: &Path, metadata: &Metadata) -> Category {
        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Category::from_name(&dir_name)
            .ok()
            .or_else(|| metadata.get_text(keys::TYPE).and_then(|t| Category::from_name(t).ok()))
            .unwrap_or_else(|| {
                log::debug!("[MEMORY] {} has no category, treating as context", path.display());
                Category::Context
            })
    }
}

fn is_date_key(key: &str) -> bool {
    key == keys::CREATED || key == keys::LAST_ACCESSED
}

fn with_trailing_newline(body: &str) -> String {
    if body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{}\n", body)
    }
}

/// Used by tests across the crate to backdate documents
#[cfg(test)]
pub(crate) fn write_fixture(
    root: &Path,
    rel_path: &str,
    fields: &[(&str, crate::models::MetaValue)],
    body: &str,
) -> PathBuf {
    let metadata: Metadata = fields.iter().cloned().collect();
    let path = root.join(rel_path);
    file_ops::write_memory(&path, &frontmatter::compose_memory(&metadata, body)).unwrap();
    path
}

#[cfg(test)]
pub(crate) fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetaValue;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, MemoryStore) {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(dir.path().join("Memory"));
        (dir, store)
    }

    #[test]
    fn test_create_favorite_editor() {
        let (_dir, store) = store();

        let doc = store
            .create(
                NewMemory::new("facts", "Favorite Editor", "Uses helix for everything.")
                    .with_tags(["tools", "preference"])
                    .with_importance(Importance::Medium),
            )
            .expect("Failed to create memory");

        assert_eq!(doc.rel_path, "facts/favorite-editor.md");
        assert!(store.root().join("facts/favorite-editor.md").is_file());

        let content = store.read("facts/favorite-editor.md").unwrap();
        let today = today().format("%Y-%m-%d").to_string();
        assert!(content.starts_with("---\ntype: facts\ntags: [\"tools\", \"preference\"]\n"));
        assert!(content.contains(&format!("created: {}\n", today)));
        assert!(content.contains(&format!("last_accessed: {}\n", today)));
        assert!(content.contains("importance: medium\n"));
        assert!(content.ends_with("---\n\nUses helix for everything.\n"));
    }

    #[test]
    fn test_create_then_read_dates_and_type() {
        let (_dir, store) = store();
        let doc = store
            .create(NewMemory::new("patterns", "Morning focus", "Deep work before 11."))
            .unwrap();

        let parsed = frontmatter::parse_memory(&store.read(&doc.path).unwrap());
        let fm = MemoryFrontmatter::from_metadata(&parsed.metadata);
        assert_eq!(fm.created, Some(today()));
        assert_eq!(fm.last_accessed, Some(today()));
        assert_eq!(fm.memory_type.as_deref(), Some("patterns"));
        assert_eq!(fm.importance, Some(Importance::Medium));
    }

    #[test]
    fn test_create_creates_all_category_dirs() {
        let (_dir, store) = store();
        store.create(NewMemory::new("soul", "Core values", "Curiosity.")).unwrap();
        for category in Category::all() {
            assert!(store.category_dir(category).is_dir());
        }
    }

    #[test]
    fn test_create_optional_fields_and_type_override() {
        let (_dir, store) = store();
        let mut request = NewMemory::new("facts", "Launch plan", "Ship in May.")
            .with_related(["context/roadmap.md"]);
        request.conversation_id = Some("conv-42".to_string());
        request.priority = Some(Priority::Urgent);
        request.extra.insert("type", "decision");
        request.extra.insert("created", "1999-01-01");
        request.extra.insert("source", "standup");

        let doc = store.create(request).unwrap();
        let m = &doc.metadata;
        assert_eq!(m.get_text("type"), Some("decision"));
        assert_eq!(m.date("created"), Some(today()));
        assert_eq!(m.list("related"), vec!["context/roadmap.md"]);
        assert_eq!(m.get_text("conversation_id"), Some("conv-42"));
        assert_eq!(m.get_text("priority"), Some("urgent"));
        assert_eq!(m.keys().last(), Some("source"));
        assert_eq!(doc.category, Category::Facts);
    }

    #[test]
    fn test_create_rejects_invalid_category_and_empty_name() {
        let (_dir, store) = store();
        assert!(matches!(
            store.create(NewMemory::new("journal", "Anything", "x")),
            Err(MemoryError::InvalidCategory(_))
        ));
        assert!(matches!(
            store.create(NewMemory::new("facts", "???", "x")),
            Err(MemoryError::MissingField("name"))
        ));
        assert!(!store.root().join("journal").exists());
    }

    #[test]
    fn test_create_overwrites_same_slug() {
        let (_dir, store) = store();
        store.create(NewMemory::new("facts", "Editor", "vim")).unwrap();
        store.create(NewMemory::new("facts", "editor!", "helix")).unwrap();

        let content = store.read("facts/editor.md").unwrap();
        assert!(content.contains("helix"));
        assert!(!content.contains("vim"));
        assert_eq!(store.enumerate(Category::Facts).len(), 1);
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.read("facts/nope.md"), Err(MemoryError::NotFound(_))));
    }

    #[test]
    fn test_update_importance_scenario() {
        let (_dir, store) = store();
        let path = write_fixture(
            store.root(),
            "facts/favorite-editor.md",
            &[
                ("type", MetaValue::from("facts")),
                ("tags", MetaValue::from(vec!["tools", "preference"])),
                ("created", MetaValue::from("2024-01-10")),
                ("last_accessed", MetaValue::from("2024-01-10")),
                ("importance", MetaValue::from("medium")),
            ],
            "Uses helix.\n",
        );

        let mut updates = Metadata::new();
        updates.insert("importance", "high");
        let doc = store.update("facts/favorite-editor.md", updates).unwrap();

        let parsed = frontmatter::parse_memory(&store.read(&path).unwrap());
        assert_eq!(parsed.metadata, doc.metadata);
        assert_eq!(parsed.metadata.get_text("importance"), Some("high"));
        assert_eq!(parsed.metadata.tags(), vec!["tools", "preference"]);
        assert_eq!(parsed.metadata.date("created"), Some(date(2024, 1, 10)));
        assert_eq!(parsed.metadata.date("last_accessed"), Some(today()));
        assert_eq!(parsed.body, "Uses helix.\n");
        assert_eq!(
            parsed.metadata.keys().collect::<Vec<_>>(),
            vec!["type", "tags", "created", "last_accessed", "importance"]
        );
    }

    #[test]
    fn test_update_without_fields_still_bumps_last_accessed() {
        let (_dir, store) = store();
        write_fixture(
            store.root(),
            "context/roadmap.md",
            &[
                ("created", MetaValue::from("2023-05-01")),
                ("last_accessed", MetaValue::from("2023-06-01")),
            ],
            "\nIndented first line.\n\n",
        );

        let before = frontmatter::parse_memory(&store.read("context/roadmap.md").unwrap());
        let doc = store.update("context/roadmap.md", Metadata::new()).unwrap();
        let after = frontmatter::parse_memory(&store.read("context/roadmap.md").unwrap());

        assert_eq!(doc.metadata.date("last_accessed"), Some(today()));
        assert_eq!(after.metadata.date("created"), Some(date(2023, 5, 1)));
        assert_eq!(after.body, before.body);
    }

    #[test]
    fn test_update_never_changes_created() {
        let (_dir, store) = store();
        let doc = store.create(NewMemory::new("facts", "Pinned", "x")).unwrap();

        let mut updates = Metadata::new();
        updates.insert("created", "2000-01-01");
        updates.insert("pinned", true);
        let updated = store.update(&doc.path, updates).unwrap();

        assert_eq!(updated.metadata.date("created"), Some(today()));
        assert_eq!(updated.metadata.get("pinned"), Some(&MetaValue::Flag(true)));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_dir, store) = store();
        let result = store.update("facts/ghost.md", Metadata::new());
        assert!(matches!(result, Err(MemoryError::NotFound(_))));
    }

    #[test]
    fn test_update_adds_frontmatter_to_legacy_file() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.root().join("facts")).unwrap();
        std::fs::write(store.root().join("facts/legacy.md"), "plain notes\n").unwrap();

        let doc = store.update("facts/legacy.md", Metadata::new()).unwrap();
        assert_eq!(doc.body, "plain notes\n");
        let content = store.read("facts/legacy.md").unwrap();
        assert!(content.starts_with("---\nlast_accessed: "));
        assert!(content.ends_with("---\n\nplain notes\n"));
    }

    #[test]
    fn test_add_tag() {
        let (_dir, store) = store();
        let doc = store
            .create(NewMemory::new("facts", "Editor", "helix").with_tags(["tools"]))
            .unwrap();

        store.add_tag(&doc.path, "preference").unwrap();
        let updated = store.add_tag(&doc.path, "tools").unwrap();
        assert_eq!(updated.metadata.tags(), vec!["tools", "preference"]);
    }

    #[test]
    fn test_enumerate_skips_missing_category() {
        let (_dir, store) = store();
        assert!(store.enumerate(Category::Reflections).is_empty());

        store.create(NewMemory::new("facts", "B note", "b")).unwrap();
        store.create(NewMemory::new("facts", "A note", "a")).unwrap();
        let listed = store.enumerate(Category::Facts);
        let names: Vec<String> = listed
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a-note.md", "b-note.md"]);
        assert_eq!(listed[0].1.get_text("type"), Some("facts"));
    }

    #[test]
    fn test_load_uses_directory_category() {
        let (_dir, store) = store();
        write_fixture(
            store.root(),
            "patterns/drift.md",
            &[("type", MetaValue::from("facts"))],
            "body",
        );
        let doc = store.load("patterns/drift.md").unwrap();
        assert_eq!(doc.category, Category::Patterns);
        assert_eq!(doc.memory_type(), Some("facts"));
    }

    #[test]
    fn test_update_outside_category_dirs() {
        let (_dir, store) = store();
        let path = write_fixture(
            store.root(),
            "inbox/loose.md",
            &[("type", MetaValue::from("preference"))],
            "loose body",
        );

        let doc = store.load(&path).unwrap();
        assert_eq!(doc.category, Category::Context);

        let mut updates = Metadata::new();
        updates.insert("importance", "high");
        let updated = store.update(&path, updates).unwrap();
        assert_eq!(updated.metadata.get_text("importance"), Some("high"));
        assert_eq!(updated.body, doc.body);
        assert!(path.is_file());
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = store();
        store.create(NewMemory::new("facts", "One", "1")).unwrap();
        store.create(NewMemory::new("facts", "Two", "2")).unwrap();
        store.create(NewMemory::new("soul", "Three", "3")).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.counts[0], (Category::Facts, 2));
        assert_eq!(stats.counts[4], (Category::Soul, 1));
        assert_eq!(stats.counts[1], (Category::Context, 0));
    }

    #[test]
    fn test_close_session_bridge() {
        let (_dir, store) = store();
        let doc = store
            .close_session(&SessionBridge {
                conversation_id: "con_0123456789abcdef".to_string(),
                status: "Refactoring the store".to_string(),
                momentum: "Tests green".to_string(),
                pending: "Wire CLI".to_string(),
                markers: "store, cli".to_string(),
            })
            .unwrap();

        assert_eq!(doc.category, Category::Context);
        assert!(doc.slug.starts_with("bridge-89abcdef-"));
        assert_eq!(doc.memory_type(), Some("conversation_bridge"));
        assert_eq!(doc.metadata.get_text("conversation_id"), Some("con_0123456789abcdef"));
        let content = store.read(&doc.path).unwrap();
        assert!(content.contains("## STATUS\nRefactoring the store\n"));
        assert!(content.contains("## RETRIEVAL-MARKERS\nstore, cli\n"));
    }

    #[test]
    fn test_close_session_requires_id() {
        let (_dir, store) = store();
        let result = store.close_session(&SessionBridge {
            conversation_id: "  ".to_string(),
            status: String::new(),
            momentum: String::new(),
            pending: String::new(),
            markers: String::new(),
        });
        assert!(matches!(result, Err(MemoryError::MissingField("conversation_id"))));
    }
}
