//! Frontmatter metadata: an ordered key → value mapping over three value shapes,
//! plus a typed view over the well-known keys.

use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::category::{Importance, Priority};
use crate::error::{MemoryError, Result};

/// Well-known frontmatter keys
pub mod keys {
    pub const TYPE: &str = "type";
    pub const TAGS: &str = "tags";
    pub const CREATED: &str = "created";
    pub const LAST_ACCESSED: &str = "last_accessed";
    pub const IMPORTANCE: &str = "importance";
    pub const RELATED: &str = "related";
    pub const CONVERSATION_ID: &str = "conversation_id";
    pub const PRIORITY: &str = "priority";
}

/// Date format used for `created` / `last_accessed`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single frontmatter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Flag(bool),
    List(Vec<String>),
    Text(String),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Normalize into a list of strings. Plain text is treated as a comma-separated list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            MetaValue::List(items) => items
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            MetaValue::Text(s) => s
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            MetaValue::Flag(_) => Vec::new(),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Text(s)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Flag(b)
    }
}

impl From<Vec<String>> for MetaValue {
    fn from(items: Vec<String>) -> Self {
        MetaValue::List(items)
    }
}

impl From<Vec<&str>> for MetaValue {
    fn from(items: Vec<&str>) -> Self {
        MetaValue::List(items.into_iter().map(String::from).collect())
    }
}

impl From<NaiveDate> for MetaValue {
    fn from(date: NaiveDate) -> Self {
        MetaValue::Text(date.format(DATE_FORMAT).to_string())
    }
}

/// Ordered frontmatter mapping. Keys are unique; re-inserting a key replaces its
/// value in place so the original position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, MetaValue)>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetaValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace. Returns the previous value if the key existed.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Option<MetaValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Merge `other` into self: existing keys are overwritten, new keys appended.
    pub fn merge(&mut self, other: Metadata) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Normalized list for `key` (empty if absent)
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(MetaValue::to_list).unwrap_or_default()
    }

    pub fn tags(&self) -> Vec<String> {
        self.list(keys::TAGS)
    }

    /// Strict date lookup: `Ok(None)` when absent, `MalformedMetadata` when present
    /// but not a `YYYY-MM-DD` string.
    pub fn parse_date(&self, key: &str) -> Result<Option<NaiveDate>> {
        match self.get(key) {
            None => Ok(None),
            Some(MetaValue::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(MetaValue::Text(s)) => parse_date_str(s)
                .map(Some)
                .ok_or_else(|| MemoryError::malformed(key, s.as_str())),
            Some(other) => Err(MemoryError::malformed(key, format!("{:?}", other))),
        }
    }

    /// Best-effort date lookup used by scans. Malformed values are logged and skipped.
    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        match self.parse_date(key) {
            Ok(date) => date,
            Err(e) => {
                log::debug!("[MEMORY] Skipping {}", e);
                None
            }
        }
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parse a `YYYY-MM-DD` string
pub fn parse_date_str(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Typed view over the well-known keys. Anything else, and any well-known key
/// whose value does not fit its type, is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryFrontmatter {
    pub memory_type: Option<String>,
    pub tags: Vec<String>,
    pub created: Option<NaiveDate>,
    pub last_accessed: Option<NaiveDate>,
    pub importance: Option<Importance>,
    pub related: Vec<String>,
    pub conversation_id: Option<String>,
    pub priority: Option<Priority>,
    pub extra: Metadata,
}

impl MemoryFrontmatter {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mut fm = MemoryFrontmatter::default();

        for (key, value) in metadata.iter() {
            let kept = match (key, value) {
                (keys::TYPE, MetaValue::Text(s)) => {
                    fm.memory_type = Some(s.clone());
                    true
                }
                (keys::TAGS, MetaValue::List(_) | MetaValue::Text(_)) => {
                    fm.tags = value.to_list();
                    true
                }
                (keys::RELATED, MetaValue::List(_) | MetaValue::Text(_)) => {
                    fm.related = value.to_list();
                    true
                }
                (keys::CREATED, _) => {
                    fm.created = metadata.date(keys::CREATED);
                    fm.created.is_some()
                }
                (keys::LAST_ACCESSED, _) => {
                    fm.last_accessed = metadata.date(keys::LAST_ACCESSED);
                    fm.last_accessed.is_some()
                }
                (keys::IMPORTANCE, MetaValue::Text(s)) => {
                    fm.importance = s.parse().ok();
                    fm.importance.is_some()
                }
                (keys::PRIORITY, MetaValue::Text(s)) => {
                    fm.priority = s.parse().ok();
                    fm.priority.is_some()
                }
                (keys::CONVERSATION_ID, MetaValue::Text(s)) => {
                    fm.conversation_id = Some(s.clone());
                    true
                }
                _ => false,
            };

            if !kept {
                fm.extra.insert(key, value.clone());
            }
        }

        fm
    }

    /// Render into a mapping in canonical key order, extras last.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();

        if let Some(ref t) = self.memory_type {
            metadata.insert(keys::TYPE, t.as_str());
        }
        metadata.insert(keys::TAGS, self.tags.clone());
        if let Some(created) = self.created {
            metadata.insert(keys::CREATED, created);
        }
        if let Some(last_accessed) = self.last_accessed {
            metadata.insert(keys::LAST_ACCESSED, last_accessed);
        }
        if let Some(importance) = self.importance {
            metadata.insert(keys::IMPORTANCE, importance.as_ref());
        }
        if !self.related.is_empty() {
            metadata.insert(keys::RELATED, self.related.clone());
        }
        if let Some(ref id) = self.conversation_id {
            metadata.insert(keys::CONVERSATION_ID, id.as_str());
        }
        if let Some(priority) = self.priority {
            metadata.insert(keys::PRIORITY, priority.as_ref());
        }
        for (key, value) in self.extra.iter() {
            if !metadata.contains_key(key) {
                metadata.insert(key, value.clone());
            }
        }

        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut m = Metadata::new();
        m.insert("a", "1");
        m.insert("b", true);
        m.insert("c", vec!["x", "y"]);

        let previous = m.insert("a", "2");
        assert_eq!(previous, Some(MetaValue::Text("1".to_string())));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(m.get_text("a"), Some("2"));
    }

    #[test]
    fn test_merge_overwrites_and_appends() {
        let mut m: Metadata = [("type", "facts"), ("importance", "medium")].into_iter().collect();
        let updates: Metadata = [("importance", "high"), ("priority", "urgent")].into_iter().collect();
        m.merge(updates);

        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["type", "importance", "priority"]);
        assert_eq!(m.get_text("importance"), Some("high"));
    }

    #[test]
    fn test_list_normalization() {
        let mut m = Metadata::new();
        m.insert("tags", "alpha, beta ,,gamma");
        assert_eq!(m.tags(), vec!["alpha", "beta", "gamma"]);

        m.insert("tags", vec!["one", " ", "two"]);
        assert_eq!(m.tags(), vec!["one", "two"]);

        m.insert("tags", true);
        assert!(m.tags().is_empty());
    }

    #[test]
    fn test_date_parsing_is_per_field() {
        let m: Metadata = [("created", "2024-01-10"), ("last_accessed", "yesterday")]
            .into_iter()
            .collect();

        assert_eq!(m.date("created"), NaiveDate::from_ymd_opt(2024, 1, 10));
        assert_eq!(m.date("last_accessed"), None);
        assert!(matches!(
            m.parse_date("last_accessed"),
            Err(MemoryError::MalformedMetadata { ref field, .. }) if field == "last_accessed"
        ));
        assert!(matches!(m.parse_date("missing"), Ok(None)));
    }

    #[test]
    fn test_typed_view_keeps_unknown_and_malformed_fields() {
        let m: Metadata = [
            ("type", MetaValue::from("facts")),
            ("tags", MetaValue::from(vec!["tools"])),
            ("created", MetaValue::from("2024-02-30")),
            ("importance", MetaValue::from("extreme")),
            ("source", MetaValue::from("chat")),
            ("pinned", MetaValue::from(true)),
        ]
        .into_iter()
        .collect();

        let fm = MemoryFrontmatter::from_metadata(&m);
        assert_eq!(fm.memory_type.as_deref(), Some("facts"));
        assert_eq!(fm.tags, vec!["tools"]);
        assert_eq!(fm.created, None);
        assert_eq!(fm.importance, None);
        assert_eq!(fm.extra.get_text("created"), Some("2024-02-30"));
        assert_eq!(fm.extra.get_text("importance"), Some("extreme"));
        assert_eq!(fm.extra.get_text("source"), Some("chat"));
        assert_eq!(fm.extra.get("pinned"), Some(&MetaValue::Flag(true)));
    }

    #[test]
    fn test_typed_view_canonical_order() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut extra = Metadata::new();
        extra.insert("source", "chat");

        let fm = MemoryFrontmatter {
            memory_type: Some("facts".to_string()),
            tags: vec!["tools".to_string()],
            created: Some(date),
            last_accessed: Some(date),
            importance: Some(Importance::High),
            related: vec![],
            conversation_id: Some("conv-1".to_string()),
            priority: Some(Priority::Urgent),
            extra,
        };

        let m = fm.to_metadata();
        assert_eq!(
            m.keys().collect::<Vec<_>>(),
            vec![
                "type",
                "tags",
                "created",
                "last_accessed",
                "importance",
                "conversation_id",
                "priority",
                "source"
            ]
        );
        assert_eq!(m.get_text("created"), Some("2024-03-01"));
        assert_eq!(MemoryFrontmatter::from_metadata(&m), fm);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let m: Metadata = [("z", MetaValue::from("1")), ("a", MetaValue::from(false))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"z":"1","a":false}"#);
    }
}
