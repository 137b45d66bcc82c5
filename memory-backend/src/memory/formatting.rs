//! Retrieval-oriented formatting: front-load the kind and topic so the first
//! characters of a memory carry the most signal for the search engine.

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::{today, MemoryStore};
use crate::error::Result;
use crate::models::{keys, Category, Document, Importance, Metadata, DATE_FORMAT};

/// Raw content beyond this many characters is dropped from the template
pub const MAX_RAW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MemoryKind {
    Preference,
    Technical,
    Decision,
    Project,
    Pattern,
    ConversationBridge,
    Consciousness,
    MetaPattern,
    Principle,
}

impl MemoryKind {
    /// Storage category a formatted memory of this kind lands in
    pub fn category(&self) -> Category {
        match self {
            MemoryKind::Preference
            | MemoryKind::Technical
            | MemoryKind::Decision
            | MemoryKind::Principle => Category::Facts,
            MemoryKind::Project | MemoryKind::ConversationBridge => Category::Context,
            MemoryKind::Pattern | MemoryKind::MetaPattern | MemoryKind::Consciousness => {
                Category::Patterns
            }
        }
    }

    fn default_importance(&self) -> Importance {
        match self {
            MemoryKind::Decision | MemoryKind::Project | MemoryKind::MetaPattern => Importance::High,
            MemoryKind::ConversationBridge => Importance::High,
            MemoryKind::Principle => Importance::Critical,
            _ => Importance::Medium,
        }
    }

    /// Kinds whose importance is fixed regardless of caller context
    fn importance_is_fixed(&self) -> bool {
        matches!(
            self,
            MemoryKind::ConversationBridge
                | MemoryKind::Consciousness
                | MemoryKind::MetaPattern
                | MemoryKind::Principle
        )
    }
}

/// Optional caller context, usually parsed from a JSON argument
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FormatContext {
    pub user_name: Option<String>,
    pub importance: Option<Importance>,
    pub status: Option<String>,
    pub decision_context: Option<String>,
}

impl FormatContext {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMemory {
    pub kind: MemoryKind,
    pub content: String,
    pub metadata: Metadata,
}

/// Build the one-line content and metadata for a memory of `kind`
pub fn format_memory_content(
    raw: &str,
    kind: MemoryKind,
    topic: &str,
    context: &FormatContext,
) -> FormattedMemory {
    let now = today().format(DATE_FORMAT).to_string();
    let raw: String = raw.chars().take(MAX_RAW_CHARS).collect();
    let topic_tag = topic.to_lowercase();
    let status = context.status.as_deref().unwrap_or("active");

    let (content, tags): (String, Vec<String>) = match kind {
        MemoryKind::Preference => (
            format!(
                "PREFERENCE - {}: {}. Noted {}. Applies to similar situations and related decisions.",
                topic, raw, now
            ),
            vec![
                topic_tag,
                "preference".into(),
                context.user_name.clone().unwrap_or_else(|| "user".into()),
            ],
        ),
        MemoryKind::Technical => (
            format!(
                "TECHNICAL - {}: {}. Documented {} for future reference and troubleshooting.",
                topic, raw, now
            ),
            vec![topic_tag, "technical".into(), "reference".into()],
        ),
        MemoryKind::Decision => (
            format!(
                "DECISION - {}: {}. Decided {}. Context: {}.",
                topic,
                raw,
                now,
                context.decision_context.as_deref().unwrap_or("project evolution")
            ),
            vec![topic_tag, "decision".into(), "rationale".into()],
        ),
        MemoryKind::Project => (
            format!("PROJECT - {} [{}]: {}. Last updated {}.", topic, status, raw, now),
            vec![topic_tag, "project".into(), status.to_string()],
        ),
        MemoryKind::Pattern => (
            format!(
                "PATTERN - {}: {}. Observed {}. Generalizes to similar contexts.",
                topic, raw, now
            ),
            vec![topic_tag, "pattern".into(), "learning".into()],
        ),
        MemoryKind::ConversationBridge => (
            format!("BRIDGE - {}: {}. Created {} for session continuity.", topic, raw, now),
            vec!["bridge".into(), "continuity".into(), topic_tag],
        ),
        MemoryKind::Consciousness => (
            format!("CONSCIOUSNESS - {}: {}. Reflected {}.", topic, raw, now),
            vec![topic_tag, "self-awareness".into(), "meta".into()],
        ),
        MemoryKind::MetaPattern => (
            format!(
                "META-PATTERN - {}: {}. Identified {}. Applies across multiple contexts.",
                topic, raw, now
            ),
            vec![topic_tag, "meta-pattern".into(), "high-level".into()],
        ),
        MemoryKind::Principle => (
            format!(
                "PRINCIPLE - {}: {}. Established {}. Foundational for future decisions.",
                topic, raw, now
            ),
            vec![topic_tag, "principle".into(), "core".into()],
        ),
    };

    let importance = match context.importance {
        Some(importance) if !kind.importance_is_fixed() => importance,
        _ => kind.default_importance(),
    };

    let mut metadata = Metadata::new();
    metadata.insert(keys::TYPE, kind.as_ref());
    metadata.insert(keys::TAGS, tags);
    metadata.insert(keys::CREATED, now.as_str());
    metadata.insert(keys::LAST_ACCESSED, now.as_str());
    metadata.insert(keys::IMPORTANCE, importance.as_ref());

    FormattedMemory {
        kind,
        content,
        metadata,
    }
}

impl MemoryStore {
    /// Format and write a memory to `<kind category>/<slug(topic)>.md`
    pub fn store_formatted(
        &self,
        raw: &str,
        kind: MemoryKind,
        topic: &str,
        context: &FormatContext,
    ) -> Result<Document> {
        let formatted = format_memory_content(raw, kind, topic, context);
        log::debug!("[MEMORY] Formatted {} memory for topic '{}'", kind, topic);
        self.store_raw(kind.category(), topic, formatted.metadata, &formatted.content)
    }
}
