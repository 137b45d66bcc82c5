//! Time-window queries over the store
//!
//! Dates are read per field and best-effort: a missing or malformed `created`
//! or `last_accessed` only removes that field from consideration.

use chrono::{NaiveDate, TimeDelta};
use regex::Regex;
use std::sync::LazyLock;

use crate::memory::{today, MemoryStore};
use crate::models::{keys, Category, ChangeRecord, Document};

/// Tag marking a reflection as a periodic synthesis
pub const SYNTHESIS_TAG: &str = "synthesis";

static DATE_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());

/// First day of a `days`-long window ending on `today`. Windows reaching past
/// the representable range start at `NaiveDate::MIN`.
pub fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days.max(0))
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

pub struct TemporalIndex<'a> {
    store: &'a MemoryStore,
}

impl<'a> TemporalIndex<'a> {
    pub fn new(store: &'a MemoryStore) -> Self {
        Self { store }
    }

    /// Documents created or accessed in the last `days` days, today included
    pub fn recent(&self, days: i64) -> Vec<Document> {
        self.recent_from(today(), days)
    }

    /// `recent` relative to an explicit `today`
    pub fn recent_from(&self, today: NaiveDate, days: i64) -> Vec<Document> {
        let start = window_start(today, days);
        let in_window = |date: Option<NaiveDate>| date.is_some_and(|d| d >= start && d <= today);

        let mut docs: Vec<Document> = self
            .store
            .scan()
            .into_iter()
            .filter(|doc| {
                in_window(doc.metadata.date(keys::CREATED))
                    || in_window(doc.metadata.date(keys::LAST_ACCESSED))
            })
            .collect();

        // Raw string order; a missing value sorts last. Stable, so ties keep scan order.
        docs.sort_by(|a, b| last_accessed_raw(b).cmp(last_accessed_raw(a)));

        log::debug!("[TEMPORAL] {} document(s) in the last {} day(s)", docs.len(), days);
        docs
    }

    /// Documents whose latest known date is on or after `anchor`, newest first
    pub fn changed_since(&self, anchor: NaiveDate) -> Vec<ChangeRecord> {
        let mut records: Vec<ChangeRecord> = self
            .store
            .scan()
            .into_iter()
            .filter_map(change_record)
            .filter(|record| record.last_change >= anchor)
            .collect();

        records.sort_by(|a, b| b.last_change.cmp(&a.last_change));

        log::debug!("[TEMPORAL] {} document(s) changed since {}", records.len(), anchor);
        records
    }

    /// Date of the most recent synthesis reflection, if any
    pub fn latest_synthesis_anchor(&self) -> Option<NaiveDate> {
        let anchor = self
            .store
            .documents(Category::Reflections)
            .iter()
            .filter(|doc| doc.metadata.tags().iter().any(|t| t == SYNTHESIS_TAG))
            .filter_map(|doc| doc.metadata.date(keys::CREATED).or_else(|| date_in_file_name(doc)))
            .max();

        match anchor {
            Some(date) => log::debug!("[TEMPORAL] Last synthesis on {}", date),
            None => log::debug!("[TEMPORAL] No synthesis reflections found"),
        }
        anchor
    }
}

fn last_accessed_raw(doc: &Document) -> &str {
    doc.metadata.get_text(keys::LAST_ACCESSED).unwrap_or("")
}

fn change_record(doc: Document) -> Option<ChangeRecord> {
    let created = doc.metadata.date(keys::CREATED);
    let last_accessed = doc.metadata.date(keys::LAST_ACCESSED);
    let last_change = created.max(last_accessed)?;

    // The `type` field classifies; fall back to the directory when it is not a category
    let category = doc
        .memory_type()
        .and_then(|t| Category::from_name(t).ok())
        .unwrap_or(doc.category);

    Some(ChangeRecord {
        path: doc.path,
        rel_path: doc.rel_path,
        category,
        created,
        last_accessed,
        last_change,
    })
}

fn date_in_file_name(doc: &Document) -> Option<NaiveDate> {
    let name = doc.path.file_name()?.to_string_lossy();
    let found = DATE_IN_NAME.find(&name)?;
    NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{date, write_fixture};
    use crate::models::MetaValue;
    use tempfile::tempdir;

    fn dated(created: &str, last_accessed: &str) -> Vec<(&'static str, MetaValue)> {
        let mut fields = Vec::new();
        if !created.is_empty() {
            fields.push(("created", MetaValue::from(created)));
        }
        if !last_accessed.is_empty() {
            fields.push(("last_accessed", MetaValue::from(last_accessed)));
        }
        fields
    }

    #[test]
    fn test_recent_window_and_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(root, "facts/old.md", &dated("2024-01-01", "2024-01-02"), "old");
        write_fixture(root, "facts/edge.md", &dated("2024-03-03", ""), "edge");
        write_fixture(root, "context/touched.md", &dated("2023-06-01", "2024-03-09"), "touched");
        write_fixture(root, "patterns/fresh.md", &dated("2024-03-10", "2024-03-10"), "fresh");
        write_fixture(root, "soul/future.md", &dated("2024-04-01", "2024-04-01"), "future");
        write_fixture(root, "facts/bad.md", &dated("yesterday", "2024-03-05"), "bad");

        let store = MemoryStore::new(root);
        let recent = TemporalIndex::new(&store).recent_from(date(2024, 3, 10), 7);
        let names: Vec<&str> = recent.iter().map(|d| d.rel_path.as_str()).collect();

        assert_eq!(
            names,
            vec!["patterns/fresh.md", "context/touched.md", "facts/bad.md", "facts/edge.md"]
        );
    }

    #[test]
    fn test_recent_window_start_is_inclusive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(root, "facts/boundary.md", &dated("2024-03-03", ""), "on the edge");
        write_fixture(root, "facts/outside.md", &dated("2024-03-02", ""), "one day out");

        let store = MemoryStore::new(root);
        let recent = TemporalIndex::new(&store).recent_from(date(2024, 3, 10), 7);
        let names: Vec<&str> = recent.iter().map(|d| d.rel_path.as_str()).collect();
        assert_eq!(names, vec!["facts/boundary.md"]);
    }

    #[test]
    fn test_recent_huge_window_covers_everything() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(root, "facts/ancient.md", &dated("1901-01-01", ""), "ancient");
        write_fixture(root, "facts/new.md", &dated("2024-03-09", ""), "new");

        let store = MemoryStore::new(root);
        let recent = TemporalIndex::new(&store).recent_from(date(2024, 3, 10), 1_000_000_000);
        assert_eq!(recent.len(), 2);
        let recent = TemporalIndex::new(&store).recent_from(date(2024, 3, 10), i64::MAX);
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(date(2024, 3, 10), 7), date(2024, 3, 3));
        assert_eq!(window_start(date(2024, 3, 10), 0), date(2024, 3, 10));
        assert_eq!(window_start(date(2024, 3, 10), -5), date(2024, 3, 10));
        assert_eq!(window_start(date(2024, 3, 10), 1_000_000_000), NaiveDate::MIN);
        assert_eq!(window_start(date(2024, 3, 10), i64::MAX), NaiveDate::MIN);
    }

    #[test]
    fn test_changed_since_anchor_is_inclusive() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(root, "facts/on-anchor.md", &dated("2024-01-01", "2024-02-01"), "a");
        write_fixture(root, "facts/before.md", &dated("2024-01-31", ""), "b");

        let store = MemoryStore::new(root);
        let changes = TemporalIndex::new(&store).changed_since(date(2024, 2, 1));
        let names: Vec<&str> = changes.iter().map(|c| c.rel_path.as_str()).collect();
        assert_eq!(names, vec!["facts/on-anchor.md"]);
        assert_eq!(changes[0].last_change, date(2024, 2, 1));
    }

    #[test]
    fn test_changed_since() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(root, "facts/a.md", &dated("2024-01-01", "2024-02-15"), "a");
        write_fixture(root, "facts/b.md", &dated("2024-03-01", ""), "b");
        write_fixture(root, "facts/c.md", &dated("2023-12-31", "2024-01-31"), "c");
        write_fixture(root, "facts/undated.md", &[], "no dates");
        write_fixture(root, "facts/broken.md", &dated("soon", "later"), "unparseable");

        let store = MemoryStore::new(root);
        let changes = TemporalIndex::new(&store).changed_since(date(2024, 2, 1));

        let names: Vec<&str> = changes.iter().map(|c| c.rel_path.as_str()).collect();
        assert_eq!(names, vec!["facts/b.md", "facts/a.md"]);
        assert_eq!(changes[0].last_change, date(2024, 3, 1));
        assert_eq!(changes[0].last_accessed, None);
        assert_eq!(changes[1].last_change, date(2024, 2, 15));
        assert_eq!(changes[1].created, Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_changed_since_category_follows_type() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut fields = dated("2024-05-01", "");
        fields.push(("type", MetaValue::from("soul")));
        write_fixture(root, "facts/values.md", &fields, "x");

        let mut fields = dated("2024-05-01", "");
        fields.push(("type", MetaValue::from("preference")));
        write_fixture(root, "context/pref.md", &fields, "y");

        let store = MemoryStore::new(root);
        let changes = TemporalIndex::new(&store).changed_since(date(2024, 1, 1));
        // same date, so scan order holds: facts/ before context/
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].category, Category::Soul);
        assert_eq!(changes[1].category, Category::Context);
    }

    #[test]
    fn test_latest_synthesis_anchor() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let store = MemoryStore::new(root);
        assert_eq!(TemporalIndex::new(&store).latest_synthesis_anchor(), None);

        write_fixture(
            root,
            "reflections/january.md",
            &[
                ("tags", MetaValue::from(vec!["synthesis", "monthly"])),
                ("created", MetaValue::from("2024-01-10")),
            ],
            "jan",
        );
        write_fixture(
            root,
            "reflections/march.md",
            &[
                ("tags", MetaValue::from("weekly, synthesis")),
                ("created", MetaValue::from("2024-03-01")),
            ],
            "mar",
        );
        // untagged reflections and synthesis tags elsewhere do not count
        write_fixture(
            root,
            "reflections/later.md",
            &[("created", MetaValue::from("2024-06-01"))],
            "untagged",
        );
        write_fixture(
            root,
            "facts/synthesis-notes.md",
            &[
                ("tags", MetaValue::from(vec!["synthesis"])),
                ("created", MetaValue::from("2024-07-01")),
            ],
            "wrong category",
        );

        assert_eq!(
            TemporalIndex::new(&store).latest_synthesis_anchor(),
            Some(date(2024, 3, 1))
        );
    }

    #[test]
    fn test_synthesis_anchor_from_file_name() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write_fixture(
            root,
            "reflections/synthesis-2024-04-15.md",
            &[("tags", MetaValue::from(vec!["synthesis"]))],
            "no created field",
        );
        write_fixture(
            root,
            "reflections/feb.md",
            &[
                ("tags", MetaValue::from(vec!["synthesis"])),
                ("created", MetaValue::from("2024-02-01")),
            ],
            "feb",
        );

        let store = MemoryStore::new(root);
        assert_eq!(
            TemporalIndex::new(&store).latest_synthesis_anchor(),
            Some(date(2024, 4, 15))
        );
    }
}
