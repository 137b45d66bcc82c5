//! Search orchestration: shapes requests for the engine, degrades engine
//! failures to empty results, and merges explicit relations with semantic
//! neighbours for related-document lookups.

use std::path::{Path, PathBuf};

use super::engine::{EngineQuery, SearchEngine};
use crate::config::{defaults, MemoryConfig};
use crate::error::Result;
use crate::memory::MemoryStore;
use crate::models::{keys, MetaValue, Relationship, SearchMode, SearchResult};

pub struct SearchOrchestrator<E: SearchEngine> {
    store: MemoryStore,
    engine: E,
    related_query_chars: usize,
}

impl<E: SearchEngine> SearchOrchestrator<E> {
    pub fn new(store: MemoryStore, engine: E) -> Self {
        Self {
            store,
            engine,
            related_query_chars: defaults::RELATED_QUERY_CHARS,
        }
    }

    pub fn from_config(config: &MemoryConfig, engine: E) -> Self {
        Self {
            store: MemoryStore::from_config(config),
            engine,
            related_query_chars: config.related_query_chars,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Run a query. Engine order is kept; results under the threshold are
    /// dropped and the rest truncated to `limit`. An unavailable engine
    /// yields no results.
    pub fn search(&self, query: &EngineQuery) -> Vec<SearchResult> {
        let results = match self.engine.query(query) {
            Ok(results) => results,
            Err(e) => {
                log::warn!("[SEARCH] {} query '{}' failed: {}", query.mode, query.text, e);
                return Vec::new();
            }
        };

        let results: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| match (query.min_score, r.score) {
                (Some(min), Some(score)) => score >= min,
                _ => true,
            })
            .take(query.limit)
            .collect();

        log::debug!(
            "[SEARCH] {} query '{}' returned {} result(s)",
            query.mode,
            query.text,
            results.len()
        );
        results
    }

    /// Documents related to `path`: its explicit `related` entries first (all of
    /// them, in frontmatter order), then semantic neighbours of its opening text
    /// filling whatever is left of `limit`.
    pub fn find_related(
        &self,
        path: impl AsRef<Path>,
        min_score: f64,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let source = self.store.load(path)?;

        let source_canonical = canonical(&source.path);
        let mut results = Vec::new();
        let mut explicit_refs = Vec::new();
        for entry in related_entries(source.metadata.get(keys::RELATED)) {
            let target = self.store.resolve(&entry);
            if canonical(&target) == source_canonical {
                log::debug!("[SEARCH] Ignoring self-reference in related of {}", source.rel_path);
            } else if target.is_file() {
                let rel = self.store.relative(&target);
                results.push(SearchResult::explicit(rel.clone()));
                explicit_refs.push(rel);
            } else {
                log::warn!(
                    "[SEARCH] Skipping dangling related entry '{}' in {}",
                    entry,
                    source.rel_path
                );
            }
        }

        let remaining = limit.saturating_sub(results.len());
        let query_text: String = source.body.chars().take(self.related_query_chars).collect();
        if remaining == 0 || query_text.trim().is_empty() {
            return Ok(results);
        }

        let query = EngineQuery::new(query_text, SearchMode::Semantic, limit.saturating_mul(2))
            .min_score(Some(min_score))
            .with_scores(true);

        let source_full = source.path.to_string_lossy().to_string();
        let source_name = source.path.file_name();

        let semantic = self
            .search(&query)
            .into_iter()
            .filter(|r| r.path != source_full && Path::new(&r.path).file_name() != source_name)
            .filter(|r| !explicit_refs.iter().any(|rel| refers_to(&r.path, rel)))
            .take(remaining)
            .map(|mut r| {
                r.relationship = Some(Relationship::Semantic);
                r
            });
        results.extend(semantic);

        log::info!(
            "[SEARCH] {} related to {} ({} explicit)",
            results.len(),
            source.rel_path,
            explicit_refs.len()
        );
        Ok(results)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// The `related` field as a list; a bare string is one entry
fn related_entries(value: Option<&MetaValue>) -> Vec<String> {
    match value {
        Some(MetaValue::Text(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Some(list @ MetaValue::List(_)) => list.to_list(),
        _ => Vec::new(),
    }
}

/// Engine paths may be absolute, store-relative or prefixed by the collection;
/// match on whole trailing path components.
fn refers_to(engine_path: &str, rel: &str) -> bool {
    engine_path == rel || Path::new(engine_path).ends_with(Path::new(rel))
}
