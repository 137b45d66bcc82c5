//! Health checks for the store and its search engine
//!
//! Every probe runs independently; a failure is recorded in `errors` and the
//! remaining probes still run.

use serde::Serialize;
use std::time::Duration;

use crate::config::{defaults, MemoryConfig};
use crate::memory::{file_ops, MemoryStore};
use crate::models::{Category, SearchMode};
use crate::search::{EngineQuery, SearchEngine};

const BYTES_PER_MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthReport {
    pub engine_accessible: bool,
    pub engine_version: Option<String>,
    pub directories_exist: bool,
    pub missing_directories: Vec<Category>,
    pub collection_initialized: bool,
    pub embeddings_work: bool,
    pub disk_usage_bytes: u64,
    pub disk_usage_mb: u64,
    pub errors: Vec<String>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct HealthMonitor<'a, E: SearchEngine> {
    store: &'a MemoryStore,
    engine: E,
    embed_probe_timeout: Duration,
}

impl<'a, E: SearchEngine> HealthMonitor<'a, E> {
    pub fn new(store: &'a MemoryStore, engine: E) -> Self {
        Self {
            store,
            engine,
            embed_probe_timeout: Duration::from_secs(defaults::EMBED_PROBE_TIMEOUT_SECS),
        }
    }

    pub fn from_config(store: &'a MemoryStore, engine: E, config: &MemoryConfig) -> Self {
        Self {
            store,
            engine,
            embed_probe_timeout: config.engine.embed_probe_timeout,
        }
    }

    pub fn check(&self) -> HealthReport {
        let mut report = HealthReport::default();

        match self.engine.version() {
            Ok(version) => {
                report.engine_accessible = true;
                report.engine_version = Some(version);
            }
            Err(e) => report.errors.push(format!("engine not accessible: {}", e)),
        }

        report.missing_directories = Category::all()
            .filter(|c| !self.store.category_dir(*c).is_dir())
            .collect();
        report.directories_exist = report.missing_directories.is_empty();
        if !report.directories_exist {
            let names: Vec<&str> = report.missing_directories.iter().map(|c| c.as_str()).collect();
            report.errors.push(format!("missing directories: {}", names.join(", ")));
        }

        let collection = self.engine.collection().to_string();
        match self.engine.collections() {
            Ok(listing) if listing.contains(&collection) => report.collection_initialized = true,
            Ok(_) => report.errors.push(format!("collection '{}' not found", collection)),
            Err(e) => report.errors.push(format!("cannot check collections: {}", e)),
        }

        let probe = EngineQuery::new("test", SearchMode::Semantic, 1).timeout(self.embed_probe_timeout);
        match self.engine.query(&probe) {
            Ok(_) => report.embeddings_work = true,
            Err(e) => report.errors.push(format!("embeddings check failed: {}", e)),
        }

        match file_ops::disk_usage(self.store.root()) {
            Ok(bytes) => {
                report.disk_usage_bytes = bytes;
                report.disk_usage_mb = bytes.div_ceil(BYTES_PER_MIB);
            }
            Err(e) => report.errors.push(format!("cannot check disk usage: {}", e)),
        }

        if report.is_healthy() {
            log::info!("[HEALTH] All checks passed");
        } else {
            log::warn!("[HEALTH] {} check(s) failed", report.errors.len());
        }
        report
    }
}
