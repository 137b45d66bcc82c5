use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Root directory holding one subdirectory per category
    pub const MEMORY_ROOT: &str = "MEMORY_ROOT";
    /// Search engine binary name or path
    pub const QMD_BIN: &str = "MEMORY_QMD_BIN";
    /// Engine collection the store is indexed under
    pub const QMD_COLLECTION: &str = "MEMORY_QMD_COLLECTION";
    pub const QUERY_TIMEOUT_SECS: &str = "MEMORY_QUERY_TIMEOUT_SECS";
    pub const PROBE_TIMEOUT_SECS: &str = "MEMORY_PROBE_TIMEOUT_SECS";
    pub const EMBED_PROBE_TIMEOUT_SECS: &str = "MEMORY_EMBED_PROBE_TIMEOUT_SECS";
    /// Number of body characters used as the query for related lookups
    pub const RELATED_QUERY_CHARS: &str = "MEMORY_RELATED_QUERY_CHARS";
    pub const HOME: &str = "HOME";
}

/// Default values
pub mod defaults {
    pub const MEMORY_DIR: &str = "workspace/Memory";
    pub const QMD_BIN: &str = "qmd";
    pub const QMD_COLLECTION: &str = "memory";
    pub const QUERY_TIMEOUT_SECS: u64 = 60;
    pub const PROBE_TIMEOUT_SECS: u64 = 5;
    pub const EMBED_PROBE_TIMEOUT_SECS: u64 = 10;
    pub const RELATED_QUERY_CHARS: usize = 500;
    /// Where bun installs global binaries, relative to $HOME
    pub const BUN_BIN_DIR: &str = ".bun/bin";
}

/// Configuration for the file-backed memory store and its search engine
#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub root: PathBuf,
    pub engine: EngineConfig,
    pub related_query_chars: usize,
}

/// How to reach the external search engine
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub binary: PathBuf,
    pub collection: String,
    pub query_timeout: Duration,
    pub probe_timeout: Duration,
    pub embed_probe_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(defaults::QMD_BIN),
            collection: defaults::QMD_COLLECTION.to_string(),
            query_timeout: Duration::from_secs(defaults::QUERY_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(defaults::PROBE_TIMEOUT_SECS),
            embed_probe_timeout: Duration::from_secs(defaults::EMBED_PROBE_TIMEOUT_SECS),
        }
    }
}

impl MemoryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (the process env in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup(env_vars::HOME).filter(|h| !h.is_empty()).map(PathBuf::from);

        let root = lookup(env_vars::MEMORY_ROOT)
            .filter(|r| !r.trim().is_empty())
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|h| h.join(defaults::MEMORY_DIR)))
            .unwrap_or_else(|| PathBuf::from("Memory"));

        let bin_name = lookup(env_vars::QMD_BIN)
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| defaults::QMD_BIN.to_string());

        let secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            root,
            engine: EngineConfig {
                binary: resolve_engine_binary(&bin_name, home.as_deref()),
                collection: lookup(env_vars::QMD_COLLECTION)
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| defaults::QMD_COLLECTION.to_string()),
                query_timeout: secs(env_vars::QUERY_TIMEOUT_SECS, defaults::QUERY_TIMEOUT_SECS),
                probe_timeout: secs(env_vars::PROBE_TIMEOUT_SECS, defaults::PROBE_TIMEOUT_SECS),
                embed_probe_timeout: secs(
                    env_vars::EMBED_PROBE_TIMEOUT_SECS,
                    defaults::EMBED_PROBE_TIMEOUT_SECS,
                ),
            },
            related_query_chars: lookup(env_vars::RELATED_QUERY_CHARS)
                .and_then(|v| v.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults::RELATED_QUERY_CHARS),
        }
    }
}

/// Find the engine binary on PATH, then in the bun global bin directory.
/// Falls back to the bare name so the spawn error names what was missing.
pub fn resolve_engine_binary(name: &str, home: Option<&std::path::Path>) -> PathBuf {
    if let Ok(found) = which::which(name) {
        return found;
    }

    if let Some(home) = home {
        let candidate = home.join(defaults::BUN_BIN_DIR).join(name);
        if candidate.is_file() {
            return candidate;
        }
    }

    PathBuf::from(name)
}
