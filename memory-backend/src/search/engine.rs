//! External search engine boundary
//!
//! The engine is a black-box command (`qmd`) that ranks documents. Both
//! channels (lexical `search`, semantic `vsearch`) and both output shapes
//! (plain paths, scored `--files` lines) go through one request type.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

use crate::config::EngineConfig;
use crate::error::{MemoryError, Result};
use crate::models::{SearchMode, SearchResult};

/// One request to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineQuery {
    pub text: String,
    pub mode: SearchMode,
    pub min_score: Option<f64>,
    pub limit: usize,
    pub with_scores: bool,
    /// Overrides the engine's default query timeout
    pub timeout: Option<Duration>,
}

impl EngineQuery {
    pub fn new(text: impl Into<String>, mode: SearchMode, limit: usize) -> Self {
        Self {
            text: text.into(),
            mode,
            min_score: None,
            limit,
            with_scores: false,
            timeout: None,
        }
    }

    pub fn min_score(mut self, min_score: Option<f64>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_scores(mut self, with_scores: bool) -> Self {
        self.with_scores = with_scores;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Scored output is requested whenever scores are wanted or a threshold is set
    pub fn wants_scores(&self) -> bool {
        self.with_scores || self.min_score.is_some()
    }
}

pub trait SearchEngine {
    fn query(&self, query: &EngineQuery) -> Result<Vec<SearchResult>>;

    /// Engine version string
    fn version(&self) -> Result<String>;

    /// Raw collection listing
    fn collections(&self) -> Result<String>;

    /// Collection this engine searches
    fn collection(&self) -> &str;
}

impl<E: SearchEngine + ?Sized> SearchEngine for &E {
    fn query(&self, query: &EngineQuery) -> Result<Vec<SearchResult>> {
        (**self).query(query)
    }

    fn version(&self) -> Result<String> {
        (**self).version()
    }

    fn collections(&self) -> Result<String> {
        (**self).collections()
    }

    fn collection(&self) -> &str {
        (**self).collection()
    }
}

/// Subprocess client for the `qmd` command
#[derive(Debug, Clone)]
pub struct QmdEngine {
    config: EngineConfig,
}

impl QmdEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Command-line arguments for a query
    pub fn query_args(&self, query: &EngineQuery) -> Vec<String> {
        let subcommand = match query.mode {
            SearchMode::Lexical => "search",
            SearchMode::Semantic => "vsearch",
        };

        let mut args = vec![
            subcommand.to_string(),
            query.text.clone(),
            "-c".to_string(),
            self.config.collection.clone(),
        ];
        if let Some(min_score) = query.min_score {
            args.push("--min-score".to_string());
            args.push(min_score.to_string());
        }
        args.push("-n".to_string());
        args.push(query.limit.to_string());
        if query.wants_scores() {
            args.push("--files".to_string());
        }
        args
    }

    /// Run the engine and return stdout. Spawn failure, timeout and non-zero
    /// exit all map to `EngineUnavailable`.
    fn run(&self, args: &[String], timeout: Duration) -> Result<String> {
        let label = format!("{} {}", self.config.binary.display(), args.first().map(String::as_str).unwrap_or(""));
        log::debug!("[SEARCH] Running `{}` (timeout {:?})", label, timeout);

        let mut child = Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                MemoryError::EngineUnavailable(format!(
                    "failed to start {}: {}",
                    self.config.binary.display(),
                    e
                ))
            })?;

        // Drain both pipes while waiting; a full pipe would stall the child
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_stream(stdout));
        let stderr_reader = thread::spawn(move || read_stream(stderr));

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MemoryError::EngineUnavailable(format!(
                    "`{}` timed out after {}s",
                    label,
                    timeout.as_secs_f64()
                )));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MemoryError::EngineUnavailable(format!(
                    "failed waiting on `{}`: {}",
                    label, e
                )));
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(MemoryError::EngineUnavailable(format!(
                "`{}` exited with {}: {}",
                label,
                status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

impl SearchEngine for QmdEngine {
    fn query(&self, query: &EngineQuery) -> Result<Vec<SearchResult>> {
        let args = self.query_args(query);
        let timeout = query.timeout.unwrap_or(self.config.query_timeout);
        let stdout = self.run(&args, timeout)?;
        Ok(parse_output(&stdout, query.wants_scores()))
    }

    fn version(&self) -> Result<String> {
        let stdout = self.run(&["--version".to_string()], self.config.probe_timeout)?;
        Ok(stdout.trim().to_string())
    }

    fn collections(&self) -> Result<String> {
        self.run(
            &["collection".to_string(), "list".to_string()],
            self.config.probe_timeout,
        )
    }

    fn collection(&self) -> &str {
        &self.config.collection
    }
}

fn read_stream<R: Read>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        let _ = stream.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Normalize engine output. Scored output is `docid,score,path[,context]` per
/// line (the context may itself contain commas); plain output is one path per line.
pub fn parse_output(stdout: &str, scored: bool) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !scored {
            results.push(SearchResult::path_only(line));
            continue;
        }

        let parts: Vec<&str> = line.splitn(4, ',').collect();
        if parts.len() < 3 {
            log::debug!("[SEARCH] Skipping unscored line: {}", line);
            continue;
        }
        let score = match parts[1].trim().parse::<f64>() {
            Ok(score) => score,
            Err(_) => {
                log::debug!("[SEARCH] Skipping line with bad score: {}", line);
                continue;
            }
        };
        let context = parts
            .get(3)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        results.push(SearchResult::scored(parts[2].trim(), score, context));
    }

    results
}
