use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;

use memory_backend::config::MemoryConfig;
use memory_backend::consolidate::suggest_groups;
use memory_backend::error::MemoryError;
use memory_backend::health::{HealthMonitor, HealthReport};
use memory_backend::memory::formatting::{format_memory_content, FormatContext, MemoryKind};
use memory_backend::memory::frontmatter::format_frontmatter;
use memory_backend::memory::{today, MemoryStore, NewMemory, SessionBridge};
use memory_backend::models::{keys, Category, Importance, Metadata, Priority, SearchMode, SearchResult};
use memory_backend::search::{EngineQuery, QmdEngine, SearchOrchestrator};
use memory_backend::temporal::{window_start, TemporalIndex};

#[derive(Parser)]
#[command(name = "memory", about = "File-backed memory store", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store root (overrides MEMORY_ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a memory
    Create {
        /// Category: facts, context, patterns, reflections or soul
        #[arg(long = "type")]
        category: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        content: String,

        /// Tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long, default_value = "medium")]
        importance: Importance,

        /// Related memory paths (comma-separated)
        #[arg(long, value_delimiter = ',')]
        related: Vec<String>,

        #[arg(long)]
        conversation_id: Option<String>,

        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Search memories
    Search {
        query: String,

        /// Use semantic search
        #[arg(long)]
        semantic: bool,

        /// Minimum similarity score (0.0-1.0)
        #[arg(long)]
        min_score: Option<f64>,

        #[arg(long, default_value = "5")]
        limit: usize,

        #[arg(long)]
        show_scores: bool,
    },

    /// Print a memory
    Get { path: PathBuf },

    /// Update memory metadata
    Update {
        path: PathBuf,

        #[arg(long)]
        importance: Option<Importance>,

        /// Replace tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Add a single tag
        #[arg(long)]
        add_tag: Option<String>,
    },

    /// Review recent memories
    Review {
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Show memories changed since a date
    Changes {
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day, conflicts_with = "since_last_synthesis")]
        since: Option<NaiveDate>,

        /// Use the latest synthesis reflection as the start date
        #[arg(long)]
        since_last_synthesis: bool,

        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Per-category counts
    Stats,

    /// Memories sharing tags
    Consolidate,

    /// Format a memory for retrieval
    Format {
        #[arg(long = "type")]
        kind: MemoryKind,

        #[arg(long)]
        topic: String,

        #[arg(long)]
        content: String,

        /// JSON context (user_name, importance, status, decision_context)
        #[arg(long)]
        context: Option<String>,

        /// Write the formatted memory to the store
        #[arg(long)]
        create: bool,
    },

    /// Find related memories
    Related {
        path: PathBuf,

        #[arg(long, default_value = "0.7")]
        min_score: f64,

        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Check store and engine health
    Health {
        #[arg(long)]
        json: bool,
    },

    /// Write a conversation bridge into context/
    CloseSession {
        conv_id: String,
        status: String,
        momentum: String,
        pending: String,
        markers: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error("invalid json in --context: {0}")]
    InvalidContext(serde_json::Error),
}

impl CliError {
    /// Argument errors exit non-zero; operational failures only print
    fn is_argument_error(&self) -> bool {
        matches!(
            self,
            CliError::InvalidContext(_)
                | CliError::Memory(MemoryError::InvalidCategory(_) | MemoryError::MissingField(_))
        )
    }
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = MemoryConfig::from_env();
    if let Some(root) = cli.root {
        config.root = root;
    }
    log::debug!("[MEMORY] Store root: {}", config.root.display());

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_argument_error() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

fn run(command: Commands, config: &MemoryConfig) -> Result<(), CliError> {
    let store = MemoryStore::from_config(config);

    match command {
        Commands::Create {
            category,
            name,
            content,
            tags,
            importance,
            related,
            conversation_id,
            priority,
        } => {
            let mut request = NewMemory::new(&category, &name, &content)
                .with_tags(tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))
                .with_importance(importance)
                .with_related(related.iter().map(|r| r.trim()).filter(|r| !r.is_empty()));
            request.conversation_id = conversation_id;
            request.priority = priority;

            let doc = store.create(request)?;
            println!("created memory: {}", doc.rel_path);
        }

        Commands::Search {
            query,
            semantic,
            min_score,
            limit,
            show_scores,
        } => {
            let mode = if semantic { SearchMode::Semantic } else { SearchMode::Lexical };
            let orchestrator = SearchOrchestrator::from_config(config, QmdEngine::new(config.engine.clone()));
            let query = EngineQuery::new(query, mode, limit)
                .min_score(min_score)
                .with_scores(show_scores);
            print_search_results(&orchestrator.search(&query), semantic);
        }

        Commands::Get { path } => {
            print!("{}", store.read(&path)?);
        }

        Commands::Update {
            path,
            importance,
            tags,
            add_tag,
        } => {
            let mut updates = Metadata::new();
            if let Some(importance) = importance {
                updates.insert(keys::IMPORTANCE, importance.as_ref());
            }
            if let Some(tags) = tags {
                let tags: Vec<String> = tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                updates.insert(keys::TAGS, tags);
            }

            let mut doc = store.update(&path, updates)?;
            if let Some(tag) = add_tag {
                doc = store.add_tag(&path, &tag)?;
            }
            println!("updated memory: {}", doc.rel_path);
        }

        Commands::Review { days } => {
            let recent = TemporalIndex::new(&store).recent(days);
            if recent.is_empty() {
                println!("no memories from last {} days", days);
                return Ok(());
            }

            println!("memories from last {} days:\n", days);
            for doc in recent {
                let tags = doc.metadata.tags().join(", ");
                println!("  [{}] {}", doc.memory_type().unwrap_or("unknown"), doc.rel_path);
                println!(
                    "    importance: {}",
                    doc.metadata.get_text(keys::IMPORTANCE).unwrap_or("medium")
                );
                if !tags.is_empty() {
                    println!("    tags: {}", tags);
                }
                println!();
            }
        }

        Commands::Changes {
            since,
            since_last_synthesis,
            days,
        } => {
            let index = TemporalIndex::new(&store);
            let anchor = if since_last_synthesis {
                match index.latest_synthesis_anchor() {
                    Some(anchor) => anchor,
                    None => {
                        println!("no synthesis reflections found");
                        return Ok(());
                    }
                }
            } else {
                since.unwrap_or_else(|| window_start(today(), days))
            };

            let changes = index.changed_since(anchor);
            if changes.is_empty() {
                println!("no memory changes since {}", anchor);
                return Ok(());
            }

            println!("memory changes since {}:\n", anchor);
            println!("summary:");
            for category in Category::all() {
                let count = changes.iter().filter(|c| c.category == category).count();
                println!("  {:15} {:3} changes", category.as_str(), count);
            }
            println!("  {:15} {:3} changes\n", "total:", changes.len());

            println!("changed memories:\n");
            let show = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string());
            for change in &changes {
                println!("  [{}] {}", change.category, change.rel_path);
                println!("    last_change:   {}", change.last_change);
                println!("    created:       {}", show(change.created));
                println!("    last_accessed: {}", show(change.last_accessed));
                println!();
            }
        }

        Commands::Stats => {
            let stats = store.stats();
            println!("memory stats:\n");
            for (category, count) in &stats.counts {
                println!("  {:15} {:3} memories", category.as_str(), count);
            }
            println!("\n  {:15} {:3} memories", "total:", stats.total);
        }

        Commands::Consolidate => {
            let groups = suggest_groups(&store);
            if groups.is_empty() {
                println!("no consolidation suggestions");
                return Ok(());
            }

            println!("consolidation suggestions:\n");
            for (tag, members) in &groups {
                println!("  tag '{}' ({} memories):", tag, members.len());
                for member in members {
                    println!("    - {}", member);
                }
                println!();
            }
        }

        Commands::Format {
            kind,
            topic,
            content,
            context,
            create,
        } => {
            let context = FormatContext::from_json(context.as_deref().unwrap_or(""))
                .map_err(CliError::InvalidContext)?;
            let formatted = format_memory_content(&content, kind, &topic, &context);

            println!("formatted memory:\n");
            println!("frontmatter:");
            println!("{}", format_frontmatter(&formatted.metadata));
            println!("\ncontent:");
            println!("{}", formatted.content);

            if create {
                let doc = store.store_formatted(&content, kind, &topic, &context)?;
                println!("\ncreated memory: {}", doc.rel_path);
            }
        }

        Commands::Related {
            path,
            min_score,
            limit,
        } => {
            let orchestrator = SearchOrchestrator::from_config(config, QmdEngine::new(config.engine.clone()));
            let related = orchestrator.find_related(&path, min_score, limit)?;
            if related.is_empty() {
                println!("no related memories found");
                return Ok(());
            }

            println!("found {} related memor(y/ies):\n", related.len());
            for result in &related {
                if result.is_explicit() {
                    println!("  [explicit] {}", result.path);
                } else {
                    println!("  [{:.3}] {}", result.score.unwrap_or_default(), result.path);
                }
            }
        }

        Commands::Health { json } => {
            let engine = QmdEngine::new(config.engine.clone());
            let report = HealthMonitor::from_config(&store, engine, config).check();
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(out) => println!("{}", out),
                    Err(e) => log::error!("[HEALTH] Failed to serialize report: {}", e),
                }
            } else {
                print_health(&report);
            }
        }

        Commands::CloseSession {
            conv_id,
            status,
            momentum,
            pending,
            markers,
        } => {
            let doc = store.close_session(&SessionBridge {
                conversation_id: conv_id,
                status,
                momentum,
                pending,
                markers,
            })?;
            println!("created conversation bridge: {}", doc.rel_path);
        }
    }

    Ok(())
}

fn print_search_results(results: &[SearchResult], semantic: bool) {
    if results.is_empty() {
        println!("no memories found");
        return;
    }

    let kind = if semantic { "semantic " } else { "" };
    println!("found {} {}match(es):\n", results.len(), kind);
    for result in results {
        match result.score {
            Some(score) => {
                println!("  [{:.3}] {}", score, result.path);
                if let Some(ref context) = result.context {
                    let snippet: String = context.chars().take(100).collect();
                    println!("      {}", snippet);
                }
            }
            None => println!("  {}", result.path),
        }
    }
}

fn print_health(report: &HealthReport) {
    let mark = |ok: bool| if ok { "ok  " } else { "FAIL" };

    println!("memory system health check:\n");
    println!("  {} engine accessible", mark(report.engine_accessible));
    if let Some(ref version) = report.engine_version {
        println!("       version: {}", version);
    }
    println!("  {} directories exist", mark(report.directories_exist));
    println!("  {} collection initialized", mark(report.collection_initialized));
    println!("  {} embeddings work", mark(report.embeddings_work));
    println!(
        "       disk usage: {} MB ({} bytes)",
        report.disk_usage_mb, report.disk_usage_bytes
    );

    if report.errors.is_empty() {
        println!("\n  no errors detected");
    } else {
        println!("\n  errors:");
        for error in &report.errors {
            println!("      - {}", error);
        }
    }
}
