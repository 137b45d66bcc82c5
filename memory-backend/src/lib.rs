//! File-backed memory store
//!
//! Markdown documents with a frontmatter block, organized into fixed category
//! directories, retrievable through an external lexical/semantic search
//! engine, explicit `related` links and date-window queries.

pub mod config;
pub mod consolidate;
pub mod error;
pub mod health;
pub mod memory;
pub mod models;
pub mod search;
pub mod temporal;

pub use config::MemoryConfig;
pub use error::{MemoryError, Result};
pub use memory::{MemoryStore, NewMemory};
