//! File-backed memory storage
//!
//! Memories are markdown files with a frontmatter block, one directory per
//! category under the store root.

pub mod file_ops;
pub mod formatting;
pub mod frontmatter;
pub mod store;

pub use store::{MemoryStore, NewMemory, SessionBridge, StoreStats};

use chrono::{Local, NaiveDate};

/// Local calendar date, used for `created` / `last_accessed`
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
