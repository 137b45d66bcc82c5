pub mod category;
pub mod document;
pub mod metadata;
pub mod search;

pub use category::{Category, Importance, Priority};
pub use document::{ChangeRecord, Document};
pub use metadata::{keys, MemoryFrontmatter, MetaValue, Metadata, DATE_FORMAT};
pub use search::{Relationship, SearchMode, SearchResult};
