//! Retrieval through the external search engine

pub mod engine;
pub mod orchestrator;

pub use engine::{EngineQuery, QmdEngine, SearchEngine};
pub use orchestrator::SearchOrchestrator;
