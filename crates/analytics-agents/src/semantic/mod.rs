//! Semantic retrieval over the knowledge base

pub mod knowledge;
pub mod retriever;

pub use knowledge::{KnowledgeBase, ScoredDocument};
pub use retriever::SemanticRetriever;
