//! Answer synthesis

pub mod backend;
pub mod synthesizer;

pub use backend::{OllamaBackend, SummaryBackend, SummaryInput, TemplateBackend};
pub use synthesizer::Synthesizer;
