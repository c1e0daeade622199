//! Collection analysis pipeline
//!
//! Ties per-photo extraction, global clustering, refinement and
//! summarization together behind [`AnalysisPipeline::analyze_collection`].

pub mod cache;
pub mod orchestrator;
pub mod progress;

pub use cache::{AnalysisCache, InMemoryCache};
pub use orchestrator::{AnalysisPipeline, PhotoSource};
pub use progress::{AnalysisProgress, CancellationToken, ProgressThrottler, ProgressTracker};
