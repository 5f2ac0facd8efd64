// Export modules for library usage
pub mod classifier;
pub mod cli;
pub mod config;
pub mod errors;
pub mod fetcher;
pub mod history;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod score;
pub mod summary;

// Re-export commonly used types
pub use crate::config::{Config, KeywordConfig, LlmConfig, Settings};
pub use crate::errors::{Error, Result};
pub use crate::models::{ClassifiedRepo, RepoMetadata, ScoredRepo};

pub use crate::classifier::Classifier;
pub use crate::fetcher::TrendingFetcher;
pub use crate::history::{History, HistoryStore, RepoHistory};
pub use crate::llm::{Commentary, LlmClient};
pub use crate::pipeline::{Pipeline, PipelineOutcome};
pub use crate::report::ReportRenderer;
pub use crate::score::{calculate_scores, rank_and_select_top};
pub use crate::summary::{Summary, SummaryBuilder};
