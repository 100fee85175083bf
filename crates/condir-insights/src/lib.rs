//! Sales-note enrichment for harvested contractors.
//!
//! [`InsightsClient`] asks a chat-completions endpoint for a short note per
//! contractor; [`evaluate_insight`] scores stored notes with fixed heuristics.

pub mod client;
pub mod error;
pub mod evaluate;
pub mod prompt;

pub use client::InsightsClient;
pub use error::InsightsError;
pub use evaluate::{evaluate_insight, EvaluatedInsight, InsightScores, ScoreAverages};
pub use prompt::{ContractorContext, SYSTEM_PROMPT};
