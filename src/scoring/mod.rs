//! Diversity and engagement scores derived from plays and enrichment facets.

mod mood;
mod quality;
mod tag_analyzer;
mod variety;

pub use mood::{aggregate_mood, MoodSummary};
pub use quality::{quality_score, summarize_engagement, EngagementSummary};
pub use tag_analyzer::{estimate_mood, EstimatedMood};
pub use variety::{variety_score, VarietyScore, MAX_VARIETY_TOP_N};
