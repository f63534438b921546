/// Ranking Module
///
/// Scores enriched listings for the storefront list.
///
/// # Architecture
/// - **Relevance**: weighted sum of proximity, delivery speed, SLA, rating and promotion
/// - **Business tiers**: flat boosts for open, featured, sponsored and new listings
/// - **Rotation**: hourly deterministic jitter so near-tied listings take turns
pub mod scorer;

pub use scorer::{BoostConfig, ScoreWeights, ScoringLayer};
