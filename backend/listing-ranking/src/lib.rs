pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use config::{Config, RankingConfig};
pub use models::{EnrichedListing, GeoPoint, RawListing, ScoredListing, ViewerContext};
pub use pipeline::RankingPipeline;
pub use services::{EnrichmentLayer, ScoringLayer, TieredInterleaver};
