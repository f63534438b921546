pub mod enrichment;
pub mod interleave;
pub mod ranking;

pub use enrichment::EnrichmentLayer;
pub use interleave::TieredInterleaver;
pub use ranking::ScoringLayer;
