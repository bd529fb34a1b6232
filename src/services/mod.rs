// Service exports
pub mod cache;
pub mod coordinator;
pub mod seed;

pub use cache::{CacheKey, CacheStats, MatchCache, Stamp};
pub use coordinator::{Engine, EngineOptions, EngineStats, MatchPage};
pub use seed::{load_postings, load_seeds, load_vocabulary, SeedError, SeedSummary, SkillSeed};
