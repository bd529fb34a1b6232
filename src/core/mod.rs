// Core algorithm exports
pub mod catalog;
pub mod matcher;
pub mod normalizer;
pub mod profile;
pub mod scoring;

pub use catalog::{validate_salary, CatalogEntry, CategoryDemand, JobCatalog};
pub use matcher::{compare_ranked, order_matches, Matcher};
pub use normalizer::{fold_skill_name, skill_id_for, SkillNormalizer, UnknownSkillPolicy};
pub use profile::ProfileBuilder;
pub use scoring::{build_reasoning, calculate_match_score, MatchFactor, ScoreBreakdown};
