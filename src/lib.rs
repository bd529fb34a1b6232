//! Career Match - skill-based job matching engine
//!
//! Normalizes résumé skills against a controlled vocabulary, derives
//! candidate profiles, and ranks job postings by skill coverage with
//! explainable reasoning. Computed matches are cached and re-scored only
//! when their profile, posting or vocabulary changes.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Matcher, ProfileBuilder, SkillNormalizer};
pub use error::EngineError;
pub use models::{CandidateProfile, JobMatch, JobPosting, NewJobPosting, SkillCategory};
pub use services::Engine;
