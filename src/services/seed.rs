use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SeedSettings;
use crate::error::EngineError;
use crate::models::{NewJobPosting, SkillCategory};
use crate::services::coordinator::Engine;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Vocabulary seed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSeed {
    pub canonical_name: String,
    pub category: SkillCategory,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Counts of what was loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub skills: usize,
    pub postings: usize,
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SeedError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Register every skill of a vocabulary seed file
pub async fn load_vocabulary(engine: &Engine, path: &Path) -> Result<usize, SeedError> {
    let seeds: Vec<SkillSeed> = read_json(path).await?;

    for seed in &seeds {
        engine
            .register_skill(&seed.canonical_name, seed.category, &seed.aliases)
            .await?;
    }

    tracing::info!("Loaded {} skills from {}", seeds.len(), path.display());
    Ok(seeds.len())
}

/// Ingest a posting seed file as a single batch
pub async fn load_postings(engine: &Engine, path: &Path) -> Result<usize, SeedError> {
    let postings: Vec<NewJobPosting> = read_json(path).await?;
    let ids = engine.ingest_postings(postings).await?;

    tracing::info!("Loaded {} postings from {}", ids.len(), path.display());
    Ok(ids.len())
}

/// Load every configured seed file, vocabulary first
pub async fn load_seeds(engine: &Engine, settings: &SeedSettings) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    if let Some(path) = &settings.skills_path {
        summary.skills = load_vocabulary(engine, path).await?;
    }
    if let Some(path) = &settings.postings_path {
        summary.postings = load_postings(engine, path).await?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("data/seed").join(name)
    }

    #[tokio::test]
    async fn test_load_bundled_seeds() {
        let engine = Engine::with_defaults();
        let settings = SeedSettings {
            builtin_vocabulary: true,
            skills_path: Some(seed_path("skills.json")),
            postings_path: Some(seed_path("postings.json")),
        };

        let summary = load_seeds(&engine, &settings).await.unwrap();

        assert!(summary.skills > 0);
        assert_eq!(summary.postings, 8);
        assert_eq!(engine.stats().await.postings, 8);

        let posting = engine.get_posting("6").await.unwrap();
        assert!(posting.required_skills.contains("agile-development"));
        assert!(posting.required_skills.contains("team-leadership"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let engine = Engine::with_defaults();
        let result = load_postings(&engine, Path::new("does/not/exist.json")).await;
        assert!(matches!(result, Err(SeedError::Io { .. })));
    }

    #[test]
    fn test_skill_seed_format() {
        let seed: SkillSeed = serde_json::from_str(
            r#"{"canonicalName": "Rust", "category": "Programming", "aliases": ["rust-lang"]}"#,
        )
        .unwrap();
        assert_eq!(seed.category, SkillCategory::Programming);
        assert_eq!(seed.aliases, vec!["rust-lang"]);
    }
}
