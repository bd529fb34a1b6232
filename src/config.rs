use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::UnknownSkillPolicy;
use crate::models::{ExperienceAggregation, ExperienceBands, MatchingWeights, ProfileRules};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub profile: ProfileSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub seed: SeedSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: u16,
    #[serde(default = "default_max_limit")]
    pub max_limit: u16,
    #[serde(default)]
    pub unknown_skills: UnknownSkillPolicy,
    /// Blocking-pool tasks used to score stale pairs
    #[serde(default = "default_scoring_workers")]
    pub scoring_workers: usize,
    #[serde(default = "default_max_rescore_attempts")]
    pub max_rescore_attempts: u32,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            unknown_skills: UnknownSkillPolicy::default(),
            scoring_workers: default_scoring_workers(),
            max_rescore_attempts: default_max_rescore_attempts(),
        }
    }
}

fn default_limit() -> u16 { 20 }
fn default_max_limit() -> u16 { 100 }
fn default_scoring_workers() -> usize { 4 }
fn default_max_rescore_attempts() -> u32 { 3 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
    #[serde(default)]
    pub bands: BandsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_required_weight")]
    pub required: f64,
    #[serde(default = "default_preferred_weight")]
    pub preferred: f64,
    #[serde(default = "default_preferred_bonus")]
    pub preferred_bonus: f64,
    #[serde(default = "default_experience_penalty")]
    pub experience_penalty: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            required: default_required_weight(),
            preferred: default_preferred_weight(),
            preferred_bonus: default_preferred_bonus(),
            experience_penalty: default_experience_penalty(),
        }
    }
}

fn default_required_weight() -> f64 { 3.0 }
fn default_preferred_weight() -> f64 { 1.0 }
fn default_preferred_bonus() -> f64 { 10.0 }
fn default_experience_penalty() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct BandsConfig {
    #[serde(default = "default_entry_max")]
    pub entry_max: f64,
    #[serde(default = "default_mid_max")]
    pub mid_max: f64,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            entry_max: default_entry_max(),
            mid_max: default_mid_max(),
        }
    }
}

fn default_entry_max() -> f64 { 2.0 }
fn default_mid_max() -> f64 { 5.0 }

impl ScoringSettings {
    pub fn weights(&self) -> MatchingWeights {
        MatchingWeights {
            required: self.weights.required,
            preferred: self.weights.preferred,
            preferred_bonus: self.weights.preferred_bonus,
            experience_penalty: self.weights.experience_penalty,
            bands: ExperienceBands {
                entry_max: self.bands.entry_max,
                mid_max: self.bands.mid_max,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSettings {
    #[serde(default)]
    pub aggregation: ExperienceAggregation,
    #[serde(default = "default_experience_ceiling")]
    pub experience_ceiling: f64,
    #[serde(default = "default_strengths_top_k")]
    pub strengths_top_k: usize,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            aggregation: ExperienceAggregation::default(),
            experience_ceiling: default_experience_ceiling(),
            strengths_top_k: default_strengths_top_k(),
        }
    }
}

fn default_experience_ceiling() -> f64 { 40.0 }
fn default_strengths_top_k() -> usize { 3 }

impl ProfileSettings {
    pub fn rules(&self) -> ProfileRules {
        ProfileRules {
            aggregation: self.aggregation,
            experience_ceiling: self.experience_ceiling,
            strengths_top_k: self.strengths_top_k,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: None,
        }
    }
}

fn default_cache_capacity() -> u64 { 100_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    /// Start from the built-in skill vocabulary
    #[serde(default = "default_true")]
    pub builtin_vocabulary: bool,
    pub skills_path: Option<PathBuf>,
    pub postings_path: Option<PathBuf>,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            builtin_vocabulary: true,
            skills_path: None,
            postings_path: None,
        }
    }
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with CAREER_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., CAREER__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("CAREER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_platform_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CAREER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Honour the conventional PORT and LOG_LEVEL variables set by hosting platforms
fn apply_platform_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(port) = env::var("PORT") {
        builder = builder.set_override("server.port", port)?;
    }
    if let Ok(level) = env::var("LOG_LEVEL") {
        builder = builder.set_override("logging.level", level)?;
    }

    builder.build()
}
