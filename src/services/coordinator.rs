use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::config::Settings;
use crate::core::{
    order_matches, validate_salary, CatalogEntry, JobCatalog, Matcher, ProfileBuilder,
    SkillNormalizer, UnknownSkillPolicy,
};
use crate::error::EngineError;
use crate::models::{
    CandidateProfile, JobMatch, JobPosting, NamedSkillExperience, NewJobPosting, PostingId,
    ProfileId, ProfileStatus, Skill, SkillCategory, SkillExperience,
};
use crate::services::cache::{CacheStats, MatchCache, Stamp};

/// Stale pairs below this count are scored inline instead of on the blocking pool
const PARALLEL_THRESHOLD: usize = 64;

/// Runtime knobs of the coordinator
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub scoring_workers: usize,
    pub max_rescore_attempts: u32,
    pub unknown_skills: UnknownSkillPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            scoring_workers: 4,
            max_rescore_attempts: 3,
            unknown_skills: UnknownSkillPolicy::Register,
        }
    }
}

#[derive(Debug)]
struct ProfileEntry {
    profile: Arc<CandidateProfile>,
    generation: u64,
    status: ProfileStatus,
}

/// A page of ranked matches
#[derive(Debug, Clone, PartialEq)]
pub struct MatchPage {
    pub matches: Vec<JobMatch>,
    pub total: usize,
    pub next_offset: Option<usize>,
}

/// Engine-wide counters for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub skills: usize,
    pub postings: usize,
    pub profiles: usize,
    pub cache: CacheStats,
}

/// Inputs captured at the start of a refresh
#[derive(Debug)]
struct RefreshRun {
    profile: Arc<CandidateProfile>,
    generation: u64,
    epoch: u64,
    catalog_version: u64,
    fresh: Vec<ScoredPair>,
    stale: Vec<(Arc<JobPosting>, Stamp)>,
}

/// A scored pair with the posting and stamp it was computed from
pub type ScoredPair = (Arc<JobMatch>, Arc<JobPosting>, Stamp);

/// Matching engine and re-scoring coordinator
///
/// Owns the skill vocabulary, the job catalog, the profile store and the
/// match cache. Locks are always taken in that order: vocabulary, catalog,
/// profiles.
pub struct Engine {
    vocabulary: RwLock<SkillNormalizer>,
    catalog: RwLock<JobCatalog>,
    profiles: RwLock<HashMap<ProfileId, ProfileEntry>>,
    cache: MatchCache,
    matcher: Matcher,
    builder: ProfileBuilder,
    options: EngineOptions,
}

impl Engine {
    pub fn new(
        vocabulary: SkillNormalizer,
        matcher: Matcher,
        builder: ProfileBuilder,
        cache: MatchCache,
        options: EngineOptions,
    ) -> Self {
        Self {
            vocabulary: RwLock::new(vocabulary),
            catalog: RwLock::new(JobCatalog::new()),
            profiles: RwLock::new(HashMap::new()),
            cache,
            matcher,
            builder,
            options,
        }
    }

    /// Engine with default weights, rules and the built-in vocabulary
    pub fn with_defaults() -> Self {
        Self::new(
            SkillNormalizer::with_defaults(),
            Matcher::with_default_weights(),
            ProfileBuilder::default(),
            MatchCache::new(10_000, None),
            EngineOptions::default(),
        )
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let vocabulary = if settings.seed.builtin_vocabulary {
            SkillNormalizer::with_defaults()
        } else {
            SkillNormalizer::new()
        };

        Self::new(
            vocabulary,
            Matcher::new(settings.scoring.weights()),
            ProfileBuilder::new(settings.profile.rules()),
            MatchCache::new(settings.cache.capacity, settings.cache.ttl_secs),
            EngineOptions {
                scoring_workers: settings.matching.scoring_workers.max(1),
                max_rescore_attempts: settings.matching.max_rescore_attempts.max(1),
                unknown_skills: settings.matching.unknown_skills,
            },
        )
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    // ---- Vocabulary ------------------------------------------------------

    pub async fn register_skill(
        &self,
        canonical_name: &str,
        category: SkillCategory,
        aliases: &[String],
    ) -> Result<Skill, EngineError> {
        self.vocabulary
            .write()
            .await
            .register(canonical_name, category, aliases)
    }

    pub async fn normalize_skill(&self, raw: &str) -> Result<Skill, EngineError> {
        self.vocabulary.read().await.normalize(raw).cloned()
    }

    /// Explicitly move a skill to another category
    ///
    /// A real change invalidates every cached match and re-derives every
    /// profile, since categories feed experience totals.
    pub async fn recategorize_skill(
        &self,
        name: &str,
        category: SkillCategory,
    ) -> Result<Skill, EngineError> {
        let mut vocabulary = self.vocabulary.write().await;
        let epoch = vocabulary.epoch();
        let skill = vocabulary.recategorize(name, category)?;

        if vocabulary.epoch() != epoch {
            let catalog = self.catalog.read().await;
            let demand = catalog.category_demand(&vocabulary);
            let mut profiles = self.profiles.write().await;

            for entry in profiles.values_mut() {
                entry.profile = Arc::new(self.builder.rederive(&entry.profile, &vocabulary, &demand));
                entry.generation += 1;
                entry.status = ProfileStatus::Stale;
            }
            self.cache.invalidate_all();

            tracing::info!(
                "Vocabulary epoch {} -> {}: {} profiles marked stale",
                epoch,
                vocabulary.epoch(),
                profiles.len()
            );
        }

        Ok(skill)
    }

    /// Postings that list the named skill as required or preferred
    pub async fn postings_for_skill(&self, raw: &str) -> Result<(Skill, Vec<PostingId>), EngineError> {
        let vocabulary = self.vocabulary.read().await;
        let skill = vocabulary.normalize(raw)?.clone();
        let ids = self.catalog.read().await.by_skill(&skill.id);
        Ok((skill, ids.into_iter().collect()))
    }

    // ---- Profiles ----------------------------------------------------------

    /// Create a profile from extracted skill experiences
    pub async fn ingest_resume(
        &self,
        experiences: Vec<SkillExperience>,
    ) -> Result<CandidateProfile, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.store_profile(id, experiences, true).await
    }

    /// Create a profile from free-text skill names
    ///
    /// Skills registered while resolving the names are kept only when the
    /// profile is stored.
    pub async fn ingest_resume_named(
        &self,
        entries: Vec<NamedSkillExperience>,
    ) -> Result<CandidateProfile, EngineError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.store_named_profile(id, entries, true).await
    }

    /// Replace a profile's skills (re-upload)
    pub async fn update_profile(
        &self,
        profile_id: &str,
        experiences: Vec<SkillExperience>,
    ) -> Result<CandidateProfile, EngineError> {
        self.store_profile(profile_id.to_string(), experiences, false)
            .await
    }

    pub async fn update_profile_named(
        &self,
        profile_id: &str,
        entries: Vec<NamedSkillExperience>,
    ) -> Result<CandidateProfile, EngineError> {
        self.store_named_profile(profile_id.to_string(), entries, false)
            .await
    }

    async fn store_profile(
        &self,
        id: ProfileId,
        experiences: Vec<SkillExperience>,
        create: bool,
    ) -> Result<CandidateProfile, EngineError> {
        let vocabulary = self.vocabulary.read().await;
        let catalog = self.catalog.read().await;
        let demand = catalog.category_demand(&vocabulary);
        let profile = self
            .builder
            .build(id, experiences, &vocabulary, &demand, Utc::now())?;

        let mut profiles = self.profiles.write().await;
        put_profile(&mut profiles, profile, create)
    }

    /// Resolve names against a staged copy of the vocabulary, which replaces
    /// the live one only once the profile is stored
    async fn store_named_profile(
        &self,
        id: ProfileId,
        entries: Vec<NamedSkillExperience>,
        create: bool,
    ) -> Result<CandidateProfile, EngineError> {
        let mut vocabulary = self.vocabulary.write().await;
        let mut staged = vocabulary.clone();
        let experiences = resolve_experiences(&mut staged, entries, self.options.unknown_skills)?;

        let catalog = self.catalog.read().await;
        let demand = catalog.category_demand(&staged);
        let profile = self
            .builder
            .build(id, experiences, &staged, &demand, Utc::now())?;

        let mut profiles = self.profiles.write().await;
        let profile = put_profile(&mut profiles, profile, create)?;

        if staged.len() != vocabulary.len() {
            tracing::debug!("Registered {} skills from profile {}", staged.len() - vocabulary.len(), profile.id);
        }
        *vocabulary = staged;
        Ok(profile)
    }

    pub async fn get_profile(&self, profile_id: &str) -> Result<CandidateProfile, EngineError> {
        self.profiles
            .read()
            .await
            .get(profile_id)
            .map(|entry| entry.profile.as_ref().clone())
            .ok_or_else(|| EngineError::NotFound(format!("profile '{}'", profile_id)))
    }

    pub async fn profile_status(&self, profile_id: &str) -> Result<ProfileStatus, EngineError> {
        self.profiles
            .read()
            .await
            .get(profile_id)
            .map(|entry| entry.status)
            .ok_or_else(|| EngineError::NotFound(format!("profile '{}'", profile_id)))
    }

    // ---- Catalog -----------------------------------------------------------

    /// Normalize and add or replace postings
    ///
    /// Every posting is validated before anything is written. Cached matches
    /// of the touched postings are dropped and every profile becomes stale.
    pub async fn ingest_postings(
        &self,
        postings: Vec<NewJobPosting>,
    ) -> Result<Vec<PostingId>, EngineError> {
        for posting in &postings {
            validate_salary(&posting.id, &posting.salary_range)?;
        }

        // Unknown names are registered on a staged copy, kept only if the
        // catalog accepts the whole batch
        let mut vocabulary = self.vocabulary.write().await;
        let mut staged = vocabulary.clone();
        let normalized = postings
            .into_iter()
            .map(|posting| self.normalize_posting(&mut staged, posting))
            .collect::<Result<Vec<_>, _>>()?;

        let mut catalog = self.catalog.write().await;
        let ids = catalog.ingest(normalized)?;
        *vocabulary = staged;

        self.after_catalog_change(&vocabulary, &catalog, &ids).await;
        tracing::info!("Ingested {} postings (catalog size {})", ids.len(), catalog.len());
        Ok(ids)
    }

    fn normalize_posting(
        &self,
        vocabulary: &mut SkillNormalizer,
        posting: NewJobPosting,
    ) -> Result<JobPosting, EngineError> {
        let policy = self.options.unknown_skills;
        let required = vocabulary.resolve_all(&posting.required_skills, policy)?;
        let preferred = vocabulary.resolve_all(&posting.preferred_skills, policy)?;

        let required_skills: std::collections::BTreeSet<_> = required.into_iter().collect();
        let preferred_skills = preferred
            .into_iter()
            .filter(|id| {
                let duplicate = required_skills.contains(id);
                if duplicate {
                    tracing::debug!("Posting {}: {} is required, dropping it from preferred", posting.id, id);
                }
                !duplicate
            })
            .collect();

        Ok(JobPosting {
            id: posting.id,
            company_name: posting.company_name,
            job_title: posting.job_title,
            description: posting.description,
            required_skills,
            preferred_skills,
            experience_level: posting.experience_level,
            location: posting.location,
            employment_type: posting.employment_type,
            salary_range: posting.salary_range,
            benefits: posting.benefits,
            posted_at: posting.posted_at,
            application_url: posting.application_url,
        })
    }

    pub async fn remove_posting(&self, posting_id: &str) -> Result<(), EngineError> {
        let vocabulary = self.vocabulary.read().await;
        let mut catalog = self.catalog.write().await;
        catalog.remove(posting_id)?;

        self.after_catalog_change(&vocabulary, &catalog, &[posting_id.to_string()])
            .await;
        tracing::info!("Removed posting {} (catalog size {})", posting_id, catalog.len());
        Ok(())
    }

    pub async fn get_posting(&self, posting_id: &str) -> Result<JobPosting, EngineError> {
        self.catalog
            .read()
            .await
            .get(posting_id)
            .map(|posting| posting.as_ref().clone())
    }

    /// Mark every profile stale and drop cached pairs of the touched postings
    ///
    /// Profile generations are left alone: cached pairs of untouched
    /// postings stay valid.
    async fn after_catalog_change(
        &self,
        vocabulary: &SkillNormalizer,
        catalog: &JobCatalog,
        touched: &[PostingId],
    ) {
        let demand = catalog.category_demand(vocabulary);
        let mut profiles = self.profiles.write().await;

        for (profile_id, entry) in profiles.iter_mut() {
            entry.profile = Arc::new(self.builder.rederive(&entry.profile, vocabulary, &demand));
            entry.status = ProfileStatus::Stale;
            for posting_id in touched {
                self.cache.invalidate(profile_id, posting_id).await;
            }
        }
    }

    // ---- Matching ----------------------------------------------------------

    /// Ranked matches for a profile, paginated
    pub async fn get_matches(
        &self,
        profile_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<JobMatch>, EngineError> {
        Ok(self.get_match_page(profile_id, limit, offset).await?.matches)
    }

    pub async fn get_match_page(
        &self,
        profile_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<MatchPage, EngineError> {
        if limit == 0 {
            return Err(EngineError::Validation("limit must be at least 1".to_string()));
        }

        let scored = self.refresh(profile_id).await?;
        let total = scored.len();

        let ranked = order_matches(
            scored
                .into_iter()
                .map(|(job_match, posting, _)| (job_match.as_ref().clone(), posting))
                .collect(),
        );

        let matches: Vec<JobMatch> = ranked.into_iter().skip(offset).take(limit).collect();
        let end = offset.saturating_add(matches.len());
        let next_offset = (end < total).then_some(end);

        Ok(MatchPage {
            matches,
            total,
            next_offset,
        })
    }

    /// Bring every pair of a profile up to date, retrying superseded runs
    pub async fn refresh(&self, profile_id: &str) -> Result<Vec<ScoredPair>, EngineError> {
        let attempts = self.options.max_rescore_attempts.max(1);

        for attempt in 1..=attempts {
            match self.try_refresh(profile_id).await {
                Err(EngineError::ScoringConflict(_)) => {
                    tracing::debug!(
                        "Re-scoring of {} superseded (attempt {}/{}), retrying",
                        profile_id,
                        attempt,
                        attempts
                    );
                }
                result => return result,
            }
        }

        tracing::warn!("Giving up re-scoring {} after {} attempts", profile_id, attempts);
        Err(EngineError::ScoringConflict(profile_id.to_string()))
    }

    async fn try_refresh(&self, profile_id: &str) -> Result<Vec<ScoredPair>, EngineError> {
        let run = self.begin_refresh(profile_id).await?;
        let computed = match self.score_pairs(run.profile.clone(), run.stale.clone()).await {
            Ok(computed) => computed,
            Err(e) => {
                self.abandon_refresh(profile_id, run.generation).await;
                return Err(e);
            }
        };
        self.commit_refresh(profile_id, run, computed).await
    }

    /// Snapshot the inputs of a refresh and split pairs into cached and stale
    async fn begin_refresh(&self, profile_id: &str) -> Result<RefreshRun, EngineError> {
        let (epoch, catalog_version, entries, profile, generation) = {
            let vocabulary = self.vocabulary.read().await;
            let catalog = self.catalog.read().await;
            let mut profiles = self.profiles.write().await;
            let entry = profiles
                .get_mut(profile_id)
                .ok_or_else(|| EngineError::NotFound(format!("profile '{}'", profile_id)))?;

            if entry.status == ProfileStatus::Stale {
                entry.status = ProfileStatus::Scoring;
            }

            (
                vocabulary.epoch(),
                catalog.version(),
                catalog.snapshot(),
                entry.profile.clone(),
                entry.generation,
            )
        };

        let mut fresh: Vec<ScoredPair> = Vec::with_capacity(entries.len());
        let mut stale: Vec<(Arc<JobPosting>, Stamp)> = Vec::new();

        for CatalogEntry { posting, revision } in entries {
            let stamp = Stamp {
                profile_generation: generation,
                posting_revision: revision,
                vocabulary_epoch: epoch,
            };
            match self.cache.get_fresh(profile_id, &posting.id, stamp).await {
                Some(job_match) => fresh.push((job_match, posting, stamp)),
                None => stale.push((posting, stamp)),
            }
        }

        Ok(RefreshRun {
            profile,
            generation,
            epoch,
            catalog_version,
            fresh,
            stale,
        })
    }

    /// Publish scored pairs unless an input changed since the snapshot
    async fn commit_refresh(
        &self,
        profile_id: &str,
        run: RefreshRun,
        computed: Vec<ScoredPair>,
    ) -> Result<Vec<ScoredPair>, EngineError> {
        // Writers are excluded until the cache holds the results, so a newer
        // entry is never overwritten
        let vocabulary = self.vocabulary.read().await;
        let catalog = self.catalog.read().await;
        let mut profiles = self.profiles.write().await;
        let entry = profiles
            .get_mut(profile_id)
            .ok_or_else(|| EngineError::NotFound(format!("profile '{}'", profile_id)))?;

        if entry.generation != run.generation
            || vocabulary.epoch() != run.epoch
            || catalog.version() != run.catalog_version
        {
            tracing::debug!("Discarding {} superseded matches for {}", computed.len(), profile_id);
            return Err(EngineError::ScoringConflict(profile_id.to_string()));
        }

        for (job_match, _, stamp) in &computed {
            self.cache.insert(*stamp, job_match.clone()).await;
        }
        entry.status = ProfileStatus::Fresh;

        tracing::debug!(
            "Profile {} fresh: {} pairs from cache, {} re-scored",
            profile_id,
            run.fresh.len(),
            computed.len()
        );

        let mut scored = run.fresh;
        scored.extend(computed);
        Ok(scored)
    }

    /// Put a profile whose scoring failed back to `Stale`
    async fn abandon_refresh(&self, profile_id: &str, generation: u64) {
        let mut profiles = self.profiles.write().await;
        if let Some(entry) = profiles.get_mut(profile_id) {
            if entry.generation == generation && entry.status == ProfileStatus::Scoring {
                entry.status = ProfileStatus::Stale;
            }
        }
    }

    /// Score pairs from read-only snapshots, spreading large batches over
    /// the blocking pool
    async fn score_pairs(
        &self,
        profile: Arc<CandidateProfile>,
        pairs: Vec<(Arc<JobPosting>, Stamp)>,
    ) -> Result<Vec<ScoredPair>, EngineError> {
        let matcher = self.matcher;
        let score = move |profile: &CandidateProfile, (posting, stamp): (Arc<JobPosting>, Stamp)| {
            (Arc::new(matcher.score(profile, &posting)), posting, stamp)
        };

        let workers = self.options.scoring_workers.max(1);
        if workers == 1 || pairs.len() < PARALLEL_THRESHOLD {
            return Ok(pairs.into_iter().map(|pair| score(&profile, pair)).collect());
        }

        let chunk_size = pairs.len().div_ceil(workers);
        let mut pairs = pairs.into_iter();
        let mut tasks = JoinSet::new();

        loop {
            let chunk: Vec<_> = pairs.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let profile = profile.clone();
            tasks.spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|pair| score(&profile, pair))
                    .collect::<Vec<_>>()
            });
        }

        let mut scored = Vec::new();
        while let Some(result) = tasks.join_next().await {
            let chunk = result.map_err(|e| EngineError::TaskFailed(e.to_string()))?;
            scored.extend(chunk);
        }
        Ok(scored)
    }

    pub async fn stats(&self) -> EngineStats {
        let skills = self.vocabulary.read().await.len();
        let postings = self.catalog.read().await.len();
        let profiles = self.profiles.read().await.len();

        EngineStats {
            skills,
            postings,
            profiles,
            cache: self.cache.stats(),
        }
    }
}

fn resolve_experiences(
    vocabulary: &mut SkillNormalizer,
    entries: Vec<NamedSkillExperience>,
    policy: UnknownSkillPolicy,
) -> Result<Vec<SkillExperience>, EngineError> {
    let mut experiences = Vec::with_capacity(entries.len());

    for entry in entries {
        let ids = vocabulary.resolve_all(std::slice::from_ref(&entry.name), policy)?;
        if let Some(skill_id) = ids.into_iter().next() {
            experiences.push(SkillExperience {
                skill_id,
                experience_years: entry.experience_years,
                proficiency: entry.proficiency,
            });
        }
    }

    Ok(experiences)
}

/// Insert a new profile or replace an existing one, bumping its generation
fn put_profile(
    profiles: &mut HashMap<ProfileId, ProfileEntry>,
    profile: CandidateProfile,
    create: bool,
) -> Result<CandidateProfile, EngineError> {
    match profiles.get_mut(&profile.id) {
        Some(entry) => {
            entry.profile = Arc::new(profile.clone());
            entry.generation += 1;
            entry.status = ProfileStatus::Stale;
            tracing::info!(
                "Profile {} updated ({} skills, generation {})",
                profile.id,
                profile.skills.len(),
                entry.generation
            );
        }
        None if create => {
            profiles.insert(
                profile.id.clone(),
                ProfileEntry {
                    profile: Arc::new(profile.clone()),
                    generation: 1,
                    status: ProfileStatus::Stale,
                },
            );
            tracing::info!("Profile {} created ({} skills)", profile.id, profile.skills.len());
        }
        None => return Err(EngineError::NotFound(format!("profile '{}'", profile.id))),
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmploymentType, ExperienceLevel, Proficiency, SalaryRange};
    use chrono::NaiveDate;

    fn new_posting(id: &str, required: &[&str], preferred: &[&str]) -> NewJobPosting {
        NewJobPosting {
            id: id.to_string(),
            company_name: "Future Tech".to_string(),
            job_title: "Engineer".to_string(),
            description: String::new(),
            required_skills: required.iter().map(|s| s.to_string()).collect(),
            preferred_skills: preferred.iter().map(|s| s.to_string()).collect(),
            experience_level: ExperienceLevel::Entry,
            location: "Tokyo".to_string(),
            employment_type: EmploymentType::FullTime,
            salary_range: SalaryRange {
                min: 4_000_000,
                max: 6_000_000,
                currency: "JPY".to_string(),
            },
            benefits: vec![],
            posted_at: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            application_url: String::new(),
        }
    }

    fn named(name: &str, years: f64, proficiency: Proficiency) -> NamedSkillExperience {
        NamedSkillExperience {
            name: name.to_string(),
            experience_years: years,
            proficiency,
        }
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React"], &[])])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("react", 1.0, Proficiency::Intermediate)])
            .await
            .unwrap();

        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);

        engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Fresh);

        engine
            .ingest_postings(vec![new_posting("2", &["Python"], &[])])
            .await
            .unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);
    }

    #[tokio::test]
    async fn test_fresh_pairs_served_from_cache() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![
                new_posting("1", &["React"], &[]),
                new_posting("2", &["Python"], &[]),
            ])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();

        engine.get_matches(&profile.id, 10, 0).await.unwrap();
        let after_first = engine.stats().await.cache;
        assert_eq!(after_first.hit_count, 0);

        // Adding a posting only re-scores the new pair
        engine
            .ingest_postings(vec![new_posting("3", &["CSS"], &[])])
            .await
            .unwrap();
        engine.get_matches(&profile.id, 10, 0).await.unwrap();

        let after_second = engine.stats().await.cache;
        assert_eq!(after_second.hit_count, 2);
        assert_eq!(after_second.miss_count - after_first.miss_count, 1);
    }

    #[tokio::test]
    async fn test_update_unknown_profile_is_not_found() {
        let engine = Engine::with_defaults();
        let result = engine.update_profile("nope", vec![]).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ingest_postings_validates_before_writing() {
        let engine = Engine::with_defaults();
        let mut bad = new_posting("2", &["Elm"], &[]);
        bad.salary_range.min = 10_000_000;

        let result = engine
            .ingest_postings(vec![new_posting("1", &["React"], &[]), bad])
            .await;

        assert!(matches!(result, Err(EngineError::InvalidRange { .. })));
        assert_eq!(engine.stats().await.postings, 0);
        // Unknown skills of a rejected batch are not registered
        assert!(engine.normalize_skill("elm").await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_posting_registers_no_skills() {
        let engine = Engine::with_defaults();
        let skills = engine.stats().await.skills;

        let result = engine
            .ingest_postings(vec![new_posting("  ", &["Haskell"], &[])])
            .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(engine.stats().await.postings, 0);
        assert_eq!(engine.stats().await.skills, skills);
        assert!(engine.normalize_skill("haskell").await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_resume_registers_no_skills() {
        let engine = Engine::with_defaults();
        let skills = engine.stats().await.skills;

        let result = engine
            .ingest_resume_named(vec![
                named("COBOL", 1.0, Proficiency::Beginner),
                named("React", -1.0, Proficiency::Intermediate),
            ])
            .await;

        assert!(matches!(result, Err(EngineError::InvalidExperience { .. })));
        assert_eq!(engine.stats().await.profiles, 0);
        assert_eq!(engine.stats().await.skills, skills);
        assert!(engine.normalize_skill("cobol").await.is_err());

        // The same names are kept once a profile is stored
        engine
            .ingest_resume_named(vec![named("COBOL", 1.0, Proficiency::Beginner)])
            .await
            .unwrap();
        assert_eq!(engine.normalize_skill("cobol").await.unwrap().id, "cobol");
    }

    #[tokio::test]
    async fn test_update_during_scoring_discards_results() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React"], &[])])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();

        let run = engine.begin_refresh(&profile.id).await.unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Scoring);
        let (_, old_stamp) = run.stale[0].clone();

        engine
            .update_profile_named(&profile.id, vec![named("Python", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();

        let computed = engine
            .score_pairs(run.profile.clone(), run.stale.clone())
            .await
            .unwrap();
        assert_eq!(computed[0].0.match_score, 90.0);

        let result = engine.commit_refresh(&profile.id, run, computed).await;
        assert!(matches!(result, Err(EngineError::ScoringConflict(_))));
        assert!(engine.cache.get_fresh(&profile.id, "1", old_stamp).await.is_none());
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);

        let matches = engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(matches[0].match_score, 0.0);
        assert!(matches[0].missing_skills.contains("react"));
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Fresh);
    }

    #[tokio::test]
    async fn test_failed_scoring_returns_profile_to_stale() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React"], &[])])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();

        let run = engine.begin_refresh(&profile.id).await.unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Scoring);

        engine.abandon_refresh(&profile.id, run.generation).await;
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);

        let matches = engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(matches[0].match_score, 90.0);
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Fresh);
    }

    #[tokio::test]
    async fn test_required_wins_over_preferred() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React", "TS"], &["typescript", "AWS"])])
            .await
            .unwrap();

        let posting = engine.get_posting("1").await.unwrap();
        assert!(posting.required_skills.contains("typescript"));
        assert!(!posting.preferred_skills.contains("typescript"));
        assert!(posting.preferred_skills.contains("aws"));
    }

    #[tokio::test]
    async fn test_parallel_scoring_matches_inline_scoring() {
        let parallel = Engine::with_defaults();
        let inline = Engine::new(
            SkillNormalizer::with_defaults(),
            Matcher::with_default_weights(),
            ProfileBuilder::default(),
            MatchCache::new(1_000, None),
            EngineOptions {
                scoring_workers: 1,
                ..EngineOptions::default()
            },
        );

        let postings: Vec<NewJobPosting> = (0..200)
            .map(|i| {
                let required: &[&str] = match i % 4 {
                    0 => &["React", "CSS"],
                    1 => &["Python", "Pandas"],
                    2 => &["Node.js"],
                    _ => &["AWS", "Docker", "Linux"],
                };
                new_posting(&format!("job-{:03}", i), required, &["TypeScript"])
            })
            .collect();

        let skills = vec![
            named("React", 1.0, Proficiency::Advanced),
            named("TypeScript", 1.0, Proficiency::Intermediate),
            named("Docker", 1.0, Proficiency::Beginner),
        ];

        let mut results = Vec::new();
        for engine in [&parallel, &inline] {
            engine.ingest_postings(postings.clone()).await.unwrap();
            let profile = engine.ingest_resume_named(skills.clone()).await.unwrap();
            let matches = engine.get_matches(&profile.id, 500, 0).await.unwrap();
            results.push(
                matches
                    .into_iter()
                    .map(|m| (m.job_posting_id, m.match_score, m.reasoning))
                    .collect::<Vec<_>>(),
            );
        }

        assert_eq!(results[0].len(), 200);
        assert_eq!(results[0], results[1]);
    }

    #[tokio::test]
    async fn test_removed_posting_never_returned() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![
                new_posting("1", &["React"], &[]),
                new_posting("2", &["React", "CSS"], &[]),
            ])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();
        assert_eq!(engine.get_matches(&profile.id, 10, 0).await.unwrap().len(), 2);

        engine.remove_posting("1").await.unwrap();

        let matches = engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].job_posting_id, "2");
        assert!(matches!(
            engine.remove_posting("1").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_noop_update_is_bit_identical() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![
                new_posting("1", &["React", "TypeScript"], &["AWS"]),
                new_posting("2", &["Python"], &[]),
            ])
            .await
            .unwrap();
        let skills = vec![
            named("React", 3.0, Proficiency::Expert),
            named("AWS", 1.0, Proficiency::Beginner),
        ];
        let profile = engine.ingest_resume_named(skills.clone()).await.unwrap();
        let before = engine.get_matches(&profile.id, 10, 0).await.unwrap();

        engine.update_profile_named(&profile.id, skills).await.unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);

        let after = engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_recategorize_invalidates_every_match() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React"], &[])])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();
        engine.get_matches(&profile.id, 10, 0).await.unwrap();

        engine
            .recategorize_skill("react", SkillCategory::Programming)
            .await
            .unwrap();
        assert_eq!(engine.profile_status(&profile.id).await.unwrap(), ProfileStatus::Stale);
        let profile = engine.get_profile(&profile.id).await.unwrap();
        assert!(profile
            .experience_by_category
            .contains_key(&SkillCategory::Programming));

        let misses = engine.stats().await.cache.miss_count;
        engine.get_matches(&profile.id, 10, 0).await.unwrap();
        assert_eq!(engine.stats().await.cache.miss_count, misses + 1);
    }

    #[tokio::test]
    async fn test_pagination() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(
                (0..5)
                    .map(|i| new_posting(&i.to_string(), &["React"], &[]))
                    .collect(),
            )
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("React", 1.0, Proficiency::Advanced)])
            .await
            .unwrap();

        let first = engine.get_match_page(&profile.id, 2, 0).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.matches.len(), 2);
        assert_eq!(first.next_offset, Some(2));

        let last = engine.get_match_page(&profile.id, 2, 4).await.unwrap();
        assert_eq!(last.matches.len(), 1);
        assert_eq!(last.next_offset, None);
    }

    #[tokio::test]
    async fn test_zero_limit_is_rejected() {
        let engine = Engine::with_defaults();
        engine
            .ingest_postings(vec![new_posting("1", &["React"], &[]), new_posting("2", &["CSS"], &[])])
            .await
            .unwrap();
        let profile = engine
            .ingest_resume_named(vec![named("react", 1.0, Proficiency::Intermediate)])
            .await
            .unwrap();

        let result = engine.get_match_page(&profile.id, 0, 0).await;
        assert!(matches!(result, Err(EngineError::Validation(_))));

        let page = engine.get_match_page(&profile.id, 1, 0).await.unwrap();
        assert_eq!(page.next_offset, Some(1));
    }
}
