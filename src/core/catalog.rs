use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::core::normalizer::SkillNormalizer;
use crate::error::EngineError;
use crate::models::{JobPosting, PostingId, SalaryRange, SkillCategory, SkillId};

/// Number of postings requiring at least one skill of each category
pub type CategoryDemand = BTreeMap<SkillCategory, usize>;

/// A stored posting with the catalog revision it was written at
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub posting: Arc<JobPosting>,
    pub revision: u64,
}

/// Job catalog with an inverted skill index
#[derive(Debug, Default)]
pub struct JobCatalog {
    postings: BTreeMap<PostingId, CatalogEntry>,
    required_index: HashMap<SkillId, BTreeSet<PostingId>>,
    preferred_index: HashMap<SkillId, BTreeSet<PostingId>>,
    next_revision: u64,
    version: u64,
}

/// Reject salary ranges whose bounds are inverted
pub fn validate_salary(posting_id: &str, range: &SalaryRange) -> Result<(), EngineError> {
    if range.min > range.max {
        return Err(EngineError::InvalidRange {
            posting_id: posting_id.to_string(),
            min: range.min,
            max: range.max,
        });
    }
    Ok(())
}

fn validate(posting: &JobPosting) -> Result<(), EngineError> {
    validate_salary(&posting.id, &posting.salary_range)?;

    if posting.id.trim().is_empty() {
        return Err(EngineError::Validation("posting id must not be empty".to_string()));
    }

    if let Some(skill) = posting
        .required_skills
        .intersection(&posting.preferred_skills)
        .next()
    {
        return Err(EngineError::Validation(format!(
            "posting '{}' lists '{}' as both required and preferred",
            posting.id, skill
        )));
    }

    Ok(())
}

fn index_skills(
    index: &mut HashMap<SkillId, BTreeSet<PostingId>>,
    skills: &BTreeSet<SkillId>,
    posting_id: &str,
) {
    for skill in skills {
        index
            .entry(skill.clone())
            .or_default()
            .insert(posting_id.to_string());
    }
}

fn unindex_skills(
    index: &mut HashMap<SkillId, BTreeSet<PostingId>>,
    skills: &BTreeSet<SkillId>,
    posting_id: &str,
) {
    for skill in skills {
        if let Some(ids) = index.get_mut(skill) {
            ids.remove(posting_id);
            if ids.is_empty() {
                index.remove(skill);
            }
        }
    }
}

impl JobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate every posting, then add or replace each one
    ///
    /// Nothing is written when any posting is invalid.
    pub fn ingest(&mut self, postings: Vec<JobPosting>) -> Result<Vec<PostingId>, EngineError> {
        for posting in &postings {
            validate(posting)?;
        }

        let mut ids = Vec::with_capacity(postings.len());
        for posting in postings {
            ids.push(posting.id.clone());
            self.insert(posting);
        }

        tracing::debug!("Ingested {} postings (catalog size {})", ids.len(), self.len());
        Ok(ids)
    }

    /// Add or replace a single posting, returning its revision
    pub fn add(&mut self, posting: JobPosting) -> Result<u64, EngineError> {
        validate(&posting)?;
        Ok(self.insert(posting))
    }

    fn insert(&mut self, posting: JobPosting) -> u64 {
        if let Some(previous) = self.postings.remove(&posting.id) {
            self.unindex(&previous.posting);
        }

        index_skills(&mut self.required_index, &posting.required_skills, &posting.id);
        index_skills(&mut self.preferred_index, &posting.preferred_skills, &posting.id);

        self.next_revision += 1;
        self.version += 1;
        let revision = self.next_revision;

        self.postings.insert(
            posting.id.clone(),
            CatalogEntry {
                posting: Arc::new(posting),
                revision,
            },
        );
        revision
    }

    /// Remove a posting and drop it from the index
    pub fn remove(&mut self, posting_id: &str) -> Result<Arc<JobPosting>, EngineError> {
        let entry = self
            .postings
            .remove(posting_id)
            .ok_or_else(|| EngineError::NotFound(format!("posting '{}'", posting_id)))?;

        self.unindex(&entry.posting);
        self.version += 1;
        Ok(entry.posting)
    }

    fn unindex(&mut self, posting: &JobPosting) {
        unindex_skills(&mut self.required_index, &posting.required_skills, &posting.id);
        unindex_skills(&mut self.preferred_index, &posting.preferred_skills, &posting.id);
    }

    /// Rebuild both inverted indexes from scratch
    pub fn rebuild_index(&mut self) {
        self.required_index.clear();
        self.preferred_index.clear();

        for (id, entry) in &self.postings {
            index_skills(&mut self.required_index, &entry.posting.required_skills, id);
            index_skills(&mut self.preferred_index, &entry.posting.preferred_skills, id);
        }
    }

    /// Postings that list the skill as required or preferred
    pub fn by_skill(&self, skill_id: &str) -> BTreeSet<PostingId> {
        let mut ids = self.requiring(skill_id);
        if let Some(preferred) = self.preferred_index.get(skill_id) {
            ids.extend(preferred.iter().cloned());
        }
        ids
    }

    /// Postings that list the skill as required
    pub fn requiring(&self, skill_id: &str) -> BTreeSet<PostingId> {
        self.required_index
            .get(skill_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get(&self, posting_id: &str) -> Result<&Arc<JobPosting>, EngineError> {
        self.postings
            .get(posting_id)
            .map(|entry| &entry.posting)
            .ok_or_else(|| EngineError::NotFound(format!("posting '{}'", posting_id)))
    }

    pub fn entry(&self, posting_id: &str) -> Option<&CatalogEntry> {
        self.postings.get(posting_id)
    }

    /// Cheap copy of every entry, in posting id order
    pub fn snapshot(&self) -> Vec<CatalogEntry> {
        self.postings.values().cloned().collect()
    }

    /// Per-category count of postings that require a skill of that category
    pub fn category_demand(&self, vocabulary: &SkillNormalizer) -> CategoryDemand {
        let mut demand = CategoryDemand::new();
        for entry in self.postings.values() {
            let categories: BTreeSet<SkillCategory> = entry
                .posting
                .required_skills
                .iter()
                .map(|id| vocabulary.category_of(id).unwrap_or(SkillCategory::Other))
                .collect();
            for category in categories {
                *demand.entry(category).or_insert(0) += 1;
            }
        }
        demand
    }

    /// Monotonic counter bumped on every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}
