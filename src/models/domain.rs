use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub type SkillId = String;
pub type ProfileId = String;
pub type PostingId = String;

/// Closed skill category vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillCategory {
    Programming,
    Frontend,
    Backend,
    Database,
    Cloud,
    DevOps,
    Mobile,
    DataScience,
    Design,
    Tools,
    Management,
    Other,
}

impl SkillCategory {
    pub const ALL: [SkillCategory; 12] = [
        SkillCategory::Programming,
        SkillCategory::Frontend,
        SkillCategory::Backend,
        SkillCategory::Database,
        SkillCategory::Cloud,
        SkillCategory::DevOps,
        SkillCategory::Mobile,
        SkillCategory::DataScience,
        SkillCategory::Design,
        SkillCategory::Tools,
        SkillCategory::Management,
        SkillCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SkillCategory::Programming => "Programming",
            SkillCategory::Frontend => "Frontend",
            SkillCategory::Backend => "Backend",
            SkillCategory::Database => "Database",
            SkillCategory::Cloud => "Cloud",
            SkillCategory::DevOps => "DevOps",
            SkillCategory::Mobile => "Mobile",
            SkillCategory::DataScience => "Data Science",
            SkillCategory::Design => "Design",
            SkillCategory::Tools => "Tools",
            SkillCategory::Management => "Management",
            SkillCategory::Other => "Other",
        }
    }
}

impl fmt::Display for SkillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SkillCategory {
    type Err = String;

    /// Accepts any casing and separator style ("DataScience", "data_science", "Data Science")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        SkillCategory::ALL
            .into_iter()
            .find(|category| {
                category
                    .label()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
                    .to_lowercase()
                    == key
            })
            .ok_or_else(|| format!("unknown skill category '{}'", s.trim()))
    }
}

/// Canonical skill in the controlled vocabulary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: SkillId,
    pub canonical_name: String,
    pub category: SkillCategory,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    pub fn is_strength(&self) -> bool {
        *self >= Proficiency::Advanced
    }
}

/// One skill on a profile, keyed by canonical skill id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillExperience {
    pub skill_id: SkillId,
    pub experience_years: f64,
    pub proficiency: Proficiency,
}

/// Extractor output before normalization: a free-text skill name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedSkillExperience {
    pub name: String,
    pub experience_years: f64,
    pub proficiency: Proficiency,
}

/// How overlapping per-skill experience collapses into a single total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceAggregation {
    Sum,
    #[default]
    MaxByCategory,
    Weighted,
}

/// Candidate profile with derived summary fields
///
/// Everything after `skills` is recomputed from `skills` by the profile
/// builder and never edited on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    pub id: ProfileId,
    pub skills: Vec<SkillExperience>,
    pub total_experience_years: f64,
    pub experience_by_category: BTreeMap<SkillCategory, f64>,
    pub strengths: Vec<SkillId>,
    pub improvement_areas: Vec<SkillCategory>,
    pub career_summary: String,
    pub analyzed_at: DateTime<Utc>,
}

impl CandidateProfile {
    pub fn skill_ids(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.skill_id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExperienceLevel::Entry => "Entry",
            ExperienceLevel::Mid => "Mid",
            ExperienceLevel::Senior => "Senior",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u64,
    pub max: u64,
    pub currency: String,
}

/// Job posting as stored in the catalog (skills already normalized)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: PostingId,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub description: String,
    pub required_skills: BTreeSet<SkillId>,
    #[serde(default)]
    pub preferred_skills: BTreeSet<SkillId>,
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub location: String,
    pub employment_type: EmploymentType,
    pub salary_range: SalaryRange,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub posted_at: NaiveDate,
    #[serde(default)]
    pub application_url: String,
}

/// Job posting as delivered by a catalog source, with free-text skill names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJobPosting {
    pub id: PostingId,
    pub company_name: String,
    pub job_title: String,
    #[serde(default)]
    pub description: String,
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    pub experience_level: ExperienceLevel,
    #[serde(default)]
    pub location: String,
    pub employment_type: EmploymentType,
    pub salary_range: SalaryRange,
    #[serde(default)]
    pub benefits: Vec<String>,
    pub posted_at: NaiveDate,
    #[serde(default)]
    pub application_url: String,
}

/// Scored (profile, posting) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMatch {
    pub profile_id: ProfileId,
    pub job_posting_id: PostingId,
    pub match_score: f64,
    pub matched_skills: BTreeSet<SkillId>,
    pub missing_skills: BTreeSet<SkillId>,
    pub reasoning: String,
}

/// Cache-validity state of a profile's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileStatus {
    Stale,
    Scoring,
    Fresh,
}

/// Expected total-experience bands per posting level
///
/// Entry = [0, entry_max), Mid = [entry_max, mid_max), Senior = [mid_max, ∞)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExperienceBands {
    pub entry_max: f64,
    pub mid_max: f64,
}

impl ExperienceBands {
    pub fn range(&self, level: ExperienceLevel) -> (f64, Option<f64>) {
        match level {
            ExperienceLevel::Entry => (0.0, Some(self.entry_max)),
            ExperienceLevel::Mid => (self.entry_max, Some(self.mid_max)),
            ExperienceLevel::Senior => (self.mid_max, None),
        }
    }

    pub fn fits(&self, level: ExperienceLevel, years: f64) -> bool {
        let (min, max) = self.range(level);
        years >= min && max.map_or(true, |max| years < max)
    }

    pub fn describe(&self, level: ExperienceLevel) -> String {
        match self.range(level) {
            (min, Some(max)) => format!("{}-{} years", min, max),
            (min, None) => format!("{}+ years", min),
        }
    }
}

impl Default for ExperienceBands {
    fn default() -> Self {
        Self {
            entry_max: 2.0,
            mid_max: 5.0,
        }
    }
}

/// Scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingWeights {
    pub required: f64,
    pub preferred: f64,
    /// Points (out of 100) reserved for preferred-skill overlap
    pub preferred_bonus: f64,
    /// Fraction removed when total experience falls outside the posting's band
    pub experience_penalty: f64,
    pub bands: ExperienceBands,
}

impl MatchingWeights {
    /// Share of a missing required skill's coverage that is charged again as a penalty
    pub fn missing_required_penalty(&self) -> f64 {
        let total = self.required + self.preferred;
        if total <= 0.0 {
            return 0.0;
        }
        (self.required / total).clamp(0.0, 1.0)
    }
}

impl Default for MatchingWeights {
    fn default() -> Self {
        Self {
            required: 3.0,
            preferred: 1.0,
            preferred_bonus: 10.0,
            experience_penalty: 0.10,
            bands: ExperienceBands::default(),
        }
    }
}

/// Profile derivation rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileRules {
    pub aggregation: ExperienceAggregation,
    pub experience_ceiling: f64,
    pub strengths_top_k: usize,
}

impl Default for ProfileRules {
    fn default() -> Self {
        Self {
            aggregation: ExperienceAggregation::MaxByCategory,
            experience_ceiling: 40.0,
            strengths_top_k: 3,
        }
    }
}
