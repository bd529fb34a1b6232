use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{NamedSkillExperience, NewJobPosting};

/// One extracted skill in a résumé upload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSkill {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0.0, max = 80.0))]
    pub experience_years: f64,
    pub proficiency: crate::models::Proficiency,
}

impl From<ResumeSkill> for NamedSkillExperience {
    fn from(skill: ResumeSkill) -> Self {
        NamedSkillExperience {
            name: skill.name,
            experience_years: skill.experience_years,
            proficiency: skill.proficiency,
        }
    }
}

/// Résumé upload: extractor output for a new or existing profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestResumeRequest {
    #[validate(nested)]
    #[serde(default)]
    pub skills: Vec<ResumeSkill>,
}

/// Register a canonical skill
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSkillRequest {
    #[validate(length(min = 1, max = 100))]
    pub canonical_name: String,
    #[validate(length(min = 1))]
    pub category: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Move a skill to another category
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecategorizeSkillRequest {
    #[validate(length(min = 1))]
    pub category: String,
}

/// Add or replace catalog postings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestPostingsRequest {
    #[validate(length(min = 1, max = 1000))]
    pub postings: Vec<NewJobPosting>,
}

/// Pagination for ranked matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesQuery {
    pub limit: Option<u16>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NormalizeQuery {
    #[validate(length(min = 1))]
    pub q: String,
}
