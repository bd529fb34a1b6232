use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::core::catalog::CategoryDemand;
use crate::core::normalizer::SkillNormalizer;
use crate::error::EngineError;
use crate::models::{
    CandidateProfile, ExperienceAggregation, Proficiency, ProfileId, ProfileRules, SkillCategory,
    SkillExperience, SkillId,
};

/// Builds candidate profiles and derives their summary fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileBuilder {
    rules: ProfileRules,
}

impl ProfileBuilder {
    pub fn new(rules: ProfileRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ProfileRules {
        &self.rules
    }

    /// Build a profile from extracted skill experiences
    ///
    /// Duplicated skill ids keep the position of their first occurrence and
    /// the values of their last one. Every skill id must exist in the
    /// vocabulary.
    pub fn build(
        &self,
        id: ProfileId,
        experiences: Vec<SkillExperience>,
        vocabulary: &SkillNormalizer,
        demand: &CategoryDemand,
        analyzed_at: DateTime<Utc>,
    ) -> Result<CandidateProfile, EngineError> {
        let mut skills: Vec<SkillExperience> = Vec::with_capacity(experiences.len());
        let mut positions: HashMap<SkillId, usize> = HashMap::new();

        for experience in experiences {
            if !experience.experience_years.is_finite() || experience.experience_years < 0.0 {
                return Err(EngineError::InvalidExperience {
                    skill_id: experience.skill_id,
                    years: experience.experience_years,
                });
            }
            if vocabulary.get(&experience.skill_id).is_none() {
                return Err(EngineError::NotFound(format!("skill '{}'", experience.skill_id)));
            }

            match positions.get(&experience.skill_id) {
                Some(&index) => skills[index] = experience,
                None => {
                    positions.insert(experience.skill_id.clone(), skills.len());
                    skills.push(experience);
                }
            }
        }

        Ok(self.assemble(id, skills, analyzed_at, vocabulary, demand))
    }

    /// Recompute every derived field of an existing profile against the
    /// current vocabulary and catalog demand
    pub fn rederive(
        &self,
        profile: &CandidateProfile,
        vocabulary: &SkillNormalizer,
        demand: &CategoryDemand,
    ) -> CandidateProfile {
        self.assemble(
            profile.id.clone(),
            profile.skills.clone(),
            profile.analyzed_at,
            vocabulary,
            demand,
        )
    }

    fn assemble(
        &self,
        id: ProfileId,
        skills: Vec<SkillExperience>,
        analyzed_at: DateTime<Utc>,
        vocabulary: &SkillNormalizer,
        demand: &CategoryDemand,
    ) -> CandidateProfile {
        let category = |skill_id: &str| {
            vocabulary
                .category_of(skill_id)
                .unwrap_or(SkillCategory::Other)
        };

        let mut experience_by_category: BTreeMap<SkillCategory, f64> = BTreeMap::new();
        for skill in &skills {
            let years = experience_by_category
                .entry(category(skill.skill_id.as_str()))
                .or_insert(0.0);
            *years = years.max(skill.experience_years);
        }

        let total_experience_years = self.total_experience(&skills, &experience_by_category);
        let strengths = self.strengths(&skills);
        let improvement_areas = improvement_areas(&skills, demand, &category);
        let career_summary = career_summary(
            total_experience_years,
            &experience_by_category,
            &strengths,
            &improvement_areas,
            vocabulary,
        );

        CandidateProfile {
            id,
            skills,
            total_experience_years,
            experience_by_category,
            strengths,
            improvement_areas,
            career_summary,
            analyzed_at,
        }
    }

    fn total_experience(
        &self,
        skills: &[SkillExperience],
        by_category: &BTreeMap<SkillCategory, f64>,
    ) -> f64 {
        let total = match self.rules.aggregation {
            ExperienceAggregation::Sum => skills.iter().map(|s| s.experience_years).sum(),
            ExperienceAggregation::MaxByCategory => {
                by_category.values().copied().fold(0.0, f64::max)
            }
            ExperienceAggregation::Weighted => {
                // Each further category counts half as much as the previous one
                let mut maxima: Vec<f64> = by_category.values().copied().collect();
                maxima.sort_by(|a, b| b.total_cmp(a));
                maxima
                    .iter()
                    .enumerate()
                    .map(|(i, years)| years * 0.5f64.powi(i as i32))
                    .sum()
            }
        };

        total.min(self.rules.experience_ceiling.max(0.0))
    }

    fn strengths(&self, skills: &[SkillExperience]) -> Vec<SkillId> {
        let mut strong: Vec<&SkillExperience> = skills
            .iter()
            .filter(|s| s.proficiency.is_strength())
            .collect();

        strong.sort_by(|a, b| {
            b.experience_years
                .total_cmp(&a.experience_years)
                .then_with(|| a.skill_id.cmp(&b.skill_id))
        });

        strong
            .into_iter()
            .take(self.rules.strengths_top_k)
            .map(|s| s.skill_id.clone())
            .collect()
    }
}

/// Categories the catalog asks for where the profile is absent or beginner-only,
/// most demanded first
fn improvement_areas(
    skills: &[SkillExperience],
    demand: &CategoryDemand,
    category: &impl Fn(&str) -> SkillCategory,
) -> Vec<SkillCategory> {
    let mut best: HashMap<SkillCategory, Proficiency> = HashMap::new();
    for skill in skills {
        let entry = best
            .entry(category(skill.skill_id.as_str()))
            .or_insert(skill.proficiency);
        *entry = (*entry).max(skill.proficiency);
    }

    let mut areas: Vec<(SkillCategory, usize)> = demand
        .iter()
        .filter(|(_, count)| **count > 0)
        .filter(|(cat, _)| best.get(*cat).map_or(true, |p| *p == Proficiency::Beginner))
        .map(|(cat, &count)| (*cat, count))
        .collect();

    areas.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    areas.into_iter().map(|(cat, _)| cat).collect()
}

fn career_summary(
    total_years: f64,
    by_category: &BTreeMap<SkillCategory, f64>,
    strengths: &[SkillId],
    improvement_areas: &[SkillCategory],
    vocabulary: &SkillNormalizer,
) -> String {
    // Largest category wins; BTreeMap order breaks ties
    let dominant = by_category
        .iter()
        .fold(None::<(&SkillCategory, f64)>, |best, (cat, &years)| match best {
            Some((_, best_years)) if best_years >= years => best,
            _ => Some((cat, years)),
        });

    let Some((dominant, _)) = dominant else {
        return "No skills extracted yet.".to_string();
    };

    let mut summary = format!(
        "{:.1} years of experience, centred on {}.",
        total_years, dominant
    );

    if strengths.is_empty() {
        summary.push_str(" No advanced-level skills yet.");
    } else {
        let names: Vec<&str> = strengths
            .iter()
            .map(|id| vocabulary.display_name(id))
            .collect();
        summary.push_str(&format!(" Key strengths: {}.", names.join(", ")));
    }

    if !improvement_areas.is_empty() {
        let areas: Vec<&str> = improvement_areas.iter().map(|c| c.label()).collect();
        summary.push_str(&format!(" Growth areas: {}.", areas.join(", ")));
    }

    summary
}
