use std::collections::{BTreeSet, HashSet};

use crate::models::{CandidateProfile, JobPosting, MatchingWeights, SkillId};

/// Which factor shaped the score the most; selects the reasoning template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFactor {
    NoRequiredOverlap,
    ExperienceMismatch,
    StrongRequiredOverlap,
    PartialRequiredOverlap,
    PreferredOnly,
}

/// Intermediate values of a single (profile, posting) score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub matched_required: BTreeSet<SkillId>,
    pub missing_required: BTreeSet<SkillId>,
    pub matched_preferred: BTreeSet<SkillId>,
    pub required_points: f64,
    pub bonus_points: f64,
    /// Points lost on the required side compared to full coverage
    pub required_loss: f64,
    pub experience_fit: bool,
    pub experience_loss: f64,
    /// Final score: rounded, clamped to [0, 100]
    pub score: f64,
    pub factor: MatchFactor,
}

/// Coverage at or above this counts as strong required-skill overlap
const STRONG_COVERAGE: f64 = 0.8;

/// Missing skills named in a reasoning line
const REASONING_SKILL_LIMIT: usize = 3;

/// Calculate a match score (0-100) for a profile against a posting
///
/// Scoring formula (R = required, P = preferred):
/// required = (100 - bonus) * matched_R / |R| * (1 - missing_R / |R| * penalty_share)
/// bonus    = preferred_bonus * matched_P / |P|
/// score    = min(100, required + bonus), scaled by (1 - experience_penalty)
///            when total experience falls outside the posting's band
///
/// A posting without required skills scores on preferred overlap alone.
pub fn calculate_match_score(
    profile: &CandidateProfile,
    posting: &JobPosting,
    weights: &MatchingWeights,
) -> ScoreBreakdown {
    let owned: HashSet<&str> = profile.skill_ids().collect();

    let (matched_required, missing_required): (BTreeSet<SkillId>, BTreeSet<SkillId>) = posting
        .required_skills
        .iter()
        .cloned()
        .partition(|id| owned.contains(id.as_str()));

    let matched_preferred: BTreeSet<SkillId> = posting
        .preferred_skills
        .iter()
        .filter(|id| owned.contains(id.as_str()))
        .cloned()
        .collect();

    let required_total = posting.required_skills.len();
    let preferred_total = posting.preferred_skills.len();
    let bonus_cap = weights.preferred_bonus.clamp(0.0, 100.0);

    let (required_points, bonus_points, required_loss) = if required_total == 0 {
        let preferred_points = if preferred_total == 0 {
            100.0
        } else {
            100.0 * matched_preferred.len() as f64 / preferred_total as f64
        };
        (0.0, preferred_points, 0.0)
    } else {
        let coverage = matched_required.len() as f64 / required_total as f64;
        let missing_ratio = missing_required.len() as f64 / required_total as f64;
        let penalty = 1.0 - missing_ratio * weights.missing_required_penalty();
        let required_points = (100.0 - bonus_cap) * coverage * penalty;

        let bonus_points = if preferred_total == 0 {
            0.0
        } else {
            bonus_cap * matched_preferred.len() as f64 / preferred_total as f64
        };
        (required_points, bonus_points, (100.0 - bonus_cap) - required_points)
    };

    let skill_score = (required_points + bonus_points).min(100.0);

    let experience_fit = weights
        .bands
        .fits(posting.experience_level, profile.total_experience_years);
    let adjusted = if experience_fit {
        skill_score
    } else {
        skill_score * (1.0 - weights.experience_penalty.clamp(0.0, 1.0))
    };
    let experience_loss = skill_score - adjusted;

    let score = adjusted.round().clamp(0.0, 100.0);

    let factor = if required_total > 0 && matched_required.is_empty() {
        MatchFactor::NoRequiredOverlap
    } else if !experience_fit && experience_loss >= required_loss {
        MatchFactor::ExperienceMismatch
    } else if required_total == 0 {
        MatchFactor::PreferredOnly
    } else if matched_required.len() as f64 / required_total as f64 >= STRONG_COVERAGE {
        MatchFactor::StrongRequiredOverlap
    } else {
        MatchFactor::PartialRequiredOverlap
    };

    ScoreBreakdown {
        matched_required,
        missing_required,
        matched_preferred,
        required_points,
        bonus_points,
        required_loss,
        experience_fit,
        experience_loss,
        score,
        factor,
    }
}

fn list_skills(skills: &BTreeSet<SkillId>) -> String {
    let rest = skills.len().saturating_sub(REASONING_SKILL_LIMIT);
    let more = format!("{} more", rest);
    let mut names: Vec<&str> = skills
        .iter()
        .take(REASONING_SKILL_LIMIT)
        .map(String::as_str)
        .collect();
    if rest > 0 {
        names.push(&more);
    }
    names.join(", ")
}

/// Human-readable explanation of a score, keyed by its dominant factor
pub fn build_reasoning(
    breakdown: &ScoreBreakdown,
    profile: &CandidateProfile,
    posting: &JobPosting,
    weights: &MatchingWeights,
) -> String {
    let required_total = posting.required_skills.len();
    let preferred_total = posting.preferred_skills.len();
    let matched_required = breakdown.matched_required.len();
    let matched_preferred = breakdown.matched_preferred.len();

    let mut reasoning = match breakdown.factor {
        MatchFactor::NoRequiredOverlap => format!(
            "No overlap with the {} required skills; start with {}.",
            required_total,
            list_skills(&breakdown.missing_required)
        ),
        MatchFactor::ExperienceMismatch => format!(
            "Experience-level mismatch: {:.1} years is outside the {} band ({}).",
            profile.total_experience_years,
            posting.experience_level,
            weights.bands.describe(posting.experience_level)
        ),
        MatchFactor::StrongRequiredOverlap => format!(
            "Strong required-skill overlap: covers {} of {} required skills.",
            matched_required, required_total
        ),
        MatchFactor::PartialRequiredOverlap => format!(
            "Partial required-skill overlap: covers {} of {} required skills.",
            matched_required, required_total
        ),
        MatchFactor::PreferredOnly if preferred_total == 0 => {
            "No skill requirements listed; scored on experience fit.".to_string()
        }
        MatchFactor::PreferredOnly => "No required skills listed.".to_string(),
    };

    if breakdown.factor == MatchFactor::ExperienceMismatch && required_total > 0 {
        reasoning.push_str(&format!(
            " Covers {} of {} required skills.",
            matched_required, required_total
        ));
    }

    if breakdown.factor != MatchFactor::NoRequiredOverlap && !breakdown.missing_required.is_empty() {
        reasoning.push_str(&format!(
            " Missing: {}.",
            list_skills(&breakdown.missing_required)
        ));
    }

    if preferred_total > 0 {
        reasoning.push_str(&format!(
            " Preferred skills matched: {} of {}.",
            matched_preferred, preferred_total
        ));
    }

    reasoning
}
