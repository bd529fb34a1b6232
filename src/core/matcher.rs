use std::borrow::Borrow;
use std::cmp::Ordering;

use crate::core::scoring::{build_reasoning, calculate_match_score};
use crate::models::{CandidateProfile, JobMatch, JobPosting, MatchingWeights};

/// Scores and ranks postings for a profile
///
/// # Ranking
/// 1. Match score, descending
/// 2. Matched required skills, descending
/// 3. Posting date, most recent first
/// 4. Posting id, ascending
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    weights: MatchingWeights,
}

impl Matcher {
    pub fn new(weights: MatchingWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: MatchingWeights::default(),
        }
    }

    pub fn weights(&self) -> &MatchingWeights {
        &self.weights
    }

    /// Score a single (profile, posting) pair
    pub fn score(&self, profile: &CandidateProfile, posting: &JobPosting) -> JobMatch {
        let breakdown = calculate_match_score(profile, posting, &self.weights);
        let reasoning = build_reasoning(&breakdown, profile, posting, &self.weights);

        let mut matched_skills = breakdown.matched_required;
        matched_skills.extend(breakdown.matched_preferred);

        JobMatch {
            profile_id: profile.id.clone(),
            job_posting_id: posting.id.clone(),
            match_score: breakdown.score,
            matched_skills,
            missing_skills: breakdown.missing_required,
            reasoning,
        }
    }

    /// Score every posting and return them in rank order
    pub fn rank<'a, I>(&self, profile: &CandidateProfile, postings: I) -> Vec<JobMatch>
    where
        I: IntoIterator<Item = &'a JobPosting>,
    {
        let scored: Vec<(JobMatch, &JobPosting)> = postings
            .into_iter()
            .map(|posting| (self.score(profile, posting), posting))
            .collect();

        order_matches(scored)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

/// Total order over scored postings
pub fn compare_ranked(
    a: &JobMatch,
    a_posting: &JobPosting,
    b: &JobMatch,
    b_posting: &JobPosting,
) -> Ordering {
    let matched_required = |m: &JobMatch, posting: &JobPosting| {
        posting
            .required_skills
            .len()
            .saturating_sub(m.missing_skills.len())
    };

    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| matched_required(b, b_posting).cmp(&matched_required(a, a_posting)))
        .then_with(|| b_posting.posted_at.cmp(&a_posting.posted_at))
        .then_with(|| a.job_posting_id.cmp(&b.job_posting_id))
}

/// Sort matches paired with their postings into rank order
pub fn order_matches<P>(mut entries: Vec<(JobMatch, P)>) -> Vec<JobMatch>
where
    P: Borrow<JobPosting>,
{
    entries.sort_by(|(a, a_posting), (b, b_posting)| {
        compare_ranked(
            a,
            <P as Borrow<JobPosting>>::borrow(a_posting),
            b,
            <P as Borrow<JobPosting>>::borrow(b_posting),
        )
    });
    entries.into_iter().map(|(m, _)| m).collect()
}
