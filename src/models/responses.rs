use serde::{Deserialize, Serialize};

use crate::models::domain::{JobMatch, PostingId, ProfileId, ProfileStatus};

/// Ranked matches page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchesResponse {
    pub profile_id: ProfileId,
    pub matches: Vec<JobMatch>,
    pub total_results: usize,
    pub next_offset: Option<usize>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub skills: usize,
    pub postings: usize,
    pub profiles: usize,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStatusResponse {
    pub profile_id: ProfileId,
    pub status: ProfileStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPostingsResponse {
    pub ingested: usize,
    pub ids: Vec<PostingId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingIdsResponse {
    pub skill_id: String,
    pub posting_ids: Vec<PostingId>,
}
