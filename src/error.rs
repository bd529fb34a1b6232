use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Errors returned by the matching engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid experience for skill '{skill_id}': {years} years")]
    InvalidExperience { skill_id: String, years: f64 },

    #[error("Invalid salary range for posting '{posting_id}': min {min} > max {max}")]
    InvalidRange { posting_id: String, min: u64, max: u64 },

    #[error("Duplicate skill: {0}")]
    DuplicateSkill(String),

    /// Profile changed while its matches were being computed
    #[error("Scoring conflict: inputs for profile '{0}' changed during scoring")]
    ScoringConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Scoring task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::InvalidExperience { .. } => "invalid_experience",
            EngineError::InvalidRange { .. } => "invalid_range",
            EngineError::DuplicateSkill(_) => "duplicate_skill",
            EngineError::ScoringConflict(_) => "scoring_conflict",
            EngineError::Validation(_) => "validation_failed",
            EngineError::TaskFailed(_) => "internal_error",
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidExperience { .. }
            | EngineError::InvalidRange { .. }
            | EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::DuplicateSkill(_) => StatusCode::CONFLICT,
            EngineError::ScoringConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            EngineError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::DuplicateSkill("React".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::InvalidRange {
                posting_id: "1".into(),
                min: 10,
                max: 5
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::InvalidExperience {
            skill_id: "react".into(),
            years: -1.0,
        };
        assert_eq!(err.to_string(), "Invalid experience for skill 'react': -1 years");
    }
}
