// Route exports
pub mod catalog;
pub mod matches;

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use validator::ValidationErrors;

use crate::config::Settings;
use crate::models::ErrorResponse;
use crate::services::Engine;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub default_limit: u16,
    pub max_limit: u16,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, settings: &Settings) -> Self {
        Self {
            engine,
            default_limit: settings.matching.default_limit,
            max_limit: settings.matching.max_limit,
        }
    }

    /// Page size for a match listing, capped at the configured maximum
    pub fn page_limit(&self, requested: Option<u16>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1)) as usize
    }
}

pub(crate) fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

pub(crate) fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "validation_failed".to_string(),
        message,
        status_code: 400,
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(catalog::configure),
    );
}
