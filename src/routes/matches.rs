use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::error::EngineError;
use crate::models::{
    HealthResponse, IngestResumeRequest, MatchesQuery, MatchesResponse, NamedSkillExperience,
    ProfileStatusResponse,
};
use crate::routes::{validation_failed, AppState};

/// Configure profile and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/profiles", web::post().to(create_profile))
        .route("/profiles/{id}", web::get().to(get_profile))
        .route("/profiles/{id}", web::put().to(update_profile))
        .route("/profiles/{id}/status", web::get().to(profile_status))
        .route("/profiles/{id}/matches", web::get().to(get_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let stats = state.engine.stats().await;

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        skills: stats.skills,
        postings: stats.postings,
        profiles: stats.profiles,
    })
}

/// Create a profile from a résumé upload
///
/// POST /api/v1/profiles
///
/// Request body:
/// ```json
/// {
///   "skills": [
///     { "name": "TypeScript", "experienceYears": 1.5, "proficiency": "Intermediate" }
///   ]
/// }
/// ```
async fn create_profile(
    state: web::Data<AppState>,
    req: web::Json<IngestResumeRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create_profile request: {:?}", errors);
        return Ok(validation_failed(errors));
    }

    let skills: Vec<NamedSkillExperience> = req.into_inner().skills.into_iter().map(Into::into).collect();
    let profile = state.engine.ingest_resume_named(skills).await?;

    Ok(HttpResponse::Created().json(profile))
}

/// Replace a profile's skills with a new upload
///
/// PUT /api/v1/profiles/{id}
async fn update_profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<IngestResumeRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let profile_id = path.into_inner();
    let skills: Vec<NamedSkillExperience> = req.into_inner().skills.into_iter().map(Into::into).collect();
    let profile = state.engine.update_profile_named(&profile_id, skills).await?;

    Ok(HttpResponse::Ok().json(profile))
}

async fn get_profile(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let profile = state.engine.get_profile(&path).await?;
    Ok(HttpResponse::Ok().json(profile))
}

async fn profile_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let profile_id = path.into_inner();
    let status = state.engine.profile_status(&profile_id).await?;

    Ok(HttpResponse::Ok().json(ProfileStatusResponse { profile_id, status }))
}

/// Ranked job matches for a profile
///
/// GET /api/v1/profiles/{id}/matches?limit=20&offset=0
///
/// Stale pairs are re-scored before the page is returned.
async fn get_matches(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<MatchesQuery>,
) -> Result<HttpResponse, EngineError> {
    let profile_id = path.into_inner();
    let limit = state.page_limit(query.limit);
    let offset = query.offset.unwrap_or(0);

    tracing::debug!("Finding matches for profile: {}, limit: {}, offset: {}", profile_id, limit, offset);

    let page = state.engine.get_match_page(&profile_id, limit, offset).await?;

    tracing::info!(
        "Returning {} of {} matches for profile {}",
        page.matches.len(),
        page.total,
        profile_id
    );

    Ok(HttpResponse::Ok().json(MatchesResponse {
        profile_id,
        matches: page.matches,
        total_results: page.total,
        next_offset: page.next_offset,
    }))
}
