use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::EngineError;
use crate::models::{
    IngestPostingsRequest, IngestPostingsResponse, NormalizeQuery, PostingIdsResponse,
    RecategorizeSkillRequest, RegisterSkillRequest, SkillCategory,
};
use crate::routes::{bad_request, validation_failed, AppState};

/// Configure vocabulary and catalog routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/skills", web::post().to(register_skill))
        .route("/skills/normalize", web::get().to(normalize_skill))
        .route("/skills/{name}/category", web::put().to(recategorize_skill))
        .route("/skills/{name}/postings", web::get().to(postings_for_skill))
        .route("/postings", web::post().to(ingest_postings))
        .route("/postings/{id}", web::get().to(get_posting))
        .route("/postings/{id}", web::delete().to(remove_posting));
}

/// Register a canonical skill (or merge aliases into an existing one)
///
/// POST /api/v1/skills
async fn register_skill(
    state: web::Data<AppState>,
    req: web::Json<RegisterSkillRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let category = match req.category.parse::<SkillCategory>() {
        Ok(category) => category,
        Err(message) => return Ok(bad_request(message)),
    };

    let skill = state
        .engine
        .register_skill(&req.canonical_name, category, &req.aliases)
        .await?;

    Ok(HttpResponse::Created().json(skill))
}

/// PUT /api/v1/skills/{name}/category
async fn recategorize_skill(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<RecategorizeSkillRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let category = match req.category.parse::<SkillCategory>() {
        Ok(category) => category,
        Err(message) => return Ok(bad_request(message)),
    };

    let skill = state.engine.recategorize_skill(&path, category).await?;
    Ok(HttpResponse::Ok().json(skill))
}

/// GET /api/v1/skills/normalize?q=reactjs
async fn normalize_skill(
    state: web::Data<AppState>,
    query: web::Query<NormalizeQuery>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(errors));
    }

    let skill = state.engine.normalize_skill(&query.q).await?;
    Ok(HttpResponse::Ok().json(skill))
}

async fn postings_for_skill(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let (skill, posting_ids) = state.engine.postings_for_skill(&path).await?;

    Ok(HttpResponse::Ok().json(PostingIdsResponse {
        skill_id: skill.id,
        posting_ids,
    }))
}

/// Add or replace postings
///
/// POST /api/v1/postings
///
/// The batch is all-or-nothing: one invalid posting rejects every posting.
async fn ingest_postings(
    state: web::Data<AppState>,
    req: web::Json<IngestPostingsRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        return Ok(validation_failed(errors));
    }

    let ids = state.engine.ingest_postings(req.into_inner().postings).await?;

    Ok(HttpResponse::Ok().json(IngestPostingsResponse {
        ingested: ids.len(),
        ids,
    }))
}

async fn get_posting(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    let posting = state.engine.get_posting(&path).await?;
    Ok(HttpResponse::Ok().json(posting))
}

async fn remove_posting(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, EngineError> {
    state.engine.remove_posting(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
