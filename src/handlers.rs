use crate::application::{ApplicationService, UploadedDocument};
use crate::cache_validator::ValidatedCacheEntry;
use crate::catalog::{self, CardCatalog};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::recommendation;
use crate::scoring::DEFAULT_TOP_N;
use crate::services::{self, CibilService, LlmService, VectorSearchService};
use crate::validation;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Submission workflow (file storage, OCR, validation, persistence).
    pub applications: Arc<ApplicationService>,
    /// Encoded card catalog used by the recommendation scorer.
    pub catalog: Arc<CardCatalog>,
    /// Vector-search capability (optional).
    pub vector: Arc<VectorSearchService>,
    /// LLM endpoint for recommendation explanations (optional).
    pub llm: Arc<LlmService>,
    /// Credit bureau client (mock mode without an API key).
    pub cibil: Arc<CibilService>,
    /// Credit reports keyed by normalized PAN, checksum-validated.
    pub cibil_cache: Cache<String, String>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-kyc-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/applications
///
/// Multipart submission: form fields plus one file per declared document type.
/// The workflow runs on its own task so a client disconnect cannot abandon a
/// half-persisted application.
pub async fn submit_application(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let (form, documents) = parse_submission(multipart).await?;
    tracing::info!(
        "POST /applications - {} document(s), service {:?}",
        documents.len(),
        form.service_type
    );

    let applications = state.applications.clone();
    let handle = tokio::spawn(async move { applications.submit(form, documents).await });
    let response = handle
        .await
        .map_err(|e| AppError::InternalError(format!("Submission task failed: {}", e)))??;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Splits a multipart body into the typed form and the uploaded documents.
/// The multipart field name of each file declares its document type.
async fn parse_submission(
    mut multipart: Multipart,
) -> Result<(UploadForm, Vec<UploadedDocument>), AppError> {
    let mut form = UploadForm::default();
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field
            .name()
            .ok_or_else(|| AppError::BadRequest("Multipart field without a name".to_string()))?
            .to_string();

        if let Some(file_name) = field.file_name() {
            let file_name = file_name.to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            if bytes.is_empty() {
                return Err(AppError::BadRequest(format!("Empty file: {}", file_name)));
            }
            documents.push(UploadedDocument {
                document_type: name,
                file_name,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
        match name.as_str() {
            "serviceType" => form.service_type = Some(value),
            "email" => form.email = Some(value),
            "fullname" => form.fullname = Some(value),
            "aadhaarNumber" => form.aadhaar_number = Some(value),
            "panNumber" => form.pan_number = Some(value),
            "passportNumber" => form.passport_number = Some(value),
            "voterId" => form.voter_id = Some(value),
            "dob" => form.dob = Some(value),
            "salary" => {
                form.salary = Some(value.trim().parse().map_err(|_| {
                    AppError::BadRequest("salary must be a number".to_string())
                })?)
            }
            "mobile" => form.mobile = Some(value),
            other => tracing::debug!("Ignoring unknown form field {}", other),
        }
    }

    Ok((form, documents))
}

/// GET /api/v1/applications/:id
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRecord>, AppError> {
    tracing::info!("GET /applications/{}", id);

    let record = state
        .applications
        .store()
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {} not found", id)))?;

    Ok(Json(record))
}

/// GET /api/v1/applications/number/:application_number
pub async fn get_application_by_number(
    State(state): State<Arc<AppState>>,
    Path(application_number): Path<String>,
) -> Result<Json<ApplicationRecord>, AppError> {
    tracing::info!("GET /applications/number/{}", application_number);

    let record = state
        .applications
        .store()
        .find_by_number(&application_number)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Application {} not found", application_number))
        })?;

    Ok(Json(record))
}

/// GET /api/v1/users/:user_id/applications
pub async fn list_applications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    tracing::info!("GET /users/{}/applications", user_id);

    let records = state.applications.store().list_for_user(&user_id).await?;
    Ok(Json(records))
}

/// POST /api/v1/recommendations
///
/// Scores the card catalog against the posted profile. Explanations come from
/// the LLM when available; scores never do. A PAN in the request additionally
/// embeds a credit report in the response.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    tracing::info!("POST /recommendations - mode {:?}", request.mode);

    ensure_catalog(&state).await;
    let snapshot = state.catalog.snapshot();
    if snapshot.is_empty() {
        tracing::warn!("Card catalog is empty, returning no recommendations");
        return Ok(Json(RecommendationResponse {
            recommendations: Vec::new(),
            cibil_data: None,
        }));
    }

    let ranked =
        recommendation::score_catalog(&request.profile, &snapshot, request.mode, DEFAULT_TOP_N);

    let advice = if state.llm.is_configured() && !ranked.is_empty() {
        let prompt = recommendation::build_prompt(&request.profile, &ranked);
        match state.llm.complete(&prompt).await {
            Ok(raw) => {
                let parsed = recommendation::parse_llm_reply(&raw);
                if parsed.is_none() {
                    tracing::warn!("LLM reply unusable, serving fallback recommendation");
                }
                parsed
            }
            Err(e) => {
                tracing::warn!("LLM call failed, serving fallback recommendation: {}", e);
                None
            }
        }
    } else {
        None
    };

    let recommendations = recommendation::compose(ranked, advice.as_ref(), request.mode);

    let cibil_data = match request.pan_number {
        Some(ref pan) => {
            let cibil_request = CibilRequest {
                pan_number: pan.clone(),
                full_name: None,
                dob: None,
                mobile: None,
                income: request.profile.income,
                employment_type: request.profile.employment_type,
            };
            match cached_cibil_report(&state, &cibil_request).await {
                Ok(report) => Some(report),
                Err(e) => {
                    // Credit data is additive here, recommendations still go out.
                    tracing::warn!("Credit report unavailable: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    Ok(Json(RecommendationResponse {
        recommendations,
        cibil_data,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    pub limit: Option<usize>,
}

/// GET /api/v1/recommendations/search?query=...&limit=...
///
/// Free-text card search. Uses the vector store when configured, otherwise a
/// plain substring scan over the local catalog.
pub async fn search_cards(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CardExcerpt>>, AppError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }
    let limit = params.limit.unwrap_or(5).min(50);

    if state.vector.is_configured() {
        let results = state.vector.search(query, limit).await?;
        let excerpts = results
            .into_iter()
            .map(|doc| CardExcerpt {
                card_name: doc
                    .metadata
                    .get("cardName")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                content: doc.content,
                score: doc.score,
            })
            .collect();
        return Ok(Json(excerpts));
    }

    ensure_catalog(&state).await;
    let needle = query.to_lowercase();
    let excerpts: Vec<CardExcerpt> = state
        .catalog
        .snapshot()
        .iter()
        .filter(|entry| entry.content.to_lowercase().contains(&needle))
        .take(limit)
        .map(|entry| CardExcerpt {
            card_name: Some(entry.card_name.clone()),
            content: entry.content.clone(),
            score: 1.0,
        })
        .collect();

    Ok(Json(excerpts))
}

/// POST /api/v1/recommendations/reindex
///
/// Rebuilds the card catalog from its configured source and, when a vector
/// store and a data file are both present, pushes the records to the store.
pub async fn reindex(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    tracing::info!("POST /recommendations/reindex");

    let records = load_catalog_records(&state).await?;

    if state.vector.is_configured() && state.config.card_data_file.is_some() {
        state.vector.index_cards(&records).await?;
    }

    let indexed = state.catalog.replace(records);
    tracing::info!("Catalog rebuilt with {} cards", indexed);

    Ok(Json(json!({ "success": true, "indexed": indexed })))
}

/// POST /api/v1/credit-score
pub async fn credit_score(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CibilRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pan = validation::normalize_pan(&request.pan_number);
    if !validation::is_valid_pan(&pan) {
        return Err(AppError::BadRequest("Invalid PAN format".to_string()));
    }

    let report = cached_cibil_report(&state, &request).await?;
    let eligibility = services::eligibility(report.cibil_score);

    Ok(Json(json!({
        "report": report,
        "eligibility": eligibility,
    })))
}

/// Fetches a credit report through the PAN-keyed cache. Entries failing
/// checksum validation are dropped and refetched.
async fn cached_cibil_report(
    state: &AppState,
    request: &CibilRequest,
) -> Result<CibilReport, AppError> {
    let key = validation::normalize_pan(&request.pan_number);

    if let Some(cached) = state.cibil_cache.get(&key).await {
        if let Some(data) = ValidatedCacheEntry::deserialize_and_validate(&cached) {
            if let Ok(report) = serde_json::from_str::<CibilReport>(&data) {
                tracing::debug!("CIBIL cache hit");
                return Ok(report);
            }
        }
        tracing::warn!("CIBIL cache entry failed validation, refetching");
        state.cibil_cache.invalidate(&key).await;
    }

    let report = state.cibil.fetch_report(request).await?;

    if let Ok(data) = serde_json::to_string(&report) {
        state
            .cibil_cache
            .insert(key, ValidatedCacheEntry::new(data).serialize())
            .await;
    }

    Ok(report)
}

/// Lazily fills an empty catalog from its configured source. Load failures
/// are logged, not surfaced; callers handle an empty catalog.
async fn ensure_catalog(state: &AppState) {
    if !state.catalog.is_empty() {
        return;
    }
    match load_catalog_records(state).await {
        Ok(records) => {
            let count = state.catalog.replace(records);
            tracing::info!("Card catalog loaded with {} cards", count);
        }
        Err(e) => tracing::warn!("Card catalog load failed: {}", e),
    }
}

async fn load_catalog_records(state: &AppState) -> Result<Vec<CardRecord>, AppError> {
    if let Some(ref file) = state.config.card_data_file {
        return catalog::load_card_file(file).await;
    }
    if state.vector.is_configured() {
        return state.vector.fetch_all_cards().await;
    }
    Err(AppError::BadRequest(
        "No card catalog source configured".to_string(),
    ))
}
