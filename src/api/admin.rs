//! Admin API endpoints for corpus management and analytics

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiError, ApiState, auth::require_admin_key, error_response, internal_error};
use crate::db::{AnalyticsStats, QuestionCount};
use crate::ingest::{self, SiteScraper};
use crate::knowledge::{KnowledgeEntry, KnowledgeSource};

/// Default number of top questions returned
const DEFAULT_ANALYTICS_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub message: String,
    pub pages: usize,
    pub chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct KnowledgeListResponse {
    pub entries: Vec<KnowledgeEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub top_questions: Vec<QuestionCount>,
    pub stats: AnalyticsStats,
}

// --- Handlers ---

fn bad_request(code: &str, message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, error_response(code, message))
}

/// Import an uploaded Excel workbook (multipart field `file`)
async fn upload_knowledge(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("invalid_upload", &e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request("invalid_upload", &e.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(bad_request("missing_file", "No file provided"));
    };

    if !ingest::is_workbook_name(&file_name) {
        return Err(bad_request(
            "invalid_file_type",
            "Invalid file type. Please upload an Excel file (.xlsx or .xls)",
        ));
    }

    let rows = ingest::parse_workbook(&bytes)
        .map_err(|e| bad_request("invalid_workbook", &e.to_string()))?;

    let count = ingest::import_rows(&state.knowledge_repo, &rows)
        .map_err(|e| internal_error(&e, "Failed to import knowledge"))?;

    tracing::info!(file = %file_name, count, "workbook uploaded");

    Ok(Json(ImportResponse {
        success: true,
        message: format!("Successfully imported {count} knowledge items"),
        count,
    }))
}

/// Import spreadsheet rows exported as a JSON array
async fn import_knowledge(
    State(state): State<Arc<ApiState>>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let rows =
        ingest::parse_rows(&body).map_err(|e| bad_request("invalid_rows", &e.to_string()))?;

    let count = ingest::import_rows(&state.knowledge_repo, &rows)
        .map_err(|e| internal_error(&e, "Failed to import knowledge"))?;

    Ok(Json(ImportResponse {
        success: true,
        message: format!("Successfully imported {count} knowledge items"),
        count,
    }))
}

/// Scrape the company website into the corpus
async fn scrape_website(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    if Url::parse(&req.url).is_err() {
        return Err(bad_request("invalid_url", "A valid URL is required"));
    }

    let scraper = SiteScraper::new().map_err(|e| internal_error(&e, "Failed to scrape website"))?;
    let pages = scraper.scrape_site(&req.url).await.map_err(|e| {
        tracing::warn!(url = %req.url, error = %e, "website scrape failed");
        (
            StatusCode::BAD_GATEWAY,
            error_response("scrape_failed", &e.to_string()),
        )
    })?;

    let chunks = ingest::save_pages(&state.knowledge_repo, &pages)
        .map_err(|e| internal_error(&e, "Failed to save scraped content"))?;

    Ok(Json(ScrapeResponse {
        success: true,
        message: format!("Scraped {} pages into {chunks} knowledge items", pages.len()),
        pages: pages.len(),
        chunks,
    }))
}

/// List the stored corpus
async fn list_knowledge(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<KnowledgeListResponse>, ApiError> {
    let entries = state
        .knowledge_repo
        .list()
        .map_err(|e| internal_error(&e, "Failed to list knowledge"))?;

    Ok(Json(KnowledgeListResponse {
        count: entries.len(),
        entries,
    }))
}

/// Remove every entry from one source
async fn delete_knowledge(
    State(state): State<Arc<ApiState>>,
    Path(source): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let source: KnowledgeSource = source
        .parse()
        .map_err(|_| bad_request("invalid_source", "Source must be excel or website"))?;

    let deleted = state
        .knowledge_repo
        .delete_by_source(source)
        .map_err(|e| internal_error(&e, "Failed to delete knowledge"))?;

    Ok(Json(DeleteResponse { deleted }))
}

/// Most asked questions and totals
async fn analytics(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_ANALYTICS_LIMIT);

    let top_questions = state
        .analytics_repo
        .top_questions(limit)
        .map_err(|e| internal_error(&e, "Failed to retrieve analytics"))?;
    let stats = state
        .analytics_repo
        .stats()
        .map_err(|e| internal_error(&e, "Failed to retrieve analytics"))?;

    Ok(Json(AnalyticsResponse {
        top_questions,
        stats,
    }))
}

/// Build admin router with API key authentication
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/knowledge", get(list_knowledge))
        .route("/knowledge/upload", post(upload_knowledge))
        .route("/knowledge/import", post(import_knowledge))
        .route("/knowledge/{source}", delete(delete_knowledge))
        .route("/scrape", post(scrape_website))
        .route("/analytics", get(analytics))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin_key))
        .with_state(state)
}
