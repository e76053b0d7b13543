//! HTTP API Handlers
//!
//! Axum endpoints that expose the query service to the network. State is
//! injected through `Extension` layers; admin endpoints additionally check
//! the configured API key. The autocomplete path enforces the request
//! deadline here and hands a search event to the ingestion pipeline after
//! every served query.

use super::engine::{AutocompleteService, MAX_LIMIT};
use super::types::{AutocompleteRequest, AutocompleteResponse, SearchEvent, Suggestion};
use super::validate::{
    sanitize_query, validate_query, validate_session_id, validate_term, validate_user_id,
};
use crate::error::ApiError;
use crate::metrics::{Metrics, MetricsSnapshot, START_TIME};
use crate::pipeline::DataPipeline;
use crate::pipeline::types::PipelineStats;
use axum::extract::{ConnectInfo, Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::System;

/// API key required on admin routes; `None` disables the check.
#[derive(Debug, Clone)]
pub struct AdminKey(pub Option<String>);

/// Per-request deadline for the autocomplete path.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub q: String,
    pub limit: Option<usize>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrequencyParams {
    pub frequency: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AddSuggestionResponse {
    pub message: String,
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct BatchAddResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdateFrequencyResponse {
    pub message: String,
    pub term: String,
    pub frequency: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteSuggestionResponse {
    pub message: String,
    pub term: String,
}

#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub suggestions_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub service: MetricsSnapshot,
    pub index: IndexStats,
    pub pipeline: PipelineStats,
    pub uptime: String,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<Utc>,
    pub version: &'static str,
}

pub async fn handle_autocomplete_get(
    Query(params): Query<AutocompleteParams>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(pipeline): Extension<Arc<DataPipeline>>,
    Extension(timeout): Extension<RequestTimeout>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let request = AutocompleteRequest {
        query: params.q,
        // GET clients sometimes send limit=0; treat anything out of range
        // as unset, same as a missing parameter.
        limit: params.limit.filter(|limit| (1..=MAX_LIMIT).contains(limit)),
        user_id: params.user_id,
        session_id: params.session_id,
    };

    serve_autocomplete(request, Some(addr), service, pipeline, timeout).await
}

pub async fn handle_autocomplete_post(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(pipeline): Extension<Arc<DataPipeline>>,
    Extension(timeout): Extension<RequestTimeout>,
    Json(request): Json<AutocompleteRequest>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    serve_autocomplete(request, Some(addr), service, pipeline, timeout).await
}

async fn serve_autocomplete(
    mut request: AutocompleteRequest,
    client_addr: Option<SocketAddr>,
    service: Arc<AutocompleteService>,
    pipeline: Arc<DataPipeline>,
    timeout: RequestTimeout,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    if request.query.is_empty() {
        return Err(ApiError::validation(
            "Query is required",
            "the query parameter must not be empty",
        ));
    }

    if let Err(e) = validate_query(&request.query) {
        service.metrics().record_error("api", "validation_failed");
        return Err(e);
    }
    request.query = sanitize_query(&request.query);

    if let Some(user_id) = request.user_id.as_deref() {
        validate_user_id(user_id)?;
    }
    if let Some(session_id) = request.session_id.as_deref() {
        validate_session_id(session_id)?;
    }
    request.limit = request.limit.map(|limit| limit.clamp(1, MAX_LIMIT));

    let event = SearchEvent {
        query: request.query.clone(),
        user_id: request.user_id.clone(),
        session_id: request.session_id.clone(),
        client_addr: client_addr.map(|addr| addr.to_string()),
        at: Utc::now(),
    };

    let response = tokio::time::timeout(timeout.0, service.get_suggestions(request))
        .await
        .map_err(|_| ApiError::timeout("autocomplete"))?;

    // Recording the event is best-effort; the read path never fails
    // because the pipeline could not take it.
    if let Err(e) = pipeline.enqueue(event) {
        tracing::warn!("Failed to record search event: {}", e);
    }

    Ok(Json(response))
}

pub async fn handle_add_suggestion(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(admin_key): Extension<AdminKey>,
    Json(suggestion): Json<Suggestion>,
) -> Result<(StatusCode, Json<AddSuggestionResponse>), ApiError> {
    require_api_key(&headers, &admin_key)?;

    if suggestion.term.is_empty() {
        return Err(ApiError::validation(
            "Term is required",
            "the suggestion term must not be empty",
        ));
    }
    validate_term(&suggestion.term)?;

    let term = suggestion.term.clone();
    service.add_suggestion(suggestion);

    Ok((
        StatusCode::CREATED,
        Json(AddSuggestionResponse {
            message: "Suggestion added successfully".to_string(),
            term,
        }),
    ))
}

pub async fn handle_batch_add_suggestions(
    headers: HeaderMap,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(admin_key): Extension<AdminKey>,
    Json(suggestions): Json<Vec<Suggestion>>,
) -> Result<(StatusCode, Json<BatchAddResponse>), ApiError> {
    require_api_key(&headers, &admin_key)?;

    if suggestions.is_empty() {
        return Err(ApiError::validation(
            "No suggestions provided",
            "the request body must contain at least one suggestion",
        ));
    }
    if suggestions.len() > 1000 {
        return Err(ApiError::validation(
            "Too many suggestions",
            "a batch may contain at most 1000 suggestions",
        ));
    }

    for (i, suggestion) in suggestions.iter().enumerate() {
        if let Err(e) = validate_term(&suggestion.term) {
            let details = match e {
                ApiError::Validation { details, .. } => details,
                other => other.to_string(),
            };
            return Err(ApiError::validation(
                "Invalid term in batch",
                format!("suggestion {}: {}", i + 1, details),
            ));
        }
    }

    let count = suggestions.len();
    service.batch_add_suggestions(suggestions);

    Ok((
        StatusCode::CREATED,
        Json(BatchAddResponse {
            message: "Suggestions added successfully".to_string(),
            count,
        }),
    ))
}

pub async fn handle_update_frequency(
    headers: HeaderMap,
    Path(term): Path<String>,
    Query(params): Query<FrequencyParams>,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(admin_key): Extension<AdminKey>,
) -> Result<Json<UpdateFrequencyResponse>, ApiError> {
    require_api_key(&headers, &admin_key)?;
    validate_term(&term)?;

    let frequency = params.frequency.ok_or_else(|| {
        ApiError::validation(
            "Frequency is required",
            "the frequency query parameter must be a non-negative integer",
        )
    })?;

    if !service.update_frequency(&term, frequency) {
        return Err(ApiError::not_found("suggestion"));
    }

    Ok(Json(UpdateFrequencyResponse {
        message: "Frequency updated successfully".to_string(),
        term,
        frequency,
    }))
}

pub async fn handle_delete_suggestion(
    headers: HeaderMap,
    Path(term): Path<String>,
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(admin_key): Extension<AdminKey>,
) -> Result<Json<DeleteSuggestionResponse>, ApiError> {
    require_api_key(&headers, &admin_key)?;
    validate_term(&term)?;

    if !service.delete_suggestion(&term) {
        return Err(ApiError::not_found("suggestion"));
    }

    Ok(Json(DeleteSuggestionResponse {
        message: "Suggestion deleted successfully".to_string(),
        term,
    }))
}

pub async fn handle_stats(
    Extension(service): Extension<Arc<AutocompleteService>>,
    Extension(pipeline): Extension<Arc<DataPipeline>>,
    Extension(metrics): Extension<Arc<Metrics>>,
) -> Json<StatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(StatsResponse {
        service: metrics.snapshot(),
        index: IndexStats {
            suggestions_count: service.index_size(),
        },
        pipeline: pipeline.stats(),
        uptime: format!("{:?}", START_TIME.elapsed()),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}

pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn require_api_key(headers: &HeaderMap, admin_key: &AdminKey) -> Result<(), ApiError> {
    let Some(expected) = &admin_key.0 else {
        return Ok(());
    };

    let provided = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected.as_str()) {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}
