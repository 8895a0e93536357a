//! REST API handlers using axum

use crate::analysis::{self, GlobalPredicate};
use crate::models::{GlobalCompliance, GroupCompliance, ObservationRecord, TechniqueCount};
use crate::store::{RecordStore, StoreError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub global_predicate: GlobalPredicate,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, global_predicate: GlobalPredicate) -> Self {
        Self {
            store,
            global_predicate,
        }
    }

    async fn records(&self, context: &'static str) -> Result<Vec<ObservationRecord>, ApiError> {
        self.store
            .all()
            .await
            .map_err(|source| ApiError::new(context, source))
    }
}

pub type SharedState = Arc<AppState>;

/// Error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub error: String,
}

impl ApiError {
    fn new(context: &str, source: StoreError) -> Self {
        error!(error = %source, "{}", context);
        Self {
            message: context.to_string(),
            error: source.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

fn groups_json(groups: &[GroupCompliance], key_name: &str) -> Json<Value> {
    Json(Value::Array(
        groups.iter().map(|g| g.to_json(key_name)).collect(),
    ))
}

// ===== Handlers =====

/// GET / - plain-text banner.
pub async fn index() -> &'static str {
    "Hand-hygiene dashboard API is running."
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/observaciones/global-compliance
pub async fn global_compliance(
    State(state): State<SharedState>,
) -> Result<Json<GlobalCompliance>, ApiError> {
    let records = state.records("Failed to compute global compliance").await?;
    let summary = analysis::global_compliance(&records, state.global_predicate);
    debug!(total = summary.total, compliant = summary.compliant, "Global compliance");
    Ok(Json(summary))
}

/// GET /api/observaciones/stats-sector
pub async fn stats_sector(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let records = state.records("Failed to process sectors").await?;
    Ok(groups_json(&analysis::compliance_by_sector(&records), "sector"))
}

/// GET /api/observaciones/stats-professional
pub async fn stats_professional(
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    let records = state.records("Failed to process professional roles").await?;
    Ok(groups_json(
        &analysis::compliance_by_professional_role(&records),
        "rol",
    ))
}

/// GET /api/observaciones/stats-moment
pub async fn stats_moment(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let records = state.records("Failed to process moments").await?;
    Ok(groups_json(&analysis::compliance_by_moment(&records), "momento"))
}

/// GET /api/observaciones/stats-techniques
pub async fn stats_techniques(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TechniqueCount>>, ApiError> {
    let records = state.records("Failed to process techniques").await?;
    Ok(Json(analysis::technique_usage(&records)))
}

/// GET /api/observaciones/stats-shift
pub async fn stats_shift(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let records = state.records("Failed to process shifts").await?;
    Ok(groups_json(&analysis::compliance_by_shift(&records), "turno"))
}

/// GET /api/observaciones/stats-sector-detalle/:sector
///
/// Role ranking inside one sector. An unknown sector yields an empty list.
pub async fn stats_sector_detail(
    State(state): State<SharedState>,
    Path(sector): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let records = state.records("Failed to process sector detail").await?;
    Ok(groups_json(
        &analysis::sector_role_breakdown(&records, &sector),
        "personal",
    ))
}
