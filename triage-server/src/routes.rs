use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use triage_core::desk::{
    RecommendationSummary, DEFAULT_ACTIVE_LIMIT, DEFAULT_KPI_WINDOW_DAYS, DEFAULT_LIST_LIMIT,
    DEFAULT_LIST_WINDOW_DAYS, DEFAULT_TOP_N,
};
use triage_core::health::HealthReport;
use triage_core::kpi::KpiReport;
use triage_core::recommend::RecommendationReport;
use triage_core::triage::TriageSuggestion;
use triage_core::{Incident, OpsDesk, PatchFields, Priority, Status, TimelineEvent, TriageError};
use triage_schema::{
    validate_create_v1, validate_patch_v1, validate_triage_v1, CreateIncidentV1, PatchIncidentV1,
    TriageRequestV1,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub days: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopNParams {
    pub top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysParams {
    pub days: Option<i64>,
}

pub async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn create_incident(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Incident>, ApiError> {
    let req: CreateIncidentV1 = parse_payload(payload)?;
    validate_create_v1(&req).map_err(ApiError::bad_request)?;
    let priority: Priority = req.priority.parse()?;

    let incident = blocking(&state, move |desk| {
        desk.create(&req.title, &req.description, priority)
    })
    .await?;
    Ok(Json(incident))
}

pub async fn list_incidents(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Status>)
        .transpose()?;
    let days = params.days.unwrap_or(DEFAULT_LIST_WINDOW_DAYS);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let incidents = blocking(&state, move |desk| desk.list_incidents(status, days, limit)).await?;
    Ok(Json(incidents))
}

pub async fn active_incidents(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_ACTIVE_LIMIT);
    let incidents = blocking(&state, move |desk| desk.list_active(limit)).await?;
    Ok(Json(incidents))
}

pub async fn patch_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Incident>, ApiError> {
    let req: PatchIncidentV1 = parse_payload(payload)?;
    validate_patch_v1(&req).map_err(ApiError::bad_request)?;
    let fields = to_fields(req)?;

    let incident = blocking(&state, move |desk| desk.apply_patch_fields(&id, fields)).await?;
    Ok(Json(incident))
}

pub async fn incident_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TimelineEvent>>, ApiError> {
    let events = blocking(&state, move |desk| desk.timeline(&id)).await?;
    Ok(Json(events))
}

pub async fn ops_health(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    let report = blocking(&state, |desk| desk.health()).await?;
    Ok(Json(report))
}

pub async fn ops_recommendations(
    State(state): State<AppState>,
    Query(params): Query<TopNParams>,
) -> Result<Json<RecommendationReport>, ApiError> {
    let top_n = params.top_n.unwrap_or(DEFAULT_TOP_N);
    let report = blocking(&state, move |desk| desk.recommendations(top_n)).await?;
    Ok(Json(report))
}

pub async fn ops_recommendation_summary(
    State(state): State<AppState>,
) -> Result<Json<RecommendationSummary>, ApiError> {
    let summary = blocking(&state, |desk| desk.recommendation_summary()).await?;
    Ok(Json(summary))
}

pub async fn ops_kpis(
    State(state): State<AppState>,
    Query(params): Query<DaysParams>,
) -> Result<Json<KpiReport>, ApiError> {
    let days = params.days.unwrap_or(DEFAULT_KPI_WINDOW_DAYS);
    let report = blocking(&state, move |desk| desk.kpis(days)).await?;
    Ok(Json(report))
}

pub async fn triage(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<TriageSuggestion>, ApiError> {
    let req: TriageRequestV1 = parse_payload(payload)?;
    validate_triage_v1(&req).map_err(ApiError::bad_request)?;
    Ok(Json(state.desk.classify(&req.title, &req.description)))
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::bad_request(format!("invalid payload: {e}")))
}

/// Only the status is parsed here; priority and role are checked by the
/// desk once the incident and transition are known to be valid.
fn to_fields(req: PatchIncidentV1) -> Result<PatchFields, TriageError> {
    Ok(PatchFields {
        status: req.status.parse()?,
        priority: req.priority,
        resolved_by: req.resolved_by,
        resolution_notes: req.resolution_notes,
        note: req.note,
    })
}

/// Runs store-bound work off the async runtime.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&OpsDesk) -> Result<T, TriageError> + Send + 'static,
{
    let desk = state.desk.clone();
    tokio::task::spawn_blocking(move || work(&desk))
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}
