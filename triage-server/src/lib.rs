//! HTTP surface for the incident triage engine.

pub mod config;
pub mod error;
pub mod routes;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use triage_core::OpsDesk;

pub const CORS_ENV: &str = "OPS_TRIAGE_CORS_ORIGINS";

#[derive(Clone)]
pub struct AppState {
    pub desk: OpsDesk,
}

impl AppState {
    pub fn new(desk: OpsDesk) -> Self {
        Self { desk }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::healthcheck))
        .route(
            "/incidents",
            post(routes::create_incident).get(routes::list_incidents),
        )
        .route("/incidents/:id", axum::routing::patch(routes::patch_incident))
        .route("/incidents/:id/timeline", get(routes::incident_timeline))
        .route("/ops/active-incidents", get(routes::active_incidents))
        .route("/ops/health", get(routes::ops_health))
        .route("/ops/recommendations", get(routes::ops_recommendations))
        .route(
            "/ops/recommendations/summary",
            get(routes::ops_recommendation_summary),
        )
        .route("/ops/kpis", get(routes::ops_kpis))
        .route("/triage", post(routes::triage))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    cors_from(std::env::var(CORS_ENV).ok().as_deref())
}

/// Any method and header. Origins come from a comma-separated list, `*`
/// allows every origin, and no list means same-origin only.
fn cors_from(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let Some(origins) = origins.map(str::trim).filter(|o| !o.is_empty()) else {
        return base;
    };

    tracing::info!(origins = %origins, "CORS: allowing configured origins");
    if origins == "*" {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    base.allow_origin(allowed)
}
