use std::path::PathBuf;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, instrument};
use utoipa::{OpenApi, ToSchema};

use crate::geocoder::NaverMapsClient;
use crate::services::{FloodDamageService, ReportService};
use crate::uploads::UPLOADS_URL_PREFIX;

pub mod error;
mod flood_damages;
mod geocode;
mod reports;

pub use error::{ApiError, ErrorBody};
pub use reports::{CreateReportResponse, ReportUploadForm};

/// Room for the text fields that ride along with the photo
const FORM_FIELDS_ALLOWANCE: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub report_service: ReportService,
    pub flood_damage_service: FloodDamageService,
    pub geocoder: NaverMapsClient,
    pub upload_dir: PathBuf,
    pub max_photo_bytes: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        reports::list_reports,
        reports::get_report,
        reports::create_report,
        flood_damages::get_flood_damage_clusters,
        flood_damages::get_all_flood_damages,
        geocode::reverse_geocode
    ),
    components(schemas(
        HealthResponse,
        ErrorBody,
        crate::db::Report,
        crate::db::ReportSummary,
        crate::db::FloodDamage,
        crate::db::FloodDamageCluster,
        CreateReportResponse,
        ReportUploadForm
    )),
    tags((name = "drain-watch", description = "Storm-drain blockage reports and flood-damage map data"))
)]
pub struct ApiDoc;

pub fn generate_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_photo_bytes.saturating_add(FORM_FIELDS_ALLOWANCE);
    let uploads = ServeDir::new(&state.upload_dir);

    let api_routes = Router::new()
        .route("/health", get(health))
        .route(
            "/reports",
            get(reports::list_reports)
                .post(reports::create_report)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/reports/{report_id}", get(reports::get_report))
        .route(
            "/flood-damages",
            get(flood_damages::get_flood_damage_clusters),
        )
        .route(
            "/flood-damages/all",
            get(flood_damages::get_all_flood_damages),
        )
        .route("/geocode/reverse", get(geocode::reverse_geocode))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(CorsLayer::permissive())
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
#[instrument(skip(_state))]
async fn health(State(_state): State<AppState>) -> impl IntoResponse {
    debug!("Health check requested");
    let response = HealthResponse {
        status: "healthy".to_string(),
    };
    (StatusCode::OK, Json(response))
}
