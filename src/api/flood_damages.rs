use axum::{
    extract::{Query, State},
    Json,
};
use tracing::{debug, error, info, instrument, warn};

use super::error::ApiError;
use super::AppState;
use crate::db::{FloodDamage, FloodDamageCluster};
use crate::spatial::ViewportQuery;

#[utoipa::path(
    get,
    path = "/api/flood-damages/all",
    responses(
        (status = 200, description = "Every flood-damage record, newest first", body = [FloodDamage]),
        (status = 500, description = "Storage failure", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state))]
pub(super) async fn get_all_flood_damages(
    State(state): State<AppState>,
) -> Result<Json<Vec<FloodDamage>>, ApiError> {
    let records = state.flood_damage_service.get_all().await.map_err(|e| {
        error!("Failed to fetch flood damage records: {}", e);
        ApiError::from(e)
    })?;

    info!("Retrieved {} flood damage records", records.len());
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/flood-damages",
    params(
        ("zoom" = Option<i32>, Query, description = "Map zoom level, default 10"),
        ("north" = Option<f64>, Query, description = "Northern bound (degrees)"),
        ("south" = Option<f64>, Query, description = "Southern bound (degrees)"),
        ("east" = Option<f64>, Query, description = "Eastern bound (degrees)"),
        ("west" = Option<f64>, Query, description = "Western bound (degrees)")
    ),
    responses(
        (status = 200, description = "Grid clusters inside the viewport; empty when a bound is missing", body = [FloodDamageCluster]),
        (status = 400, description = "A bound is not a number", body = super::error::ErrorBody),
        (status = 500, description = "Storage failure", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state))]
pub(super) async fn get_flood_damage_clusters(
    State(state): State<AppState>,
    Query(params): Query<ViewportQuery>,
) -> Result<Json<Vec<FloodDamageCluster>>, ApiError> {
    let zoom = params.zoom();
    let viewport = params.viewport().map_err(|msg| {
        warn!("Rejected viewport query: {}", msg);
        ApiError::BadRequest(msg)
    })?;

    let clusters = state
        .flood_damage_service
        .get_clusters(viewport, zoom)
        .await
        .map_err(|e| {
            error!("Failed to aggregate flood damage data: {}", e);
            ApiError::from(e)
        })?;

    debug!("Returning {} clusters for zoom {}", clusters.len(), zoom);
    Ok(Json(clusters))
}
