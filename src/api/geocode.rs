use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct ReverseGeocodeParams {
    latitude: Option<String>,
    longitude: Option<String>,
}

fn parse_coordinate(raw: &Option<String>) -> Option<f64> {
    raw.as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[utoipa::path(
    get,
    path = "/api/geocode/reverse",
    params(
        ("latitude" = f64, Query, description = "WGS84 latitude"),
        ("longitude" = f64, Query, description = "WGS84 longitude")
    ),
    responses(
        (status = 200, description = "Provider response, passed through unchanged"),
        (status = 400, description = "Latitude or longitude missing", body = super::error::ErrorBody),
        (status = 500, description = "Provider credentials not configured", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state))]
pub(super) async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<ReverseGeocodeParams>,
) -> Result<Json<Value>, ApiError> {
    if !state.geocoder.has_credentials() {
        error!("Reverse geocode requested but Naver Maps credentials are not configured");
        return Err(crate::geocode_error::GeocodeError::MissingCredentials.into());
    }

    let (Some(latitude), Some(longitude)) = (
        parse_coordinate(&params.latitude),
        parse_coordinate(&params.longitude),
    ) else {
        warn!("Reverse geocode request without usable coordinates");
        return Err(ApiError::BadRequest(
            "Latitude and longitude are required.".to_string(),
        ));
    };

    let body = state
        .geocoder
        .reverse_geocode(latitude, longitude)
        .await
        .map_err(|e| {
            error!("Error proxying to Naver Maps API: {}", e);
            ApiError::from(e)
        })?;

    info!("Reverse geocoded ({}, {})", latitude, longitude);
    Ok(Json(body))
}
