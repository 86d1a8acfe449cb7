use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use super::error::ApiError;
use super::AppState;
use crate::db::{Report, ReportSummary};
use crate::services::report_service::{PhotoUpload, ReportError, ReportSubmission};

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateReportResponse {
    pub message: String,
    pub report: Report,
}

/// Multipart body accepted by `POST /api/reports`
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
    pub clogging_level: String,
    pub cause_type: String,
    pub cause_detail: Option<String>,
    pub description: Option<String>,
    pub phone_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[utoipa::path(
    get,
    path = "/api/reports",
    responses(
        (status = 200, description = "All reports, newest first", body = [ReportSummary]),
        (status = 500, description = "Storage failure", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state))]
pub(super) async fn list_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReportSummary>>, ApiError> {
    debug!("Fetching report summaries");
    let reports = state.report_service.list_summaries().await.map_err(|e| {
        error!("Failed to fetch reports: {}", e);
        ApiError::from(e)
    })?;

    info!("Retrieved {} report summaries", reports.len());
    Ok(Json(reports))
}

#[utoipa::path(
    get,
    path = "/api/reports/{reportId}",
    params(("reportId" = String, Path, description = "Time-derived report identifier")),
    responses(
        (status = 200, description = "Full report", body = Report),
        (status = 404, description = "No report with this id", body = super::error::ErrorBody),
        (status = 500, description = "Storage failure", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state), fields(report_id = %report_id))]
pub(super) async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    debug!("Fetching report detail");
    let report = state
        .report_service
        .get_report(&report_id)
        .await
        .map_err(|e| {
            error!("Failed to fetch report {}: {}", report_id, e);
            ApiError::from(e)
        })?
        .ok_or_else(|| {
            warn!("Report {} not found", report_id);
            ApiError::NotFound("Report not found".to_string())
        })?;

    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/reports",
    request_body(content = ReportUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report stored", body = CreateReportResponse),
        (status = 400, description = "Missing photo or invalid field", body = super::error::ErrorBody),
        (status = 413, description = "Photo exceeds the size limit", body = super::error::ErrorBody),
        (status = 500, description = "Photo or database write failed", body = super::error::ErrorBody)
    )
)]
#[instrument(skip(state, multipart))]
pub(super) async fn create_report(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateReportResponse>), ApiError> {
    let mut submission = ReportSubmission::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Rejected multipart body: {}", e);
        ApiError::from(e)
    })? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let file_name = field.file_name().map(str::to_string);
            let bytes = read_photo(field, state.max_photo_bytes).await?;
            debug!("Received photo {:?} ({} bytes)", file_name, bytes.len());
            photo = Some(PhotoUpload { file_name, bytes });
        } else {
            let value = field.text().await.map_err(ApiError::from)?;
            if !submission.set_field(&name, value) {
                debug!("Ignoring unknown form field '{}'", name);
            }
        }
    }

    let report = state
        .report_service
        .submit(&submission, photo)
        .await
        .map_err(|e| {
            match &e {
                ReportError::PhotoStorage(_) | ReportError::Database(_) => {
                    error!("Failed to save report: {}", e)
                }
                _ => warn!("Rejected report submission: {}", e),
            }
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            message: "Report submitted successfully".to_string(),
            report,
        }),
    ))
}

/// Buffer the photo, failing as soon as it passes `limit` bytes
async fn read_photo(mut field: Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(ApiError::from)? {
        if bytes.len() + chunk.len() > limit {
            warn!("Photo exceeds {} byte limit", limit);
            return Err(ApiError::PayloadTooLarge(format!(
                "Photo exceeds the {limit} byte limit."
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
