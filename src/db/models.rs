use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::utils::serialize_seoul_time;

// Database entity models
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub report_id: String,
    pub clogging_level: String,
    pub cause_type: String,
    pub cause_detail: Option<String>,
    pub description: Option<String>,
    pub phone_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub photo_url: String,
    pub thumbnail_url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Map-marker projection of a report
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub report_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub clogging_level: String,
}

/// Validated report ready for insert; ids and timestamps are server-assigned
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_id: String,
    pub clogging_level: String,
    pub cause_type: String,
    pub cause_detail: Option<String>,
    pub description: Option<String>,
    pub phone_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub photo_url: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloodDamage {
    pub id: i64,
    pub sequence: i64,
    pub address: String,
    pub damage_date: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(serialize_with = "serialize_seoul_time")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_seoul_time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFloodDamage {
    pub sequence: i64,
    pub address: String,
    pub damage_date: String,
    pub latitude: f64,
    pub longitude: f64,
}

// Derived per request, never stored
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FloodDamageCluster {
    pub lat_grid: i64,
    pub lng_grid: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub count: i64,
}
