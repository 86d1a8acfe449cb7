use sqlx::PgPool;
use tracing::{debug, error, instrument};

use crate::db::{DbError, NewReport, Report, ReportSummary};

#[derive(Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a report; status and created_at come from column defaults
    #[instrument(skip(self, report), fields(report_id = %report.report_id))]
    pub async fn insert(&self, report: &NewReport) -> Result<Report, DbError> {
        debug!("Inserting report");

        let saved = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (
                report_id, clogging_level, cause_type, cause_detail, description,
                phone_number, latitude, longitude, photo_url, thumbnail_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, report_id, clogging_level, cause_type, cause_detail, description,
                      phone_number, latitude, longitude, photo_url, thumbnail_url,
                      status, created_at
            "#,
        )
        .bind(&report.report_id)
        .bind(&report.clogging_level)
        .bind(&report.cause_type)
        .bind(&report.cause_detail)
        .bind(&report.description)
        .bind(&report.phone_number)
        .bind(report.latitude)
        .bind(report.longitude)
        .bind(&report.photo_url)
        .bind(&report.thumbnail_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                report_id = %report.report_id,
                error = %e,
                "Failed to insert report"
            );
            e
        })?;

        debug!("Inserted report row id={}", saved.id);
        Ok(saved)
    }

    /// Map-marker projection of every report, newest first
    #[instrument(skip(self))]
    pub async fn find_all_summaries(&self) -> Result<Vec<ReportSummary>, DbError> {
        let summaries = sqlx::query_as::<_, ReportSummary>(
            r#"
            SELECT report_id, latitude, longitude, clogging_level
            FROM reports
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} reports", summaries.len());
        Ok(summaries)
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    pub async fn find_by_report_id(&self, report_id: &str) -> Result<Option<Report>, DbError> {
        debug!("Querying report by report_id");

        let report = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, report_id, clogging_level, cause_type, cause_detail, description,
                   phone_number, latitude, longitude, photo_url, thumbnail_url,
                   status, created_at
            FROM reports
            WHERE report_id = $1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        if report.is_some() {
            debug!("Found report");
        } else {
            debug!("Report not found");
        }

        Ok(report)
    }
}
