use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::classification::{CauseType, CloggingLevel, UnknownOption};
use crate::db::{DbError, NewReport, Report, ReportRepository, ReportSummary};
use crate::uploads::PhotoStore;

pub const MAX_DESCRIPTION_CHARS: usize = 300;
pub const PHONE_NUMBER_DIGITS: usize = 11;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Photo is required.")]
    MissingPhoto,

    #[error("{field} is required.")]
    MissingField { field: &'static str },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error(transparent)]
    UnknownOption(#[from] UnknownOption),

    #[error("Failed to store photo: {0}")]
    PhotoStorage(#[from] std::io::Error),

    #[error("DB error while saving report: {0}")]
    Database(#[from] DbError),
}

/// Text fields of the report form exactly as submitted
#[derive(Debug, Clone, Default)]
pub struct ReportSubmission {
    pub clogging_level: Option<String>,
    pub cause_type: Option<String>,
    pub cause_detail: Option<String>,
    pub description: Option<String>,
    pub phone_number: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl ReportSubmission {
    /// Record a multipart text field by its form name; unknown names are ignored
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "cloggingLevel" => &mut self.clogging_level,
            "causeType" => &mut self.cause_type,
            "causeDetail" => &mut self.cause_detail,
            "description" => &mut self.description,
            "phoneNumber" => &mut self.phone_number,
            "latitude" => &mut self.latitude,
            "longitude" => &mut self.longitude,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Check every field and produce the typed form
    pub fn validate(&self) -> Result<ValidatedReport, ReportError> {
        let clogging_level: CloggingLevel =
            required(&self.clogging_level, "cloggingLevel")?.parse()?;
        let cause_type: CauseType = required(&self.cause_type, "causeType")?.parse()?;

        let cause_detail = optional(&self.cause_detail);
        if cause_type.requires_detail() && cause_detail.is_none() {
            return Err(ReportError::MissingField {
                field: "causeDetail",
            });
        }

        let description = optional(&self.description);
        if let Some(text) = &description {
            let chars = text.chars().count();
            if chars > MAX_DESCRIPTION_CHARS {
                return Err(ReportError::InvalidField {
                    field: "description",
                    reason: format!("{chars} characters exceeds the {MAX_DESCRIPTION_CHARS} limit"),
                });
            }
        }

        let phone_number = required(&self.phone_number, "phoneNumber")?.to_string();
        if phone_number.len() != PHONE_NUMBER_DIGITS
            || !phone_number.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ReportError::InvalidField {
                field: "phoneNumber",
                reason: format!("expected {PHONE_NUMBER_DIGITS} digits"),
            });
        }

        let latitude = coordinate(&self.latitude, "latitude", 90.0)?;
        let longitude = coordinate(&self.longitude, "longitude", 180.0)?;

        Ok(ValidatedReport {
            clogging_level,
            cause_type,
            cause_detail,
            description,
            phone_number,
            latitude,
            longitude,
        })
    }
}

/// Report fields after server-side checks
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedReport {
    pub clogging_level: CloggingLevel,
    pub cause_type: CauseType,
    pub cause_detail: Option<String>,
    pub description: Option<String>,
    pub phone_number: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Uploaded photo held in memory until validation passes
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ReportError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ReportError::MissingField { field })
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coordinate(value: &Option<String>, field: &'static str, limit: f64) -> Result<f64, ReportError> {
    let raw = required(value, field)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| ReportError::InvalidField {
            field,
            reason: format!("'{raw}' is not a coordinate within ±{limit}"),
        })
}

/// Hands out millisecond-timestamp ids, bumping by one when two reports
/// arrive within the same millisecond
#[derive(Debug, Clone, Default)]
pub struct ReportIdGenerator {
    last_millis: Arc<AtomicI64>,
}

static PROCESS_REPORT_IDS: OnceLock<ReportIdGenerator> = OnceLock::new();

impl ReportIdGenerator {
    /// Generator with its own counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide generator shared by every `ReportService`
    pub fn shared() -> Self {
        PROCESS_REPORT_IDS.get_or_init(Self::new).clone()
    }

    pub fn next_id(&self) -> String {
        self.next_after(Utc::now().timestamp_millis()).to_string()
    }

    fn next_after(&self, now_millis: i64) -> i64 {
        let mut last = self.last_millis.load(Ordering::Acquire);
        loop {
            let candidate = now_millis.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}

#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    photo_store: PhotoStore,
    ids: ReportIdGenerator,
}

impl ReportService {
    pub fn new(report_repo: ReportRepository, photo_store: PhotoStore) -> Self {
        Self {
            report_repo,
            photo_store,
            ids: ReportIdGenerator::shared(),
        }
    }

    /// Validate, store the photo, then persist the report.
    ///
    /// The photo is only written after validation passes, and is removed
    /// again if the insert fails.
    #[instrument(skip(self, submission, photo))]
    pub async fn submit(
        &self,
        submission: &ReportSubmission,
        photo: Option<PhotoUpload>,
    ) -> Result<Report, ReportError> {
        let photo = photo
            .filter(|p| !p.bytes.is_empty())
            .ok_or(ReportError::MissingPhoto)?;
        let validated = submission.validate()?;

        let report_id = self.ids.next_id();
        let stored = self
            .photo_store
            .save(&report_id, photo.file_name.as_deref(), &photo.bytes)
            .await?;

        let new_report = NewReport {
            report_id: report_id.clone(),
            clogging_level: validated.clogging_level.to_string(),
            cause_type: validated.cause_type.to_string(),
            cause_detail: validated.cause_detail,
            description: validated.description,
            phone_number: validated.phone_number,
            latitude: validated.latitude,
            longitude: validated.longitude,
            photo_url: stored.url().to_string(),
            thumbnail_url: stored.url().to_string(),
        };

        let saved = match self.report_repo.insert(&new_report).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("Discarding photo for report {} after insert failure", report_id);
                return Err(e.into());
            }
        };
        stored.commit();

        info!(
            "Saved report {} ({}, {}) at ({}, {})",
            saved.report_id, saved.clogging_level, saved.cause_type, saved.latitude, saved.longitude
        );
        Ok(saved)
    }

    pub async fn list_summaries(&self) -> Result<Vec<ReportSummary>, DbError> {
        self.report_repo.find_all_summaries().await
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Option<Report>, DbError> {
        self.report_repo.find_by_report_id(report_id).await
    }
}
