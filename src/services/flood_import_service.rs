use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer};
use tracing::{error, info, instrument, warn};

use crate::db::{DbError, FloodDamageRepository, NewFloodDamage};
use crate::geocode_error::GeocodeError;
use crate::geocoder::NaverMapsClient;

/// Pause between geocoding calls to stay under the provider's rate limit
pub const DEFAULT_GEOCODE_DELAY: Duration = Duration::from_millis(100);

/// Error types for flood-damage import operations
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse input file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Geocoding unavailable: {0}")]
    Geocode(#[from] GeocodeError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

/// One row of the municipal flood-damage dataset
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FloodDamageRecord {
    #[serde(rename = "연번")]
    pub sequence: i64,
    #[serde(rename = "주소")]
    pub address: String,
    #[serde(rename = "피해발생일자", deserialize_with = "string_or_number")]
    pub damage_date: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Parse the dataset (a JSON array of rows)
pub fn parse_records(json: &str) -> Result<Vec<FloodDamageRecord>, ImportError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_records(path: &Path) -> Result<Vec<FloodDamageRecord>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    parse_records(&raw)
}

/// How existing rows are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportMode {
    /// Delete every stored record first, then insert
    Replace,
    /// Upsert by sequence, then delete rows absent from the input
    Sync,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    pub removed: u64,
}

/// Sequential geocode-and-store job for the flood-damage dataset.
///
/// Must not run concurrently with itself against the same database.
#[derive(Clone)]
pub struct FloodImportService {
    flood_damage_repo: FloodDamageRepository,
    geocoder: NaverMapsClient,
    delay: Duration,
}

impl FloodImportService {
    pub fn new(flood_damage_repo: FloodDamageRepository, geocoder: NaverMapsClient) -> Self {
        Self {
            flood_damage_repo,
            geocoder,
            delay: DEFAULT_GEOCODE_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Geocode every record and store the successes.
    ///
    /// Rows that fail to geocode or to save are logged and skipped;
    /// `on_progress` is called after each row with the running index.
    #[instrument(skip(self, records, on_progress), fields(total = records.len(), mode = ?mode))]
    pub async fn run<F>(
        &self,
        records: &[FloodDamageRecord],
        mode: ImportMode,
        mut on_progress: F,
    ) -> Result<ImportStats, ImportError>
    where
        F: FnMut(usize, &FloodDamageRecord),
    {
        let start_time = Instant::now();

        // Refuse before touching the table if every lookup would fail
        if !self.geocoder.has_credentials() {
            return Err(GeocodeError::MissingCredentials.into());
        }

        let mut stats = ImportStats {
            total: records.len(),
            ..ImportStats::default()
        };

        if mode == ImportMode::Replace {
            let deleted = self.flood_damage_repo.delete_all().await?;
            info!("Cleared {} existing flood damage records", deleted);
        }

        for (index, record) in records.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if self.import_one(record, mode).await {
                stats.imported += 1;
            } else {
                stats.skipped += 1;
            }
            on_progress(index + 1, record);
        }

        if mode == ImportMode::Sync {
            let keep: Vec<i64> = records.iter().map(|r| r.sequence).collect();
            stats.removed = self.flood_damage_repo.delete_except(&keep).await?;
        }

        info!(
            "Flood damage import finished in {:.1}s: {} imported, {} skipped, {} removed of {} rows",
            start_time.elapsed().as_secs_f64(),
            stats.imported,
            stats.skipped,
            stats.removed,
            stats.total
        );
        Ok(stats)
    }

    /// Returns whether the row ended up stored
    async fn import_one(&self, record: &FloodDamageRecord, mode: ImportMode) -> bool {
        let coordinates = match self.geocoder.geocode(&record.address).await {
            Ok(Some(coordinates)) => coordinates,
            Ok(None) => {
                warn!(
                    sequence = record.sequence,
                    "No geocoding result for address: {}", record.address
                );
                return false;
            }
            Err(e) => {
                warn!(
                    sequence = record.sequence,
                    "Geocoding failed for address {}: {}", record.address, e
                );
                return false;
            }
        };

        let new_record = NewFloodDamage {
            sequence: record.sequence,
            address: record.address.clone(),
            damage_date: record.damage_date.clone(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        };

        let result = match mode {
            ImportMode::Replace => self.flood_damage_repo.insert(&new_record).await,
            ImportMode::Sync => self.flood_damage_repo.upsert(&new_record).await,
        };

        match result {
            Ok(saved) => {
                info!(
                    "Saved {} (lat: {}, lng: {})",
                    saved.address, saved.latitude, saved.longitude
                );
                true
            }
            Err(e) => {
                error!(sequence = record.sequence, "Failed to save record: {}", e);
                false
            }
        }
    }
}
