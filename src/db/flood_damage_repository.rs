use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::db::{DbError, FloodDamage, FloodDamageCluster, NewFloodDamage};
use crate::spatial::Viewport;

const FLOOD_DAMAGE_COLUMNS: &str =
    "id, sequence, address, damage_date, latitude, longitude, created_at, updated_at";

#[derive(Clone)]
pub struct FloodDamageRepository {
    pool: PgPool,
}

impl FloodDamageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every record, newest insert first
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<FloodDamage>, DbError> {
        let sql = format!(
            "SELECT {FLOOD_DAMAGE_COLUMNS} FROM flood_damages ORDER BY created_at DESC, id DESC"
        );
        let records = sqlx::query_as::<_, FloodDamage>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!("Found {} flood damage records", records.len());
        Ok(records)
    }

    /// Grid-bucket the records inside `viewport` in a single statement.
    ///
    /// Cells are `floor(coord / grid_size)`; each row is one occupied cell
    /// with its mean position and member count.
    #[instrument(skip(self))]
    pub async fn aggregate_clusters(
        &self,
        viewport: &Viewport,
        grid_size: f64,
    ) -> Result<Vec<FloodDamageCluster>, DbError> {
        let clusters = sqlx::query_as::<_, FloodDamageCluster>(
            r#"
            SELECT FLOOR(latitude / $5::float8)::BIGINT AS lat_grid,
                   FLOOR(longitude / $5::float8)::BIGINT AS lng_grid,
                   AVG(latitude) AS latitude,
                   AVG(longitude) AS longitude,
                   COUNT(*) AS count
            FROM flood_damages
            WHERE latitude BETWEEN $1 AND $2
              AND longitude BETWEEN $3 AND $4
            GROUP BY lat_grid, lng_grid
            ORDER BY lat_grid, lng_grid
            "#,
        )
        .bind(viewport.south)
        .bind(viewport.north)
        .bind(viewport.west)
        .bind(viewport.east)
        .bind(grid_size)
        .fetch_all(&self.pool)
        .await?;

        debug!("Aggregated viewport into {} clusters", clusters.len());
        Ok(clusters)
    }

    #[instrument(skip(self, record), fields(sequence = record.sequence))]
    pub async fn insert(&self, record: &NewFloodDamage) -> Result<FloodDamage, DbError> {
        let sql = format!(
            r#"
            INSERT INTO flood_damages (sequence, address, damage_date, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FLOOD_DAMAGE_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, FloodDamage>(&sql)
            .bind(record.sequence)
            .bind(&record.address)
            .bind(&record.damage_date)
            .bind(record.latitude)
            .bind(record.longitude)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    sequence = record.sequence,
                    address = %record.address,
                    error = %e,
                    "Failed to insert flood damage record"
                );
                e
            })?;

        Ok(saved)
    }

    /// Insert or refresh the row for `record.sequence`; keeps the original created_at
    #[instrument(skip(self, record), fields(sequence = record.sequence))]
    pub async fn upsert(&self, record: &NewFloodDamage) -> Result<FloodDamage, DbError> {
        let sql = format!(
            r#"
            INSERT INTO flood_damages (sequence, address, damage_date, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (sequence) DO UPDATE SET
                address = EXCLUDED.address,
                damage_date = EXCLUDED.damage_date,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                updated_at = NOW()
            RETURNING {FLOOD_DAMAGE_COLUMNS}
            "#
        );
        let saved = sqlx::query_as::<_, FloodDamage>(&sql)
            .bind(record.sequence)
            .bind(&record.address)
            .bind(&record.damage_date)
            .bind(record.latitude)
            .bind(record.longitude)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(
                    sequence = record.sequence,
                    address = %record.address,
                    error = %e,
                    "Failed to upsert flood damage record"
                );
                e
            })?;

        Ok(saved)
    }

    /// Clear the whole collection
    #[instrument(skip(self))]
    pub async fn delete_all(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM flood_damages")
            .execute(&self.pool)
            .await?;

        info!("Deleted {} flood damage records", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Delete every row whose sequence is not in `keep`
    #[instrument(skip(self, keep), fields(keep = keep.len()))]
    pub async fn delete_except(&self, keep: &[i64]) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM flood_damages WHERE NOT (sequence = ANY($1))")
            .bind(keep)
            .execute(&self.pool)
            .await?;

        info!("Removed {} stale flood damage records", result.rows_affected());
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<usize, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flood_damages")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}
