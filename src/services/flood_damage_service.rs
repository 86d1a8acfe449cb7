use tracing::{debug, instrument};

use crate::db::{DbError, FloodDamage, FloodDamageCluster, FloodDamageRepository};
use crate::spatial::{grid_size, Viewport};

#[derive(Clone)]
pub struct FloodDamageService {
    flood_damage_repo: FloodDamageRepository,
}

impl FloodDamageService {
    pub fn new(flood_damage_repo: FloodDamageRepository) -> Self {
        Self { flood_damage_repo }
    }

    /// Raw records for bulk export
    pub async fn get_all(&self) -> Result<Vec<FloodDamage>, DbError> {
        self.flood_damage_repo.find_all().await
    }

    /// Density-reduced view of the records inside `viewport`.
    ///
    /// Without a viewport nothing is queried and the result is empty.
    #[instrument(skip(self))]
    pub async fn get_clusters(
        &self,
        viewport: Option<Viewport>,
        zoom: i32,
    ) -> Result<Vec<FloodDamageCluster>, DbError> {
        let Some(viewport) = viewport else {
            debug!("Viewport incomplete, skipping aggregation");
            return Ok(Vec::new());
        };

        let size = grid_size(zoom);
        debug!("Aggregating zoom {} with grid size {:.6} degrees", zoom, size);
        self.flood_damage_repo
            .aggregate_clusters(&viewport, size)
            .await
    }
}
