//! Grid bucketing used to thin flood-damage points for the map.
//!
//! Points inside the viewport are assigned to a regular lat/lng grid whose
//! cell edge is `1 / (2^zoom * 0.1)` degrees, so each zoom step halves the
//! cell size. Every occupied cell becomes one cluster carrying the mean
//! position and the member count.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::db::FloodDamageCluster;

pub const DEFAULT_ZOOM: i32 = 10;

/// Zoom levels beyond this would shrink cells below `f64` precision
pub const MAX_ZOOM: i32 = 30;

/// Cell edge length in degrees for a map zoom level
pub fn grid_size(zoom: i32) -> f64 {
    1.0 / (2f64.powi(zoom.clamp(0, MAX_ZOOM)) * 0.1)
}

/// Map viewport in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Viewport {
    /// Inclusive on every edge
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.south
            && latitude <= self.north
            && longitude >= self.west
            && longitude <= self.east
    }
}

/// Raw query string for the cluster endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewportQuery {
    pub zoom: Option<String>,
    pub north: Option<String>,
    pub south: Option<String>,
    pub east: Option<String>,
    pub west: Option<String>,
}

impl ViewportQuery {
    /// Leading integer of the zoom parameter (`"12.5"` is 12), or
    /// [`DEFAULT_ZOOM`] when there is none.
    ///
    /// Out-of-range values are clamped into `0..=MAX_ZOOM`.
    pub fn zoom(&self) -> i32 {
        self.zoom
            .as_deref()
            .and_then(leading_integer)
            .map(|z| z.clamp(0, MAX_ZOOM as i64) as i32)
            .unwrap_or(DEFAULT_ZOOM)
    }

    /// `Ok(None)` when any bound is missing; `Err` when a bound is present
    /// but not a finite number.
    pub fn viewport(&self) -> Result<Option<Viewport>, String> {
        let bounds = [
            ("north", &self.north),
            ("south", &self.south),
            ("east", &self.east),
            ("west", &self.west),
        ];

        if bounds
            .iter()
            .any(|(_, v)| v.as_deref().map_or(true, |s| s.trim().is_empty()))
        {
            return Ok(None);
        }

        let mut parsed = [0.0f64; 4];
        for (slot, (name, value)) in parsed.iter_mut().zip(bounds) {
            let raw = value.as_deref().unwrap_or_default().trim();
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("Invalid '{name}' bound: {raw}"))?;
        }

        let [north, south, east, west] = parsed;
        Ok(Some(Viewport {
            north,
            south,
            east,
            west,
        }))
    }
}

/// Optional sign followed by at least one digit; anything after is ignored
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let unsigned = raw.trim_start_matches(['+', '-']);
    let sign_len = raw.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    // Saturate absurdly long inputs; they clamp to MAX_ZOOM or 0 anyway
    let value = unsigned[..digits].parse::<i64>().unwrap_or(i64::MAX);
    Some(if raw.starts_with('-') { -value } else { value })
}

/// Index of a grid cell: `floor(coordinate / grid_size)` on each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCell {
    pub lat_grid: i64,
    pub lng_grid: i64,
}

impl GridCell {
    pub fn containing(latitude: f64, longitude: f64, grid_size: f64) -> Self {
        Self {
            lat_grid: (latitude / grid_size).floor() as i64,
            lng_grid: (longitude / grid_size).floor() as i64,
        }
    }
}

#[derive(Default)]
struct CellAccumulator {
    latitude_sum: f64,
    longitude_sum: f64,
    count: i64,
}

/// In-memory clustering of `(latitude, longitude)` points.
///
/// Same contract as the SQL aggregation in the flood-damage repository;
/// output is ordered by `(lat_grid, lng_grid)`.
pub fn cluster_points<I>(points: I, viewport: &Viewport, zoom: i32) -> Vec<FloodDamageCluster>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let size = grid_size(zoom);
    let mut cells: BTreeMap<GridCell, CellAccumulator> = BTreeMap::new();

    for (latitude, longitude) in points {
        if !viewport.contains(latitude, longitude) {
            continue;
        }
        let acc = cells
            .entry(GridCell::containing(latitude, longitude, size))
            .or_default();
        acc.latitude_sum += latitude;
        acc.longitude_sum += longitude;
        acc.count += 1;
    }

    cells
        .into_iter()
        .map(|(cell, acc)| FloodDamageCluster {
            lat_grid: cell.lat_grid,
            lng_grid: cell.lng_grid,
            latitude: acc.latitude_sum / acc.count as f64,
            longitude: acc.longitude_sum / acc.count as f64,
            count: acc.count,
        })
        .collect()
}
