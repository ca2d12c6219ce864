//! Fixed-resolution evaluation lattice.
//!
//! The lattice depends only on the point set, never on the bandwidth, so
//! it can be cached per dataset. Resolution is fixed: a wide point set
//! gets a coarser absolute spacing.

use geo_profile_models::{Bounds, Coordinate, PointSet};

use crate::{AnalysisError, GRID_MARGIN_DEGREES, GRID_RESOLUTION};

/// A `GRID_RESOLUTION` x `GRID_RESOLUTION` lattice, row-major with
/// latitude on the outer axis.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationGrid {
    bounds: Bounds,
    resolution: usize,
    coordinates: Vec<Coordinate>,
}

impl EvaluationGrid {
    /// Builds the lattice spanning the points' bounding box expanded by
    /// [`GRID_MARGIN_DEGREES`]. Both ends of each axis are included.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptyPointSet`] when `points` is empty.
    pub fn build(points: &PointSet) -> Result<Self, AnalysisError> {
        let bounds = points
            .bounds()
            .ok_or(AnalysisError::EmptyPointSet)?
            .expand(GRID_MARGIN_DEGREES);

        let lats = linspace(bounds.min_lat, bounds.max_lat, GRID_RESOLUTION);
        let lons = linspace(bounds.min_lon, bounds.max_lon, GRID_RESOLUTION);

        let coordinates = lats
            .iter()
            .flat_map(|&lat| lons.iter().map(move |&lon| Coordinate::new(lat, lon)))
            .collect();

        log::debug!(
            "Built {GRID_RESOLUTION}x{GRID_RESOLUTION} grid over lat [{:.6}, {:.6}] lon [{:.6}, {:.6}]",
            bounds.min_lat,
            bounds.max_lat,
            bounds.min_lon,
            bounds.max_lon,
        );

        Ok(Self {
            bounds,
            resolution: GRID_RESOLUTION,
            coordinates,
        })
    }

    /// Extent of the lattice, margin included.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Nodes per axis.
    #[must_use]
    pub const fn resolution(&self) -> usize {
        self.resolution
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coordinate> {
        self.coordinates.iter()
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[allow(clippy::cast_precision_loss)]
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { step.mul_add(i as f64, start) })
                .collect()
        }
    }
}
