//! Top-k selection over a sampled density surface.
//!
//! No spatial deduplication is applied: when the densest cells sit around
//! a single mode, several returned peaks describe the same hotspot.

use std::cmp::Ordering;

use geo_profile_models::Peak;

use crate::density::DensityModel;
use crate::grid::EvaluationGrid;

/// Density scores co-indexed with an [`EvaluationGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    values: Vec<f64>,
}

impl DensityField {
    /// Evaluates `model` at every grid node.
    #[must_use]
    pub fn sample(model: &DensityModel, grid: &EvaluationGrid) -> Self {
        Self {
            values: grid.iter().map(|&c| model.evaluate(c)).collect(),
        }
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Indices of the `k` largest values, largest first. Equal scores keep
    /// grid order, so the result is stable for identical fields.
    #[must_use]
    pub fn top_indices(&self, k: usize) -> Vec<usize> {
        let k = k.min(self.values.len());
        if k == 0 {
            return Vec::new();
        }

        let cmp = |a: &usize, b: &usize| -> Ordering {
            self.values[*b]
                .total_cmp(&self.values[*a])
                .then_with(|| a.cmp(b))
        };

        let mut indices: Vec<usize> = (0..self.values.len()).collect();
        if k < indices.len() {
            indices.select_nth_unstable_by(k - 1, cmp);
            indices.truncate(k);
        }
        indices.sort_unstable_by(cmp);
        indices
    }
}

/// Evaluates `model` over `grid` and returns the `k` densest nodes in
/// descending score order.
///
/// Returns fewer than `k` peaks only when the grid has fewer than `k`
/// nodes.
#[must_use]
pub fn extract_peaks(model: &DensityModel, grid: &EvaluationGrid, k: usize) -> Vec<Peak> {
    let field = DensityField::sample(model, grid);
    let peaks: Vec<Peak> = field
        .top_indices(k)
        .into_iter()
        .map(|i| {
            let c = grid.as_slice()[i];
            Peak {
                latitude: c.latitude,
                longitude: c.longitude,
                density: field.values()[i],
            }
        })
        .collect();

    if let Some(top) = peaks.first() {
        log::debug!(
            "Top density {:.3} at ({:.6}, {:.6}), {} peaks extracted",
            top.density,
            top.latitude,
            top.longitude,
            peaks.len()
        );
    }

    peaks
}
