#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hotspot analysis for geo-tagged case points.
//!
//! The analytic half of the pipeline is pure and synchronous:
//!
//! 1. [`density::DensityModel::fit`] sums isotropic Gaussian kernels (one
//!    per case, bandwidth as standard deviation, in degrees).
//! 2. [`grid::EvaluationGrid::build`] lays a fixed 100x100 lattice over the
//!    points' bounding box plus a 0.005 degree margin.
//! 3. [`peaks::extract_peaks`] evaluates the model on the lattice and keeps
//!    the `k` densest cells.
//!
//! [`pipeline::HotspotPipeline`] adds reverse geocoding and assembles a
//! [`RenderPayload`]. Repeated runs can share an [`cache::AnalysisCache`].

pub mod assemble;
pub mod cache;
pub mod density;
pub mod grid;
pub mod peaks;
pub mod pipeline;

use geo_profile_models::{Bandwidth, ModelError, Peak, PointSet};
use thiserror::Error;

pub use geo_profile_models::RenderPayload;

/// Number of lattice nodes along each axis of the evaluation grid.
pub const GRID_RESOLUTION: usize = 100;

/// Margin, in degrees, added around the points' bounding box.
pub const GRID_MARGIN_DEGREES: f64 = 0.005;

/// Number of hotspots returned by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Fewest points a density surface can be fitted to.
pub const MIN_POINTS: usize = 2;

/// Errors from the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Not enough points to fit a density surface.
    #[error("At least {MIN_POINTS} valid data points are required for the analysis, got {count}")]
    InsufficientData {
        /// Number of points supplied.
        count: usize,
    },

    /// A grid cannot be built over zero points.
    #[error("Cannot build an evaluation grid over an empty point set")]
    EmptyPointSet,

    /// Peaks and addresses are not index-aligned.
    #[error("Length mismatch: {peaks} peaks but {addresses} addresses")]
    LengthMismatch {
        /// Number of peaks.
        peaks: usize,
        /// Number of addresses.
        addresses: usize,
    },

    /// Invalid model input.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Runs the analytic half of the pipeline: fit, grid, extract.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] for fewer than
/// [`MIN_POINTS`] points.
pub fn analyze(
    points: &PointSet,
    bandwidth: Bandwidth,
    k: usize,
) -> Result<Vec<Peak>, AnalysisError> {
    let model = density::DensityModel::fit(points, bandwidth)?;
    let grid = grid::EvaluationGrid::build(points)?;
    Ok(peaks::extract_peaks(&model, &grid, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sao_paulo_cluster() -> PointSet {
        PointSet::from_pairs(&[(-23.550, -46.630), (-23.551, -46.631), (-23.549, -46.629)])
            .unwrap()
    }

    #[test]
    fn cluster_yields_five_nearby_peaks() {
        let bw = Bandwidth::new(0.002).unwrap();
        let peaks = analyze(&sao_paulo_cluster(), bw, DEFAULT_TOP_K).unwrap();

        assert_eq!(peaks.len(), 5);
        for peak in &peaks {
            assert!((peak.latitude - -23.550).abs() < 0.01, "{peak:?}");
            assert!((peak.longitude - -46.630).abs() < 0.01, "{peak:?}");
        }
    }

    #[test]
    fn peaks_are_sorted_descending() {
        let bw = Bandwidth::new(0.002).unwrap();
        let peaks = analyze(&sao_paulo_cluster(), bw, 25).unwrap();
        assert_eq!(peaks.len(), 25);
        for pair in peaks.windows(2) {
            assert!(pair[0].density >= pair[1].density);
        }
    }

    #[test]
    fn repeated_analysis_is_identical() {
        let bw = Bandwidth::new(0.0035).unwrap();
        let a = analyze(&sao_paulo_cluster(), bw, DEFAULT_TOP_K).unwrap();
        let b = analyze(&sao_paulo_cluster(), bw, DEFAULT_TOP_K).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn extreme_bandwidths_never_rank_nan_peaks() {
        let points = PointSet::from_pairs(&[(-23.550, -46.630), (-23.551, -46.631)]).unwrap();
        for h in [1e-160, 1e160] {
            let peaks = analyze(&points, Bandwidth::new(h).unwrap(), DEFAULT_TOP_K).unwrap();
            assert_eq!(peaks.len(), DEFAULT_TOP_K);
            for peak in &peaks {
                assert!(peak.density.is_finite() && peak.density >= 0.0, "h={h}: {peak:?}");
            }
        }
    }

    #[test]
    fn single_point_is_insufficient() {
        let points = PointSet::from_pairs(&[(-23.55, -46.63)]).unwrap();
        let err = analyze(&points, Bandwidth::default(), DEFAULT_TOP_K).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { count: 1 }));
    }
}
