//! Gaussian kernel density estimation over case coordinates.
//!
//! Distances are plain Euclidean distances in degree space, not geodesic
//! distances. At city scale the distortion between a degree of latitude
//! and a degree of longitude is accepted.

use std::f64::consts::PI;

use geo_profile_models::{Bandwidth, Coordinate, PointSet};

use crate::{AnalysisError, MIN_POINTS};

/// A fitted density surface.
///
/// Immutable; identical `(points, bandwidth)` always produce identical
/// evaluations.
#[derive(Debug, Clone)]
pub struct DensityModel {
    centers: Vec<Coordinate>,
    bandwidth: Bandwidth,
    /// `ln(1 / (n * 2 * pi * h^2))`, kept in log space so that extreme
    /// bandwidths never form `h^2` directly.
    log_norm: f64,
}

impl DensityModel {
    /// Fits a normalized sum of isotropic Gaussian kernels, one centered
    /// on each point, with `bandwidth` as the standard deviation.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InsufficientData`] for fewer than two
    /// points.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(points: &PointSet, bandwidth: Bandwidth) -> Result<Self, AnalysisError> {
        if points.len() < MIN_POINTS {
            return Err(AnalysisError::InsufficientData {
                count: points.len(),
            });
        }

        let h = bandwidth.value();
        let n = points.len() as f64;

        log::debug!("Fitting density model: {} points, bandwidth {bandwidth}", points.len());

        Ok(Self {
            centers: points.as_slice().to_vec(),
            bandwidth,
            log_norm: -(2.0f64.mul_add(h.ln(), n.ln() + (2.0 * PI).ln())),
        })
    }

    #[must_use]
    pub const fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Probability density at `at`. Always finite and `>= 0`; underflows
    /// to exactly zero far from every center.
    ///
    /// Summed with log-sum-exp over kernel exponents computed from
    /// bandwidth-scaled offsets, so neither `h^2` nor the normalizer can
    /// overflow or underflow on their own.
    #[must_use]
    pub fn evaluate(&self, at: Coordinate) -> f64 {
        let max = self
            .centers
            .iter()
            .map(|c| self.log_kernel(at, *c))
            .fold(f64::NEG_INFINITY, f64::max);
        if max.is_infinite() {
            return 0.0;
        }

        let sum: f64 = self
            .centers
            .iter()
            .map(|c| (self.log_kernel(at, *c) - max).exp())
            .sum();
        let density = (self.log_norm + max + sum.ln()).exp();
        if density.is_nan() {
            0.0
        } else {
            density.min(f64::MAX)
        }
    }

    /// `-|at - c|^2 / (2 h^2)`
    fn log_kernel(&self, at: Coordinate, c: Coordinate) -> f64 {
        let h = self.bandwidth.value();
        let dlat = (at.latitude - c.latitude) / h;
        let dlon = (at.longitude - c.longitude) / h;
        -0.5 * dlat.mul_add(dlat, dlon * dlon)
    }
}
