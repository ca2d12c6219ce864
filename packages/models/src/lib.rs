#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data types for geographic profiling.
//!
//! A [`PointSet`] of case locations is smoothed with a Gaussian kernel of
//! a given [`Bandwidth`], sampled on a fixed grid, and reduced to a ranked
//! list of [`Peak`]s. Each peak is resolved to an [`Address`], and the
//! whole result is packaged as a [`RenderPayload`] for a map renderer.

pub mod address;
pub mod payload;
pub mod progress;

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use address::Address;
pub use payload::{HotspotRow, RenderPayload};

/// Errors raised while constructing model values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A coordinate component was `NaN` or infinite.
    #[error("Coordinate at index {index} is not finite ({latitude}, {longitude})")]
    NonFiniteCoordinate {
        /// Position of the offending point in the input.
        index: usize,
        /// Latitude as given.
        latitude: f64,
        /// Longitude as given.
        longitude: f64,
    },

    /// Bandwidth must be a finite, strictly positive number.
    #[error("Bandwidth must be a finite positive number, got {0}")]
    InvalidBandwidth(f64),

    /// Bandwidth lies outside the operator control range.
    #[error("Bandwidth {value} is outside the allowed range [{min}, {max}]")]
    BandwidthOutOfRange {
        /// Requested value.
        value: f64,
        /// Lower bound of the control.
        min: f64,
        /// Upper bound of the control.
        max: f64,
    },
}

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        Self::new(c.longitude, c.latitude)
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    /// Returns a copy grown by `margin` degrees on every side.
    #[must_use]
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin,
            max_lat: self.max_lat + margin,
            min_lon: self.min_lon - margin,
            max_lon: self.max_lon + margin,
        }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&c.latitude)
            && (self.min_lon..=self.max_lon).contains(&c.longitude)
    }
}

/// The case locations of one dataset.
///
/// Every coordinate is finite. Order carries no meaning for the analysis
/// but is kept so render output matches the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PointSet {
    points: Vec<Coordinate>,
}

impl PointSet {
    /// Builds a point set, rejecting any non-finite coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonFiniteCoordinate`] for the first point with
    /// a `NaN` or infinite component.
    pub fn new(points: Vec<Coordinate>) -> Result<Self, ModelError> {
        if let Some((index, c)) = points.iter().enumerate().find(|(_, c)| !c.is_finite()) {
            return Err(ModelError::NonFiniteCoordinate {
                index,
                latitude: c.latitude,
                longitude: c.longitude,
            });
        }
        Ok(Self { points })
    }

    /// Convenience constructor from `(latitude, longitude)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`PointSet::new`].
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, ModelError> {
        Self::new(
            pairs
                .iter()
                .map(|&(lat, lon)| Coordinate::new(lat, lon))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coordinate> {
        self.points.iter()
    }

    /// Per-axis extent of the points, or `None` when empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let multi: geo::MultiPoint<f64> = self
            .points
            .iter()
            .map(|&c| geo::Point::from(c))
            .collect();
        multi.bounding_rect().map(|rect| Bounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lon: rect.min().x,
            max_lon: rect.max().x,
        })
    }

    /// Arithmetic mean of all latitudes and longitudes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<Coordinate> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (lat_sum, lon_sum) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(a, b), c| (a + c.latitude, b + c.longitude));
        Some(Coordinate::new(lat_sum / n, lon_sum / n))
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Coordinate;
    type IntoIter = std::slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Kernel standard deviation in coordinate degrees.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Bandwidth(f64);

impl Bandwidth {
    /// Smallest value offered by the operator control.
    pub const MIN: f64 = 0.0005;
    /// Largest value offered by the operator control.
    pub const MAX: f64 = 0.01;
    /// Increment of the operator control.
    pub const STEP: f64 = 0.0005;
    /// Initial value of the operator control.
    pub const DEFAULT: f64 = 0.002;

    /// Accepts any finite, strictly positive bandwidth.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidBandwidth`] otherwise.
    pub fn new(value: f64) -> Result<Self, ModelError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidBandwidth(value))
        }
    }

    /// Validates `value` against the operator control and snaps it to the
    /// nearest [`Bandwidth::STEP`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidBandwidth`] for non-finite input and
    /// [`ModelError::BandwidthOutOfRange`] outside `[MIN, MAX]`.
    pub fn from_control(value: f64) -> Result<Self, ModelError> {
        if !value.is_finite() {
            return Err(ModelError::InvalidBandwidth(value));
        }
        // Half a step of slack so values like 0.01000000001 still snap.
        let slack = Self::STEP / 2.0;
        if value < Self::MIN - slack || value > Self::MAX + slack {
            return Err(ModelError::BandwidthOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        let snapped = ((value / Self::STEP).round() * Self::STEP).clamp(Self::MIN, Self::MAX);
        Self::new(snapped)
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl std::fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// A grid location with one of the highest density scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peak {
    pub latitude: f64,
    pub longitude: f64,
    /// Estimated probability density at this location.
    pub density: f64,
}

impl Peak {
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_points() {
        let err = PointSet::from_pairs(&[(1.0, 2.0), (f64::NAN, 3.0)]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::NonFiniteCoordinate { index: 1, .. }
        ));
    }

    #[test]
    fn bounds_and_mean() {
        let points =
            PointSet::from_pairs(&[(-23.550, -46.630), (-23.551, -46.631), (-23.549, -46.629)])
                .unwrap();
        let b = points.bounds().unwrap();
        assert!((b.min_lat - -23.551).abs() < 1e-12);
        assert!((b.max_lat - -23.549).abs() < 1e-12);
        assert!((b.min_lon - -46.631).abs() < 1e-12);
        assert!((b.max_lon - -46.629).abs() < 1e-12);

        let center = points.mean().unwrap();
        assert!((center.latitude - -23.550).abs() < 1e-9);
        assert!((center.longitude - -46.630).abs() < 1e-9);
    }

    #[test]
    fn empty_point_set_has_no_bounds() {
        let points = PointSet::new(Vec::new()).unwrap();
        assert!(points.bounds().is_none());
        assert!(points.mean().is_none());
    }

    #[test]
    fn bandwidth_must_be_positive() {
        assert!(Bandwidth::new(0.0).is_err());
        assert!(Bandwidth::new(-0.001).is_err());
        assert!(Bandwidth::new(f64::INFINITY).is_err());
        assert!(Bandwidth::new(0.5).is_ok());
    }

    #[test]
    fn control_bandwidth_snaps_to_step() {
        let bw = Bandwidth::from_control(0.00212).unwrap();
        assert!((bw.value() - 0.002).abs() < 1e-12);

        let bw = Bandwidth::from_control(0.01).unwrap();
        assert!((bw.value() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn control_bandwidth_rejects_out_of_range() {
        assert!(matches!(
            Bandwidth::from_control(0.05),
            Err(ModelError::BandwidthOutOfRange { .. })
        ));
        assert!(matches!(
            Bandwidth::from_control(0.0001),
            Err(ModelError::BandwidthOutOfRange { .. })
        ));
    }

    #[test]
    fn bounds_expand_and_contain() {
        let b = Bounds {
            min_lat: 0.0,
            max_lat: 1.0,
            min_lon: 0.0,
            max_lon: 1.0,
        }
        .expand(0.005);
        assert!(b.contains(Coordinate::new(-0.004, 1.004)));
        assert!(!b.contains(Coordinate::new(-0.006, 0.5)));
    }
}
