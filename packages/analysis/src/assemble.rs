//! Combines points, peaks and addresses into a [`RenderPayload`].

use geo_profile_models::{Address, Peak, PointSet, RenderPayload};

use crate::AnalysisError;

/// Packages one run for the map renderer. The center is the mean of all
/// case coordinates.
///
/// # Errors
///
/// Returns [`AnalysisError::LengthMismatch`] when `peaks` and `addresses`
/// differ in length, and [`AnalysisError::EmptyPointSet`] when there are
/// no points to center on.
pub fn assemble(
    points: PointSet,
    peaks: Vec<Peak>,
    addresses: Vec<Address>,
) -> Result<RenderPayload, AnalysisError> {
    if peaks.len() != addresses.len() {
        return Err(AnalysisError::LengthMismatch {
            peaks: peaks.len(),
            addresses: addresses.len(),
        });
    }

    let center = points.mean().ok_or(AnalysisError::EmptyPointSet)?;

    Ok(RenderPayload {
        center,
        points,
        peaks,
        addresses,
    })
}
