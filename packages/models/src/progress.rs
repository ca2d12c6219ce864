//! Progress reporting for a reverse-geocoding pass.
//!
//! The resolver reports one event per peak; rendering (an `indicatif` bar in
//! `geo_profile_cli_utils`, or nothing at all) is the host's business.

use std::sync::Arc;

use crate::address::Address;

/// Receives lookup events from the resolver.
///
/// Shared behind an `Arc` across the lookups of one pass, hence
/// `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// A pass over `total` peaks is starting against `provider`.
    fn start(&self, total: u64, provider: &str);

    /// One peak finished, successfully or not.
    fn resolved(&self, address: &Address);

    /// The pass is over (or was skipped); `msg` is the summary line.
    fn finish(&self, msg: String);
}

/// A [`ProgressCallback`] that ignores every event.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start(&self, _total: u64, _provider: &str) {}
    fn resolved(&self, _address: &Address) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
