//! Per-peak address resolution with failure isolation.
//!
//! Every peak gets exactly one attempt. Whatever happens to that attempt
//! (timeout, HTTP error, empty answer) is recorded as an [`Address`] at
//! the peak's index; nothing is retried and nothing escapes as an error.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use geo_profile_models::progress::ProgressCallback;
use geo_profile_models::{Address, Peak};

use crate::{GeocodeError, ReverseGeocoder};

/// Dispatch settings for a [`GeocodeResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound on a single lookup.
    pub timeout: Duration,
    /// Delay between consecutive requests in sequential mode.
    pub rate_limit: Duration,
    /// Maximum in-flight requests. `1` means sequential dispatch.
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            rate_limit: Duration::from_secs(1),
            concurrency: 1,
        }
    }
}

/// Resolves peaks to addresses through a [`ReverseGeocoder`].
#[derive(Clone)]
pub struct GeocodeResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    config: ResolverConfig,
}

impl std::fmt::Debug for GeocodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeocodeResolver")
            .field("geocoder", &self.geocoder.name())
            .field("config", &self.config)
            .finish()
    }
}

impl GeocodeResolver {
    #[must_use]
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, config: ResolverConfig) -> Self {
        Self { geocoder, config }
    }

    /// Name of the geocoder answering the lookups.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.geocoder.name()
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Returns one [`Address`] per peak, in peak order.
    ///
    /// With `concurrency <= 1` requests go out one at a time, separated by
    /// the configured rate-limit delay. Otherwise up to `concurrency`
    /// requests are in flight and results are re-ordered to match `peaks`.
    pub async fn resolve(
        &self,
        peaks: &[Peak],
        progress: &Arc<dyn ProgressCallback>,
    ) -> Vec<Address> {
        progress.start(peaks.len() as u64, self.geocoder.name());

        let addresses = if self.config.concurrency <= 1 {
            let mut addresses = Vec::with_capacity(peaks.len());
            for (i, peak) in peaks.iter().enumerate() {
                if i > 0 && !self.config.rate_limit.is_zero() {
                    tokio::time::sleep(self.config.rate_limit).await;
                }
                addresses.push(self.resolve_one(peak, progress).await);
            }
            addresses
        } else {
            futures::stream::iter(peaks)
                .map(|peak| self.resolve_one(peak, progress))
                .buffered(self.config.concurrency)
                .collect::<Vec<_>>()
                .await
        };

        progress.finish(summarize(&addresses));

        addresses
    }

    async fn resolve_one(&self, peak: &Peak, progress: &Arc<dyn ProgressCallback>) -> Address {
        let at = peak.coordinate();
        let result = tokio::time::timeout(self.config.timeout, self.geocoder.reverse(at))
            .await
            .unwrap_or(Err(GeocodeError::Timeout(self.config.timeout)));

        let address = match result {
            Ok(Some(address)) => Address::Found(address),
            Ok(None) => {
                log::debug!(
                    "{}: no address for ({:.6}, {:.6})",
                    self.geocoder.name(),
                    at.latitude,
                    at.longitude
                );
                Address::NotFound
            }
            Err(e) => {
                log::warn!(
                    "{} error for ({:.6}, {:.6}): {e}",
                    self.geocoder.name(),
                    at.latitude,
                    at.longitude
                );
                Address::Error(e.to_string())
            }
        };

        progress.resolved(&address);
        address
    }
}

/// One-line tally of a resolved batch, e.g. `3 found, 1 not found, 1 failed`.
#[must_use]
pub fn summarize(addresses: &[Address]) -> String {
    let (mut found, mut not_found, mut failed) = (0usize, 0usize, 0usize);
    for address in addresses {
        match address {
            Address::Found(_) => found += 1,
            Address::NotFound => not_found += 1,
            Address::Error(_) => failed += 1,
            Address::Skipped => {}
        }
    }
    format!("{found} found, {not_found} not found, {failed} failed")
}
