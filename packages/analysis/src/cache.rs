//! Memoization of pipeline stages, owned by the host.
//!
//! Entries are keyed by the exact bit patterns of their inputs, so a key
//! only matches when every coordinate and the bandwidth are identical.
//! There is no eviction: the host decides the cache lifetime and calls
//! [`AnalysisCache::clear`] when it wants a fresh start.

use std::collections::BTreeMap;
use std::sync::Arc;

use geo_profile_models::{Address, Bandwidth, Peak, PointSet};

use crate::AnalysisError;
use crate::grid::EvaluationGrid;

type PointsKey = Vec<[u64; 2]>;

/// Address lists depend on who answered, not just on the peaks.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AddressesKey {
    provider: String,
    peaks: Vec<[u64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PeaksKey {
    points: PointsKey,
    bandwidth: u64,
    k: usize,
}

/// Hit/miss counters across all three maps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Value-keyed memo of grids, peak lists and address lists.
#[derive(Debug, Default)]
pub struct AnalysisCache {
    grids: BTreeMap<PointsKey, Arc<EvaluationGrid>>,
    peaks: BTreeMap<PeaksKey, Vec<Peak>>,
    addresses: BTreeMap<AddressesKey, Vec<Address>>,
    stats: CacheStats,
}

impl AnalysisCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grid for `points`, building it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates [`EvaluationGrid::build`] failures.
    pub fn grid(&mut self, points: &PointSet) -> Result<Arc<EvaluationGrid>, AnalysisError> {
        let key = points_key(points);
        if let Some(grid) = self.grids.get(&key) {
            self.stats.hits += 1;
            return Ok(Arc::clone(grid));
        }
        self.stats.misses += 1;
        let grid = Arc::new(EvaluationGrid::build(points)?);
        self.grids.insert(key, Arc::clone(&grid));
        Ok(grid)
    }

    #[must_use]
    pub fn peaks(&mut self, points: &PointSet, bandwidth: Bandwidth, k: usize) -> Option<Vec<Peak>> {
        let hit = self.peaks.get(&peaks_key(points, bandwidth, k)).cloned();
        self.record(hit.is_some());
        hit
    }

    pub fn insert_peaks(
        &mut self,
        points: &PointSet,
        bandwidth: Bandwidth,
        k: usize,
        peaks: Vec<Peak>,
    ) {
        self.peaks.insert(peaks_key(points, bandwidth, k), peaks);
    }

    /// Address list previously resolved for `peaks` by `provider`.
    #[must_use]
    pub fn addresses(&mut self, provider: &str, peaks: &[Peak]) -> Option<Vec<Address>> {
        let hit = self.addresses.get(&addresses_key(provider, peaks)).cloned();
        self.record(hit.is_some());
        hit
    }

    /// Stores an address list unless it contains a resolution error, so
    /// transient failures are retried on the next run.
    pub fn insert_addresses(&mut self, provider: &str, peaks: &[Peak], addresses: Vec<Address>) {
        if addresses.iter().any(Address::is_error) {
            log::debug!("Not caching address list with failed lookups");
            return;
        }
        self.addresses.insert(addresses_key(provider, peaks), addresses);
    }

    #[must_use]
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.grids.clear();
        self.peaks.clear();
        self.addresses.clear();
        self.stats = CacheStats::default();
    }

    const fn record(&mut self, hit: bool) {
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }
}

fn points_key(points: &PointSet) -> PointsKey {
    points
        .iter()
        .map(|c| [c.latitude.to_bits(), c.longitude.to_bits()])
        .collect()
}

fn peaks_key(points: &PointSet, bandwidth: Bandwidth, k: usize) -> PeaksKey {
    PeaksKey {
        points: points_key(points),
        bandwidth: bandwidth.value().to_bits(),
        k,
    }
}

fn addresses_key(provider: &str, peaks: &[Peak]) -> AddressesKey {
    AddressesKey {
        provider: provider.to_string(),
        peaks: peaks
            .iter()
            .map(|p| {
                [
                    p.latitude.to_bits(),
                    p.longitude.to_bits(),
                    p.density.to_bits(),
                ]
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> PointSet {
        PointSet::from_pairs(&[(1.0, 2.0), (1.001, 2.001)]).unwrap()
    }

    fn peak() -> Peak {
        Peak {
            latitude: 1.0,
            longitude: 2.0,
            density: 3.0,
        }
    }

    #[test]
    fn grid_is_built_once_per_point_set() {
        let mut cache = AnalysisCache::new();
        let a = cache.grid(&points()).unwrap();
        let b = cache.grid(&points()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn peaks_keyed_by_bandwidth() {
        let mut cache = AnalysisCache::new();
        let bw = Bandwidth::new(0.002).unwrap();
        cache.insert_peaks(&points(), bw, 5, vec![peak()]);

        assert_eq!(cache.peaks(&points(), bw, 5), Some(vec![peak()]));
        assert_eq!(cache.peaks(&points(), Bandwidth::new(0.0025).unwrap(), 5), None);
        assert_eq!(cache.peaks(&points(), bw, 4), None);
    }

    #[test]
    fn failed_address_lists_are_not_cached() {
        let mut cache = AnalysisCache::new();
        cache.insert_addresses("nominatim", &[peak()], vec![Address::Error("timeout".to_string())]);
        assert_eq!(cache.addresses("nominatim", &[peak()]), None);

        cache.insert_addresses("nominatim", &[peak()], vec![Address::NotFound]);
        assert_eq!(
            cache.addresses("nominatim", &[peak()]),
            Some(vec![Address::NotFound])
        );
    }

    #[test]
    fn address_lists_are_kept_per_provider() {
        let mut cache = AnalysisCache::new();
        let found = vec![Address::Found("Rua Augusta".to_string())];
        cache.insert_addresses("nominatim", &[peak()], found.clone());

        assert_eq!(cache.addresses("pelias", &[peak()]), None);
        assert_eq!(cache.addresses("nominatim", &[peak()]), Some(found));
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = AnalysisCache::new();
        cache.grid(&points()).unwrap();
        cache.insert_addresses("nominatim", &[peak()], vec![Address::NotFound]);
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.addresses("nominatim", &[peak()]), None);
    }
}
