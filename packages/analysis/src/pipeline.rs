//! End-to-end hotspot pipeline: `(PointSet, Bandwidth) -> RenderPayload`.
//!
//! The host calls [`HotspotPipeline::run`] whenever an input changes. There
//! is no reactivity here; reuse across runs comes only from the
//! [`AnalysisCache`] the host chooses to pass in.

use std::sync::Arc;

use geo_profile_geocoder::GeocodeResolver;
use geo_profile_models::progress::ProgressCallback;
use geo_profile_models::{Address, Bandwidth, Peak, PointSet, RenderPayload};

use crate::cache::AnalysisCache;
use crate::density::DensityModel;
use crate::grid::EvaluationGrid;
use crate::{AnalysisError, DEFAULT_TOP_K, MIN_POINTS, assemble, peaks};

/// Density analysis followed by reverse geocoding of the peaks.
#[derive(Debug, Clone)]
pub struct HotspotPipeline {
    resolver: Option<GeocodeResolver>,
    top_k: usize,
}

impl HotspotPipeline {
    /// A pipeline returning [`DEFAULT_TOP_K`] peaks. Without a resolver
    /// every address is [`Address::Skipped`].
    #[must_use]
    pub const fn new(resolver: Option<GeocodeResolver>) -> Self {
        Self {
            resolver,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Fits, samples and extracts peaks, consulting `cache` first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InsufficientData`] for fewer than two
    /// points.
    pub fn peaks(
        &self,
        points: &PointSet,
        bandwidth: Bandwidth,
        cache: Option<&mut AnalysisCache>,
    ) -> Result<Vec<Peak>, AnalysisError> {
        if points.len() < MIN_POINTS {
            return Err(AnalysisError::InsufficientData {
                count: points.len(),
            });
        }

        let Some(cache) = cache else {
            return crate::analyze(points, bandwidth, self.top_k);
        };

        if let Some(hit) = cache.peaks(points, bandwidth, self.top_k) {
            log::debug!("Peak cache hit for bandwidth {bandwidth}");
            return Ok(hit);
        }

        let model = DensityModel::fit(points, bandwidth)?;
        let grid: Arc<EvaluationGrid> = cache.grid(points)?;
        let found = peaks::extract_peaks(&model, &grid, self.top_k);
        cache.insert_peaks(points, bandwidth, self.top_k, found.clone());
        Ok(found)
    }

    /// Resolves `peaks` to index-aligned addresses, consulting `cache`
    /// first.
    pub async fn addresses(
        &self,
        peaks: &[Peak],
        cache: Option<&mut AnalysisCache>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Vec<Address> {
        let Some(resolver) = &self.resolver else {
            progress.finish("Geocoding disabled".to_string());
            return vec![Address::Skipped; peaks.len()];
        };

        match cache {
            Some(cache) => {
                if let Some(hit) = cache.addresses(resolver.provider(), peaks) {
                    log::debug!("Address cache hit for {} peaks", peaks.len());
                    progress.finish(format!("{} addresses from cache", hit.len()));
                    return hit;
                }
                let resolved = resolver.resolve(peaks, progress).await;
                cache.insert_addresses(resolver.provider(), peaks, resolved.clone());
                resolved
            }
            None => resolver.resolve(peaks, progress).await,
        }
    }

    /// Runs the whole pipeline.
    ///
    /// Geocoding failures never fail the run; they show up as
    /// [`Address::Error`] entries.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InsufficientData`] for fewer than two
    /// points and [`AnalysisError::LengthMismatch`] if the resolver broke
    /// index alignment.
    pub async fn run(
        &self,
        points: &PointSet,
        bandwidth: Bandwidth,
        mut cache: Option<&mut AnalysisCache>,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<RenderPayload, AnalysisError> {
        log::info!(
            "Analyzing {} points with bandwidth {bandwidth}",
            points.len()
        );

        let peaks = self.peaks(points, bandwidth, cache.as_deref_mut())?;
        let addresses = self.addresses(&peaks, cache, progress).await;

        assemble::assemble(points.clone(), peaks, addresses)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use geo_profile_geocoder::{GeocodeError, ResolverConfig, ReverseGeocoder};
    use geo_profile_models::Coordinate;
    use geo_profile_models::progress::null_progress;

    use super::*;

    /// Answers with the coordinate, except for one poisoned call index.
    struct Echo {
        name: &'static str,
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl ReverseGeocoder for Echo {
        fn name(&self) -> &str {
            self.name
        }

        async fn reverse(&self, at: Coordinate) -> Result<Option<String>, GeocodeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(GeocodeError::Timeout(Duration::from_secs(10)));
            }
            Ok(Some(format!("{:.6},{:.6}", at.latitude, at.longitude)))
        }
    }

    fn pipeline(fail_on: Option<usize>) -> (HotspotPipeline, Arc<Echo>) {
        named_pipeline("echo", fail_on)
    }

    fn named_pipeline(name: &'static str, fail_on: Option<usize>) -> (HotspotPipeline, Arc<Echo>) {
        let echo = Arc::new(Echo {
            name,
            calls: AtomicUsize::new(0),
            fail_on,
        });
        let config = ResolverConfig {
            timeout: Duration::from_secs(1),
            rate_limit: Duration::ZERO,
            concurrency: 1,
        };
        let resolver = GeocodeResolver::new(echo.clone(), config);
        (HotspotPipeline::new(Some(resolver)), echo)
    }

    fn points() -> PointSet {
        PointSet::from_pairs(&[(-23.550, -46.630), (-23.551, -46.631), (-23.549, -46.629)])
            .unwrap()
    }

    #[tokio::test]
    async fn run_produces_aligned_payload() {
        let (pipeline, _) = pipeline(None);
        let payload = pipeline
            .run(&points(), Bandwidth::default(), None, &null_progress())
            .await
            .unwrap();

        assert_eq!(payload.peaks.len(), DEFAULT_TOP_K);
        assert_eq!(payload.addresses.len(), DEFAULT_TOP_K);
        for (peak, address) in payload.peaks.iter().zip(&payload.addresses) {
            let expected = format!("{:.6},{:.6}", peak.latitude, peak.longitude);
            assert_eq!(address.as_found(), Some(expected.as_str()));
        }
        assert!((payload.center.latitude - -23.550).abs() < 1e-9);
    }

    #[tokio::test]
    async fn one_failed_lookup_leaves_others_intact() {
        let (pipeline, _) = pipeline(Some(2));
        let payload = pipeline
            .run(&points(), Bandwidth::default(), None, &null_progress())
            .await
            .unwrap();

        for (i, address) in payload.addresses.iter().enumerate() {
            assert_eq!(address.is_error(), i == 2, "index {i}: {address:?}");
        }
    }

    #[tokio::test]
    async fn repeated_runs_are_identical_and_cached() {
        let (pipeline, echo) = pipeline(None);
        let mut cache = AnalysisCache::new();
        let bw = Bandwidth::new(0.002).unwrap();

        let first = pipeline
            .run(&points(), bw, Some(&mut cache), &null_progress())
            .await
            .unwrap();
        let second = pipeline
            .run(&points(), bw, Some(&mut cache), &null_progress())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(echo.calls.load(Ordering::SeqCst), DEFAULT_TOP_K);
        assert!(cache.stats().hits >= 2);
    }

    #[tokio::test]
    async fn shared_cache_does_not_mix_providers() {
        let (first, first_echo) = named_pipeline("nominatim", None);
        let (second, second_echo) = named_pipeline("pelias", None);
        let mut cache = AnalysisCache::new();
        let bw = Bandwidth::default();

        first
            .run(&points(), bw, Some(&mut cache), &null_progress())
            .await
            .unwrap();
        second
            .run(&points(), bw, Some(&mut cache), &null_progress())
            .await
            .unwrap();

        assert_eq!(first_echo.calls.load(Ordering::SeqCst), DEFAULT_TOP_K);
        assert_eq!(second_echo.calls.load(Ordering::SeqCst), DEFAULT_TOP_K);
    }

    #[test]
    fn bandwidth_change_reuses_grid_only() {
        let (pipeline, _) = pipeline(None);
        let mut cache = AnalysisCache::new();

        let sharp = pipeline
            .peaks(&points(), Bandwidth::new(0.0005).unwrap(), Some(&mut cache))
            .unwrap();
        let smooth = pipeline
            .peaks(&points(), Bandwidth::new(0.01).unwrap(), Some(&mut cache))
            .unwrap();

        assert_eq!(sharp.len(), smooth.len());
        assert!(sharp[0].density > smooth[0].density);
        // Second call: peaks miss, grid hit.
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn without_resolver_addresses_are_skipped() {
        let pipeline = HotspotPipeline::new(None).with_top_k(3);
        let payload = pipeline
            .run(&points(), Bandwidth::default(), None, &null_progress())
            .await
            .unwrap();
        assert_eq!(payload.addresses, vec![Address::Skipped; 3]);
    }

    #[tokio::test]
    async fn insufficient_data_stops_before_geocoding() {
        let (pipeline, echo) = pipeline(None);
        let one = PointSet::from_pairs(&[(-23.55, -46.63)]).unwrap();
        let err = pipeline
            .run(&one, Bandwidth::default(), None, &null_progress())
            .await
            .unwrap_err();

        assert!(matches!(err, AnalysisError::InsufficientData { count: 1 }));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }
}
