//! Interactive bandwidth exploration.
//!
//! Loads a dataset once and lets the operator re-run the pipeline with
//! different bandwidths. Runs share one [`AnalysisCache`], so revisiting a
//! bandwidth skips both the density evaluation and the geocoding calls.

use dialoguer::{Input, Select};
use geo_profile_analysis::cache::AnalysisCache;
use geo_profile_analysis::pipeline::HotspotPipeline;
use geo_profile_cli_utils::{GeocodeProgress, MultiProgress};
use geo_profile_ingest::Dataset;
use geo_profile_models::Bandwidth;

use crate::report;

/// Actions offered after each run.
enum Action {
    ChangeBandwidth,
    ClearCache,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[Self::ChangeBandwidth, Self::ClearCache, Self::Quit];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::ChangeBandwidth => "Change bandwidth",
            Self::ClearCache => "Clear cache",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the prompt loop until the operator quits.
///
/// # Errors
///
/// Returns an error if a prompt fails or the pipeline fails for a reason
/// other than geocoding (which is recorded per hotspot instead).
pub async fn run(
    dataset: &Dataset,
    pipeline: &HotspotPipeline,
    cache: &mut AnalysisCache,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut bandwidth = Bandwidth::default();
    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let progress = GeocodeProgress::spinner(multi, "Resolving hotspot addresses");
        let payload = pipeline
            .run(&dataset.points, bandwidth, Some(&mut *cache), &progress)
            .await?;
        println!();
        println!("Bandwidth: {bandwidth}");
        report::print_hotspots(&payload);

        let stats = cache.stats();
        log::debug!("Cache: {} hits, {} misses", stats.hits, stats.misses);

        let idx = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::ChangeBandwidth => bandwidth = prompt_bandwidth(bandwidth)?,
            Action::ClearCache => {
                cache.clear();
                log::info!("Cache cleared");
            }
            Action::Quit => return Ok(()),
        }
    }
}

fn prompt_bandwidth(current: Bandwidth) -> Result<Bandwidth, Box<dyn std::error::Error>> {
    let value: f64 = Input::new()
        .with_prompt(format!(
            "Bandwidth ({} to {}, step {})",
            Bandwidth::MIN,
            Bandwidth::MAX,
            Bandwidth::STEP
        ))
        .default(current.value())
        .validate_with(|v: &f64| -> Result<(), String> {
            Bandwidth::from_control(*v).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    Ok(Bandwidth::from_control(value)?)
}
