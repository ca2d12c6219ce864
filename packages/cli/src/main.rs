#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for geographic hotspot profiling.
//!
//! Loads a CSV of case locations, fits a kernel density surface, extracts
//! the densest grid locations and resolves them to street addresses.
//!
//! Uses `indicatif-log-bridge` (via [`geo_profile_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the geocoding progress bar never fight for the terminal.

mod interactive;
mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geo_profile_analysis::DEFAULT_TOP_K;
use geo_profile_analysis::cache::AnalysisCache;
use geo_profile_analysis::pipeline::HotspotPipeline;
use geo_profile_cli_utils::{GeocodeProgress, MultiProgress};
use geo_profile_geocoder::GeocodeResolver;
use geo_profile_geocoder::service_registry::{ServiceOverrides, all_services, find_service};
use geo_profile_ingest::IngestError;
use geo_profile_models::Bandwidth;

#[derive(Parser)]
#[command(
    name = "geo_profile",
    about = "Geographic profiling of case clusters with kernel density estimation"
)]
struct Cli {
    /// Raise log verbosity (`-v` debug, `-vv` trace); ignored when `RUST_LOG` is set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find and geocode the most probable source hotspots in a CSV of cases
    Analyze {
        /// CSV file with `latitude` and `longitude` columns
        input: PathBuf,
        /// Kernel bandwidth in degrees (0.0005 to 0.01, step 0.0005)
        #[arg(long, env = "GEO_PROFILE_BANDWIDTH", default_value = "0.002", value_parser = parse_bandwidth)]
        bandwidth: Bandwidth,
        /// Write the render payload as JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write a `GeoJSON` map layer (cases + hotspots) to this path
        #[arg(long)]
        geojson: Option<PathBuf>,
        #[command(flatten)]
        geocoding: GeocodingArgs,
    },
    /// Load a dataset once and re-run the analysis for different bandwidths
    Interactive {
        /// CSV file with `latitude` and `longitude` columns
        input: PathBuf,
        #[command(flatten)]
        geocoding: GeocodingArgs,
    },
    /// List the configured reverse-geocoding services
    Services,
}

/// Options shared by every command that runs the pipeline.
#[derive(Args, Clone)]
struct GeocodingArgs {
    /// Number of hotspots to report
    #[arg(long, env = "GEO_PROFILE_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
    /// Reverse-geocoding service id (see `services`)
    #[arg(long, env = "GEO_PROFILE_GEOCODER", default_value = "nominatim")]
    provider: String,
    /// Override the service endpoint URL
    #[arg(long, env = "GEO_PROFILE_GEOCODER_URL")]
    geocoder_url: Option<String>,
    /// Override the `User-Agent` sent to the service
    #[arg(long, env = "GEO_PROFILE_USER_AGENT")]
    user_agent: Option<String>,
    /// Skip reverse geocoding entirely
    #[arg(long)]
    no_geocode: bool,
}

impl GeocodingArgs {
    fn build_pipeline(&self) -> Result<HotspotPipeline, Box<dyn std::error::Error>> {
        if self.no_geocode {
            log::info!("Reverse geocoding disabled");
            return Ok(HotspotPipeline::new(None).with_top_k(self.top_k));
        }

        let service = find_service(&self.provider)
            .ok_or_else(|| format!("Unknown geocoding service '{}'", self.provider))?;
        let overrides = ServiceOverrides {
            base_url: self.geocoder_url.clone(),
            user_agent: self.user_agent.clone(),
        };
        let geocoder = service.build_geocoder(&overrides)?;
        let resolver = GeocodeResolver::new(geocoder, service.resolver_config());

        log::info!("Reverse geocoding via {} ({})", service.name, service.id);
        Ok(HotspotPipeline::new(Some(resolver)).with_top_k(self.top_k))
    }
}

fn parse_bandwidth(s: &str) -> Result<Bandwidth, String> {
    let value: f64 = s.parse().map_err(|e| format!("invalid number '{s}': {e}"))?;
    Bandwidth::from_control(value).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let multi = geo_profile_cli_utils::init_logger(cli.verbose);

    if let Err(e) = run(cli, &multi).await {
        log::error!("{e}");
        match e.downcast_ref::<IngestError>() {
            Some(IngestError::InsufficientData { .. }) => eprintln!("Warning: {e}"),
            Some(IngestError::Schema { .. }) => eprintln!("Error: {e}"),
            _ => eprintln!("An error occurred while processing the file: {e}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Analyze {
            input,
            bandwidth,
            output,
            geojson,
            geocoding,
        } => {
            let dataset = geo_profile_ingest::load_points_from_path(&input)?;
            report::print_dataset(&input, &dataset);

            let pipeline = geocoding.build_pipeline()?;
            let progress = GeocodeProgress::spinner(multi, "Resolving hotspot addresses");
            let payload = pipeline
                .run(&dataset.points, bandwidth, None, &progress)
                .await?;

            report::print_hotspots(&payload);
            if let Some(path) = output {
                report::write_payload(&path, &payload)?;
            }
            if let Some(path) = geojson {
                report::write_geojson(&path, &payload)?;
            }
        }
        Commands::Interactive { input, geocoding } => {
            let dataset = geo_profile_ingest::load_points_from_path(&input)?;
            report::print_dataset(&input, &dataset);

            let pipeline = geocoding.build_pipeline()?;
            let mut cache = AnalysisCache::new();
            interactive::run(&dataset, &pipeline, &mut cache, multi).await?;
        }
        Commands::Services => {
            for svc in all_services() {
                println!(
                    "{:<12} {:<28} priority={} enabled={} {}",
                    svc.id,
                    svc.name,
                    svc.priority,
                    svc.enabled,
                    svc.base_url()
                );
            }
        }
    }

    Ok(())
}
