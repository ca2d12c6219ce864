#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the geo-profile binary.
//!
//! [`GeocodeProgress`] drives the per-peak lookup bar through the
//! [`ProgressCallback`] trait. [`init_logger`] wraps `pretty_env_logger` in
//! `indicatif-log-bridge` so log lines print above the bar instead of
//! tearing it.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use geo_profile_models::Address;
use geo_profile_models::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.yellow} {msg}";
const BAR_TEMPLATE: &str = "  {msg} {wide_bar:.yellow/dim} {pos}/{len} peaks [{elapsed_precise}]";

/// Progress of one reverse-geocoding pass.
///
/// Shows a spinner until the resolver reports how many peaks it will look
/// up, then a bar counting resolved peaks and the failures so far.
pub struct GeocodeProgress {
    bar: ProgressBar,
    counting: ProgressStyle,
    provider: Mutex<String>,
    failed: AtomicU64,
}

impl GeocodeProgress {
    #[must_use]
    pub fn spinner(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counting = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Arc::new(Self {
            bar,
            counting,
            provider: Mutex::new(String::new()),
            failed: AtomicU64::new(0),
        })
    }

    fn label(&self) -> String {
        let provider = self
            .provider
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        match self.failed.load(Ordering::Relaxed) {
            0 => provider,
            n => format!("{provider} ({n} failed)"),
        }
    }
}

impl ProgressCallback for GeocodeProgress {
    fn start(&self, total: u64, provider: &str) {
        if let Ok(mut p) = self.provider.lock() {
            provider.clone_into(&mut *p);
        }
        self.failed.store(0, Ordering::Relaxed);
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counting.clone());
        self.bar.set_message(self.label());
    }

    fn resolved(&self, address: &Address) {
        if address.is_error() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            self.bar.set_message(self.label());
        }
        self.bar.inc(1);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Maps the number of `-v` flags to a default log level.
#[must_use]
pub const fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs the global logger and returns the [`MultiProgress`] every
/// progress bar must be added to.
///
/// `RUST_LOG`, when set, wins over `verbosity`.
#[must_use]
pub fn init_logger(verbosity: u8) -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_builder();
    if std::env::var_os("RUST_LOG").is_some() {
        builder.parse_env("RUST_LOG");
    } else {
        builder.filter_level(verbosity_level(verbosity));
    }
    let logger = builder.build();
    let level = logger.filter();

    // Already set when called twice, e.g. from tests.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();
    log::set_max_level(level);

    multi
}
