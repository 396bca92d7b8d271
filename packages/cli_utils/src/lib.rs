#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the ERB map tools.
//!
//! Provides an `indicatif` progress bar behind the [`ProgressCallback`]
//! trait, plus [`init_logger`] which sets up `indicatif-log-bridge` so that
//! `log::info!` and friends are suspended while progress bars redraw.

use std::sync::Arc;
use std::time::Duration;

use erb_map_source::progress::{LoadPhase, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that follows a load through its phases.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style used while the current phase has a known length.
    bar_style: ProgressStyle,
    /// Style used while it does not.
    spinner_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Creates a bar for one feed load. It shows a spinner until a phase
    /// with a known total starts.
    #[must_use]
    pub fn load_bar(multi: &MultiProgress, feed_name: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar_style = ProgressStyle::with_template(
            "  {prefix} {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        bar.set_style(spinner_style.clone());
        bar.set_prefix(feed_name.to_string());

        Arc::new(Self {
            bar,
            bar_style,
            spinner_style,
        })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn start_phase(&self, phase: LoadPhase, total: Option<u64>) {
        self.bar.set_message(phase.to_string());
        self.bar.set_position(0);
        if let Some(total) = total {
            self.bar.set_length(total);
            self.bar.set_style(self.bar_style.clone());
        } else {
            self.bar.unset_length();
            self.bar.set_style(self.spinner_style.clone());
        }
    }

    fn advance(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, summary: String) {
        self.bar.finish_with_message(summary);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // Ignore error if logger was already set (e.g., in tests)

    log::set_max_level(level);

    multi
}
