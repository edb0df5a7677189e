//! Progress reporting using indicatif progress bars

use flashlogs_core::ReadProgress;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a standard progress bar style
fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")?
        .progress_chars("#>-"))
}

/// Progress reporter drawing a single bar on stderr
///
/// indicatif hides the bar when stderr is not a terminal.
#[derive(Default)]
pub struct IndicatifProgress {
    bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadProgress for IndicatifProgress {
    fn start(&mut self, total: u64) {
        let pb = ProgressBar::new(total);
        if let Ok(style) = create_progress_bar_style() {
            pb.set_style(style);
        }
        self.bar = Some(pb);
    }

    fn advance(&mut self, bytes: u64) {
        if let Some(pb) = &self.bar {
            pb.inc(bytes);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // A failed read never calls finish()
        if let Some(pb) = self.bar.take() {
            pb.abandon();
        }
    }
}
