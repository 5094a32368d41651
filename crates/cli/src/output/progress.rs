//! Progress bar for multi-file runs
//!
//! Counts finished files rather than bytes: each worker reports once per
//! file, whatever its size.

use super::OutputConfig;

/// Progress bar wrapper
///
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar over `total` files
    pub fn new(config: OutputConfig, total: u64) -> Self {
        let bar = if config.quiet || config.json || config.no_progress || total == 0 {
            None
        } else {
            let bar = indicatif::ProgressBar::new(total);
            let style = indicatif::ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({elapsed})")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
            bar.set_style(style);
            Some(bar)
        };

        Self { bar }
    }

    /// Record one finished file
    pub fn inc(&self, failed: bool) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            if failed {
                bar.set_message("failures");
            }
        }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    pub fn position(&self) -> u64 {
        self.bar.as_ref().map_or(0, |bar| bar.position())
    }
}
