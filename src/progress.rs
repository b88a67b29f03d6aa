//! Progress notification.
//!
//! Sources report how many students they have processed through a
//! [`ProgressSink`]; the binary plugs in a terminal progress bar.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Receives `(processed, total)` updates while feedback is collected.
pub trait ProgressSink: Send + Sync {
    fn update(&self, processed: usize, total: usize);

    /// Called once when collection is complete.
    fn finish(&self) {}
}

/// Sink that ignores all updates.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _processed: usize, _total: usize) {}
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn update(&self, processed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(processed as u64);
    }

    fn finish(&self) {
        self.bar.finish_with_message("feedback collected");
    }
}


/// Forwards progress to a sink every `every` students.
pub struct ProgressTicker<'a> {
    sink: &'a dyn ProgressSink,
    every: usize,
    total: usize,
}

impl<'a> ProgressTicker<'a> {
    pub fn new(sink: &'a dyn ProgressSink, every: usize, total: usize) -> Self {
        Self {
            sink,
            every: every.max(1),
            total,
        }
    }

    /// Notify before handling the student at index `processed`.
    pub fn tick(&self, processed: usize) {
        if processed % self.every == 0 {
            info!("{} / {} completed", processed, self.total);
            self.sink.update(processed, self.total);
        }
    }

    /// Final notification with everything processed.
    pub fn finish(&self) {
        info!("{} / {} completed", self.total, self.total);
        self.sink.update(self.total, self.total);
        self.sink.finish();
    }
}
