//! Progress reporting while writing the output file.
//!
//! Injection rewrites only the `moov` box; everything else (usually a large
//! `mdat`) is streamed from the source file. [`ProgressCallback`] observes that
//! copy so a caller can drive a progress bar.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spatialmedia::{InjectionOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% written");
//!         }
//!     }
//! }
//!
//! let options = InjectionOptions::new().with_progress(Arc::new(PrintProgress));
//! let log = spatialmedia::inject_360_metadata("in.mp4", "out.mp4", &options)?;
//! # Ok::<(), spatialmedia::SpatialMediaError>(())
//! ```

use std::time::{Duration, Instant};

/// A snapshot of write progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Bytes written to the output so far.
    pub current: u64,
    /// Total bytes expected in the output, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since writing started.
    pub elapsed: Duration,
}

/// Trait for receiving progress updates while the output file is written.
///
/// Implementations must be [`Send`] and [`Sync`] so they can be shared
/// through an `Arc` in [`InjectionOptions`](crate::InjectionOptions).
///
/// Progress callbacks are **infallible**: they observe but cannot halt
/// the operation.
pub trait ProgressCallback: Send + Sync {
    /// Called after each block of output has been written.
    fn on_progress(&self, info: &ProgressInfo);
}

/// A no-op implementation that discards all progress notifications.
///
/// This is the default when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Internal helper that tracks byte counts and emits callbacks.
pub(crate) struct ProgressTracker<'a> {
    callback: &'a dyn ProgressCallback,
    total: Option<u64>,
    current: u64,
    start_time: Instant,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: &'a dyn ProgressCallback, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            start_time: Instant::now(),
        }
    }

    /// Record `bytes` more output and fire the callback.
    pub(crate) fn advance(&mut self, bytes: u64) {
        self.current += bytes;
        self.report();
    }

    fn report(&self) {
        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current as f32 / t as f32) * 100.0);

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
        };

        self.callback.on_progress(&info);
    }
}
