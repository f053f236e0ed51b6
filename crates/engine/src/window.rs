//! Viewport windowing
//!
//! A [`ViewWindow`] is a sub-range of the trace expressed as fractions of its
//! duration. Rows whose time range falls entirely outside it are reported
//! as out of view; nothing is ever dropped.

use crate::tree::TraceBounds;
use waterfall_core::{WaterfallError, WaterfallResult};

/// Visible fraction of the trace, `0.0 <= start <= end <= 1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    start: f64,
    end: f64,
}

impl ViewWindow {
    /// The whole trace
    pub const FULL: ViewWindow = ViewWindow { start: 0.0, end: 1.0 };

    /// Validate and create a window
    ///
    /// # Errors
    ///
    /// `InvalidWindow` for non-finite bounds, bounds outside `[0, 1]` or
    /// `start > end`.
    pub fn new(start: f64, end: f64) -> WaterfallResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(WaterfallError::invalid_window(
                start,
                end,
                "bounds must be finite",
            ));
        }
        if !(0.0..=1.0).contains(&start) || !(0.0..=1.0).contains(&end) {
            return Err(WaterfallError::invalid_window(
                start,
                end,
                "bounds must lie within [0, 1]",
            ));
        }
        if start > end {
            return Err(WaterfallError::invalid_window(
                start,
                end,
                "start must not exceed end",
            ));
        }
        Ok(ViewWindow { start, end })
    }

    /// Start fraction
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End fraction
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Whether this covers the whole trace
    pub fn is_full(&self) -> bool {
        self.start == 0.0 && self.end == 1.0
    }

    /// Cache key; identical windows give identical keys
    pub(crate) fn key(&self) -> (u64, u64) {
        (self.start.to_bits(), self.end.to_bits())
    }
}

impl Default for ViewWindow {
    fn default() -> Self {
        ViewWindow::FULL
    }
}

/// Where a row's time range sits relative to the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Overlaps the window
    InView,
    /// Entirely before or after the window
    OutOfView,
}

/// Classify the absolute range `[start, end]` against `window`
///
/// Touching the window edge counts as in view. A zero-length trace puts
/// everything in view.
pub fn classify(bounds: TraceBounds, window: ViewWindow, start: f64, end: f64) -> Visibility {
    let duration = bounds.duration();
    if duration <= 0.0 || window.is_full() {
        return Visibility::InView;
    }
    let rel_start = (start - bounds.start) / duration;
    let rel_end = (end - bounds.start) / duration;
    if rel_end < window.start || rel_start > window.end {
        Visibility::OutOfView
    } else {
        Visibility::InView
    }
}
