//! Error types for the waterfall engine
//!
//! This module defines all error types surfaced by the engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Malformed trace data (dangling parents, unreachable spans) is never an
//! error: the tree builder re-parents those spans onto the root. Errors are
//! reserved for caller contract violations and invalid input values.

use crate::types::GroupId;
use thiserror::Error;

/// Result type alias for waterfall operations
pub type WaterfallResult<T> = std::result::Result<T, WaterfallError>;

/// Error types for the waterfall engine
#[derive(Debug, Error)]
pub enum WaterfallError {
    /// Viewport window outside `[0, 1]` or with `start > end`
    #[error("Invalid view window [{view_start}, {view_end}]: {reason}")]
    InvalidWindow {
        /// Requested window start
        view_start: f64,
        /// Requested window end
        view_end: f64,
        /// Why the window was rejected
        reason: &'static str,
    },

    /// Span (or trace event) carries unusable timing data
    #[error("Invalid span '{span_id}': {reason}")]
    InvalidSpan {
        /// Offending span id
        span_id: String,
        /// Why the span was rejected
        reason: String,
    },

    /// No autogroup with this id exists in the layout
    #[error("Unknown span group: {0}")]
    UnknownGroup(GroupId),

    /// No span with this id exists in the trace
    #[error("Unknown span: {0}")]
    UnknownSpan(String),

    /// Configuration values failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(String),

    /// JSON trace payload could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WaterfallError {
    /// Build an `InvalidSpan` error
    pub fn invalid_span(span_id: impl Into<String>, reason: impl Into<String>) -> Self {
        WaterfallError::InvalidSpan {
            span_id: span_id.into(),
            reason: reason.into(),
        }
    }

    /// Build an `InvalidWindow` error
    pub fn invalid_window(view_start: f64, view_end: f64, reason: &'static str) -> Self {
        WaterfallError::InvalidWindow {
            view_start,
            view_end,
            reason,
        }
    }
}

impl From<toml::de::Error> for WaterfallError {
    fn from(e: toml::de::Error) -> Self {
        WaterfallError::ConfigParse(e.to_string())
    }
}

impl From<serde_json::Error> for WaterfallError {
    fn from(e: serde_json::Error) -> Self {
        WaterfallError::Serialization(e.to_string())
    }
}
