//! Core types for the span waterfall
//!
//! This crate defines the foundational types used throughout the system:
//! - Span / TraceEvent: the input trace
//! - Gap: synthetic missing-instrumentation interval
//! - GroupId: autogroup identifier
//! - WaterfallError: error type hierarchy
//! - WaterfallConfig: thresholds and search settings
//! - Limits: default threshold constants

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod limits;
pub mod span;
pub mod types;

pub use config::{SearchConfig, WaterfallConfig, CONFIG_FILE_NAME};
pub use error::{WaterfallError, WaterfallResult};
pub use span::{Gap, Span, TraceEvent};
pub use types::GroupId;
