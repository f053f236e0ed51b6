//! Waterfall Comprehensive Test Suite
//!
//! End-to-end tests against the public `waterfall` API.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Tree Construction** (ordering, orphans, gaps, determinism)
//! - **Tier 2: Autogrouping** (thresholds, split runs, chains, independence)
//! - **Tier 3: Filters** (operation names, text search, round trips)
//! - **Tier 4: Windowing** (non-destructive reclassification, precedence)
//! - **Tier 5: Scenarios** (expand/collapse walkthroughs)
//! - **Tier 6: Search Lifecycle** (background build, pending queries)
//! - **Tier 7: Store** (subscriptions and notifications)
//! - **Tier 8: Input and Config** (JSON events, TOML config)
//! - **Tier 9: Property-Based** (determinism and structural invariants)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test waterfall_comprehensive
//!
//! # Run a specific tier
//! cargo test --test waterfall_comprehensive tier4
//! ```

#[path = "../common/mod.rs"]
mod common;

// Tier 1: Tree Construction
mod tier1_tree;



// Tier 4: Windowing
mod tier4_windowing;

// Tier 5: Scenarios
mod tier5_scenarios;



// Tier 8: Input and Config
mod tier8_input_config;
