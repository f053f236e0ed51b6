//! Span search index and its build lifecycle
//!
//! This module provides:
//! - SpanSearchIndex: documents for every span plus the scorer
//! - SearchIndexHandle: two-phase (building -> ready/failed) access to an index
//!
//! # Lifecycle
//!
//! The index is built once per trace. With a background build the handle
//! starts in [`IndexPhase::Building`] and settles into `Ready` or `Failed`.
//! Callers either poll [`SearchIndexHandle::phase`] or block with
//! [`SearchIndexHandle::wait`]. A failed build never panics the caller; it
//! only means no text query will ever match.

use crate::scorer::{FuzzyScorer, MatchedField, PreparedQuery, Scorer, SearchDoc};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashSet;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use waterfall_core::SearchConfig;

// ============================================================================
// IndexEntry / SearchMatch
// ============================================================================

/// Text of one span handed to the index builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Span id
    pub span_id: String,
    /// Span description, if any
    pub description: Option<String>,
}

impl IndexEntry {
    /// Create an entry
    pub fn new(span_id: impl Into<String>, description: Option<String>) -> Self {
        IndexEntry {
            span_id: span_id.into(),
            description,
        }
    }
}

/// One matching span
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    /// Matching span id
    pub span_id: String,
    /// Score in `(0, 1]`
    pub score: f32,
    /// Field that matched
    pub field: MatchedField,
}

// ============================================================================
// SpanSearchIndex
// ============================================================================

/// Pre-built fuzzy index over span descriptions and ids
pub struct SpanSearchIndex {
    docs: Vec<SearchDoc>,
    scorer: Box<dyn Scorer>,
}

impl std::fmt::Debug for SpanSearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpanSearchIndex")
            .field("docs", &self.docs.len())
            .field("scorer", &self.scorer.name())
            .finish()
    }
}

impl SpanSearchIndex {
    /// Build an index with the default fuzzy scorer
    pub fn build(entries: Vec<IndexEntry>, config: &SearchConfig) -> Self {
        Self::with_scorer(
            entries,
            config,
            Box::new(FuzzyScorer::new(config.min_fuzzy_score)),
        )
    }

    /// Build an index with a custom scorer
    pub fn with_scorer(
        entries: Vec<IndexEntry>,
        config: &SearchConfig,
        scorer: Box<dyn Scorer>,
    ) -> Self {
        let docs = entries
            .into_iter()
            .map(|e| {
                SearchDoc::new(
                    e.span_id,
                    e.description.as_deref(),
                    config.max_indexed_text_len,
                )
            })
            .collect();
        SpanSearchIndex { docs, scorer }
    }

    /// Number of indexed spans
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the index has no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Search for spans matching `query`
    ///
    /// Results are ordered by descending score; ties keep index order.
    /// A span id indexed more than once is reported once, with its best
    /// score. An empty query returns no results.
    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        let Some(prepared) = PreparedQuery::new(query) else {
            return Vec::new();
        };

        let mut matches: Vec<SearchMatch> = self
            .docs
            .iter()
            .filter_map(|doc| {
                self.scorer.score(doc, &prepared).map(|m| SearchMatch {
                    span_id: doc.span_id.clone(),
                    score: m.score,
                    field: m.field,
                })
            })
            .collect();

        // stable: equal scores stay in index order
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut seen = FxHashSet::default();
        matches.retain(|m| seen.insert(m.span_id.clone()));
        matches
    }
}

// ============================================================================
// SearchIndexHandle
// ============================================================================

/// Observable phase of an index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexPhase {
    /// Build still running
    Building,
    /// Index available
    Ready,
    /// Build failed; searches match nothing
    Failed,
}

/// Outcome of a search through a handle
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Index not built yet
    Pending,
    /// Index ready; these spans matched
    Matches(Vec<SearchMatch>),
    /// Index build failed
    Unavailable,
}

enum Slot {
    Building,
    Ready(Arc<SpanSearchIndex>),
    Failed(String),
}

struct Shared {
    slot: Mutex<Slot>,
    settled: Condvar,
}

impl Shared {
    fn publish(&self, slot: Slot) {
        *self.slot.lock() = slot;
        self.settled.notify_all();
    }
}

/// Shared access to an index that may still be building
#[derive(Clone)]
pub struct SearchIndexHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SearchIndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndexHandle")
            .field("phase", &self.phase())
            .finish()
    }
}

impl SearchIndexHandle {
    fn with_slot(slot: Slot) -> Self {
        SearchIndexHandle {
            shared: Arc::new(Shared {
                slot: Mutex::new(slot),
                settled: Condvar::new(),
            }),
        }
    }

    /// Build according to `config.background_index`
    pub fn build(entries: Vec<IndexEntry>, config: &SearchConfig) -> Self {
        if config.background_index {
            Self::spawn(entries, config)
        } else {
            Self::build_blocking(entries, config)
        }
    }

    /// Build on the calling thread; the handle is settled on return
    pub fn build_blocking(entries: Vec<IndexEntry>, config: &SearchConfig) -> Self {
        Self::with_slot(run_build(entries, config))
    }

    /// Build on a background thread named `waterfall-search-index`
    pub fn spawn(entries: Vec<IndexEntry>, config: &SearchConfig) -> Self {
        let handle = Self::with_slot(Slot::Building);
        let shared = Arc::clone(&handle.shared);
        let config = config.clone();

        let spawned = std::thread::Builder::new()
            .name("waterfall-search-index".to_string())
            .spawn(move || {
                let slot = run_build(entries, &config);
                shared.publish(slot);
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn search index thread");
            handle
                .shared
                .publish(Slot::Failed(format!("spawn failed: {}", e)));
        }
        handle
    }

    /// A handle whose build has already failed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_slot(Slot::Failed(reason.into()))
    }

    /// Current phase
    pub fn phase(&self) -> IndexPhase {
        match &*self.shared.slot.lock() {
            Slot::Building => IndexPhase::Building,
            Slot::Ready(_) => IndexPhase::Ready,
            Slot::Failed(_) => IndexPhase::Failed,
        }
    }

    /// Whether the index is ready for queries
    pub fn is_ready(&self) -> bool {
        self.phase() == IndexPhase::Ready
    }

    /// The index, once ready
    pub fn index(&self) -> Option<Arc<SpanSearchIndex>> {
        match &*self.shared.slot.lock() {
            Slot::Ready(index) => Some(Arc::clone(index)),
            _ => None,
        }
    }

    /// Failure reason, if the build failed
    pub fn failure(&self) -> Option<String> {
        match &*self.shared.slot.lock() {
            Slot::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Block until the build settles or `timeout` passes
    ///
    /// Returns the phase observed last; `Building` means the timeout hit.
    pub fn wait(&self, timeout: Duration) -> IndexPhase {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.slot.lock();
        while matches!(*slot, Slot::Building) {
            let now = Instant::now();
            if now >= deadline {
                return IndexPhase::Building;
            }
            self.shared.settled.wait_for(&mut slot, deadline - now);
        }
        match &*slot {
            Slot::Ready(_) => IndexPhase::Ready,
            Slot::Failed(_) => IndexPhase::Failed,
            Slot::Building => IndexPhase::Building,
        }
    }

    /// Run a query against the index in whatever phase it is in
    pub fn search(&self, query: &str) -> SearchOutcome {
        let index = match &*self.shared.slot.lock() {
            Slot::Building => return SearchOutcome::Pending,
            Slot::Failed(_) => return SearchOutcome::Unavailable,
            Slot::Ready(index) => Arc::clone(index),
        };
        SearchOutcome::Matches(index.search(query))
    }
}

fn run_build(entries: Vec<IndexEntry>, config: &SearchConfig) -> Slot {
    let started = Instant::now();
    let count = entries.len();
    match panic::catch_unwind(AssertUnwindSafe(|| SpanSearchIndex::build(entries, config))) {
        Ok(index) => {
            debug!(
                docs = count,
                elapsed_us = started.elapsed().as_micros() as u64,
                "Span search index built"
            );
            Slot::Ready(Arc::new(index))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(docs = count, reason = %reason, "Span search index build failed");
            Slot::Failed(reason)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "index build panicked".to_string()
    }
}
