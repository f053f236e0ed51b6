//! Shared, observable waterfall state
//!
//! [`WaterfallStore`] wraps a [`WaterfallModel`] behind a lock and tells
//! subscribers about every successful mutation. Subscribers run after the
//! lock is released, so they may read the store again.

use crate::filter::{FilterSpans, OperationNameFilter};
use crate::model::WaterfallModel;
use crate::row::Row;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use waterfall_core::{GroupId, WaterfallResult};
use waterfall_search::IndexPhase;

/// What changed in a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaterfallChange {
    /// Operation-name filter changed
    OperationNameFilters,
    /// Text query changed
    SearchQuery,
    /// A pending text query was applied
    SearchApplied,
    /// A group was expanded or collapsed
    SpanGroupToggled(GroupId),
    /// A span's subtree was hidden or shown
    SubtreeToggled(String),
    /// Groups and subtrees were opened to reveal a span
    ExpandedToSpan(String),
}

/// Receives store changes
pub trait WaterfallSubscriber: Send + Sync {
    /// Called once per change, outside the store lock
    fn on_change(&self, change: &WaterfallChange);
}

impl<F> WaterfallSubscriber for F
where
    F: Fn(&WaterfallChange) + Send + Sync,
{
    fn on_change(&self, change: &WaterfallChange) {
        self(change)
    }
}

/// Handle returned by [`WaterfallStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Thread-safe model with change notification
pub struct WaterfallStore {
    model: Mutex<WaterfallModel>,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn WaterfallSubscriber>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for WaterfallStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaterfallStore")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl WaterfallStore {
    /// Wrap a model
    pub fn new(model: WaterfallModel) -> Self {
        WaterfallStore {
            model: Mutex::new(model),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a subscriber
    pub fn subscribe(&self, subscriber: impl WaterfallSubscriber + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Remove a subscriber; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    fn notify(&self, change: WaterfallChange) {
        // Snapshot so subscribers can (un)subscribe from inside the callback
        let subscribers: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        debug!(change = ?change, subscribers = subscribers.len(), "Notifying subscribers");
        for subscriber in subscribers {
            subscriber.on_change(&change);
        }
    }

    /// Run `f` with shared access to the model
    pub fn read<R>(&self, f: impl FnOnce(&WaterfallModel) -> R) -> R {
        f(&*self.model.lock())
    }

    /// Rows for the fractional view range
    ///
    /// Notifies `SearchApplied` when a pending query got applied on the way.
    pub fn get_waterfall(&self, view_start: f64, view_end: f64) -> WaterfallResult<Arc<Vec<Row>>> {
        let (rows, applied) = {
            let mut model = self.model.lock();
            let applied = model.poll_search();
            (model.get_waterfall(view_start, view_end)?, applied)
        };
        if applied {
            self.notify(WaterfallChange::SearchApplied);
        }
        Ok(rows)
    }

    /// See [`WaterfallModel::toggle_operation_name_filter`]
    pub fn toggle_operation_name_filter(&self, name: &str) {
        self.model.lock().toggle_operation_name_filter(name);
        self.notify(WaterfallChange::OperationNameFilters);
    }

    /// See [`WaterfallModel::toggle_all_operation_name_filters`]
    pub fn toggle_all_operation_name_filters(&self) {
        self.model.lock().toggle_all_operation_name_filters();
        self.notify(WaterfallChange::OperationNameFilters);
    }

    /// See [`WaterfallModel::set_operation_name_filters`]
    pub fn set_operation_name_filters(&self, filter: OperationNameFilter) -> bool {
        let changed = self.model.lock().set_operation_name_filters(filter);
        if changed {
            self.notify(WaterfallChange::OperationNameFilters);
        }
        changed
    }

    /// See [`WaterfallModel::query_span_search`]
    pub fn query_span_search(&self, query: Option<&str>) -> bool {
        let changed = self.model.lock().query_span_search(query);
        if changed {
            self.notify(WaterfallChange::SearchQuery);
        }
        changed
    }

    /// Current matches for the text query
    pub fn filter_spans(&self) -> Option<FilterSpans> {
        self.model.lock().filter_spans().cloned()
    }

    /// Block until the search index settles; see
    /// [`WaterfallModel::wait_for_search_index`]
    pub fn wait_for_search_index(&self, timeout: Duration) -> bool {
        let search = {
            let model = self.model.lock();
            model.search_handle()
        };
        let ready = search.wait(timeout) == IndexPhase::Ready;
        let applied = self.model.lock().poll_search();
        if applied {
            self.notify(WaterfallChange::SearchApplied);
        }
        ready
    }

    /// See [`WaterfallModel::toggle_span_group`]
    pub fn toggle_span_group(&self, id: GroupId) -> WaterfallResult<()> {
        self.model.lock().toggle_span_group(id)?;
        self.notify(WaterfallChange::SpanGroupToggled(id));
        Ok(())
    }

    /// See [`WaterfallModel::toggle_span_subtree`]
    pub fn toggle_span_subtree(&self, span_id: &str) -> WaterfallResult<bool> {
        let hidden = self.model.lock().toggle_span_subtree(span_id)?;
        self.notify(WaterfallChange::SubtreeToggled(span_id.to_string()));
        Ok(hidden)
    }

    /// See [`WaterfallModel::expand_to_span`]
    pub fn expand_to_span(&self, span_id: &str) -> WaterfallResult<bool> {
        let changed = self.model.lock().expand_to_span(span_id)?;
        if changed {
            self.notify(WaterfallChange::ExpandedToSpan(span_id.to_string()));
        }
        Ok(changed)
    }

    /// Take the model back
    pub fn into_inner(self) -> WaterfallModel {
        self.model.into_inner()
    }
}
