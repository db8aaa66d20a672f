//! The cross-filtering store.
//!
//! One [`CrossFilterStore`] owns the movie dataset, the three filter
//! selections (year, age certification, score) and the three aggregate
//! views derived from them. Each view is computed from the dataset filtered
//! by the *other two* selections, so a chart keeps showing all of its own
//! options while reflecting the filters set on the other charts.
//!
//! ```text
//!  set_dataset ──────────► recompute year, age, score ─┐
//!  set_years_filter ─────► recompute age, score ───────┤
//!  set_ages_filter ──────► recompute year, score ──────┼──► notify subscribers
//!  set_scores_filter ────► recompute year, age ────────┘
//! ```
//!
//! # Threading and re-entrancy
//!
//! The store is single-threaded (`Rc<RefCell<..>>`). Cloning it yields
//! another handle to the same instance. Every mutation recomputes and
//! notifies before returning.
//!
//! Subscribers may mutate the store from their callback. No borrow is held
//! while callbacks run; a mutation made during notification is applied at
//! once but its event is queued and delivered after the current one. Setting
//! a selection to its current value is a no-op, so handlers that re-apply a
//! filter settle. Cascades longer than [`MAX_NOTIFY_ROUNDS`] are cut off:
//! the remaining queued events are folded into one final
//! [`Cause::CascadeTruncated`] event, and anything raised while that event is
//! delivered is dropped.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::data::filter::{self, FilterState, Selection};
use crate::data::model::{Aggregate, Dimension, FieldValue, Record};

/// Upper bound on queued events delivered by one outermost mutation.
pub const MAX_NOTIFY_ROUNDS: usize = 64;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// What triggered a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    DatasetLoaded,
    FilterChanged(Dimension),
    FiltersCleared,
    /// Stands in for the events left queued when a subscriber cascade hit
    /// [`MAX_NOTIFY_ROUNDS`].
    CascadeTruncated,
}

/// Delivered to subscribers after a dataset load that changed a view, and
/// after every change of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub cause: Cause,
    /// Dimensions whose aggregate now differs from before the mutation.
    /// Empty when a selection changed without affecting any view.
    pub updated: Vec<Dimension>,
}

type Callback = Rc<dyn Fn(&StoreEvent)>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct StoreState {
    dataset: Vec<Record>,
    filters: FilterState,
    year_agg: Aggregate,
    age_agg: Aggregate,
    score_agg: Aggregate,
}

impl StoreState {
    fn new() -> Self {
        StoreState {
            dataset: Vec::new(),
            filters: FilterState::default(),
            year_agg: Aggregate::empty(Dimension::Year),
            age_agg: Aggregate::empty(Dimension::Age),
            score_agg: Aggregate::empty(Dimension::Score),
        }
    }

    fn aggregate(&self, dimension: Dimension) -> &Aggregate {
        match dimension {
            Dimension::Year => &self.year_agg,
            Dimension::Age => &self.age_agg,
            Dimension::Score => &self.score_agg,
        }
    }

    fn aggregate_mut(&mut self, dimension: Dimension) -> &mut Aggregate {
        match dimension {
            Dimension::Year => &mut self.year_agg,
            Dimension::Age => &mut self.age_agg,
            Dimension::Score => &mut self.score_agg,
        }
    }

    /// Recompute `targets` and return the ones whose view changed.
    fn recompute(&mut self, targets: &[Dimension]) -> Vec<Dimension> {
        let mut changed = Vec::new();
        for &target in targets {
            let fresh = filter::aggregate(&self.dataset, &self.filters, target);
            log::debug!(
                "Recomputed {target}: {} buckets, {} movies",
                fresh.buckets.len(),
                fresh.total()
            );
            let slot = self.aggregate_mut(target);
            if *slot != fresh {
                *slot = fresh;
                changed.push(target);
            }
        }
        changed
    }
}

struct Shared {
    state: RefCell<StoreState>,
    observers: RefCell<Vec<(u64, Callback)>>,
    next_observer_id: Cell<u64>,
    pending: RefCell<VecDeque<StoreEvent>>,
    notifying: Cell<bool>,
}

/// Ends a notification loop, even one unwound by a panicking callback:
/// clears the `notifying` flag and discards events left in the queue.
struct NotifyGuard<'a>(&'a Shared);

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.notifying.set(false);
        self.0.pending.borrow_mut().clear();
    }
}

// ---------------------------------------------------------------------------
// CrossFilterStore
// ---------------------------------------------------------------------------

/// Handle to the shared cross-filter state. Construct once and pass clones
/// to every consumer.
#[derive(Clone)]
pub struct CrossFilterStore {
    shared: Rc<Shared>,
}

impl Default for CrossFilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CrossFilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("CrossFilterStore")
            .field("records", &state.dataset.len())
            .field("filters", &state.filters)
            .field("observers", &self.shared.observers.borrow().len())
            .finish()
    }
}

impl CrossFilterStore {
    pub fn new() -> Self {
        CrossFilterStore {
            shared: Rc::new(Shared {
                state: RefCell::new(StoreState::new()),
                observers: RefCell::new(Vec::new()),
                next_observer_id: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                notifying: Cell::new(false),
            }),
        }
    }

    /// A non-owning handle, for subscribers that need to reach the store
    /// without keeping it alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            shared: Rc::downgrade(&self.shared),
        }
    }

    // -- Inputs --

    /// Replace the dataset and recompute every view with the current filters.
    pub fn set_dataset(&self, records: Vec<Record>) {
        let updated = {
            let mut state = self.shared.state.borrow_mut();
            state.dataset = records;
            log::info!("Dataset replaced: {} movies", state.dataset.len());
            state.recompute(&Dimension::ALL)
        };
        if !updated.is_empty() {
            self.emit(StoreEvent {
                cause: Cause::DatasetLoaded,
                updated,
            });
        }
    }

    pub fn set_years_filter<I>(&self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.set_filter(Dimension::Year, values);
    }

    pub fn set_ages_filter<I>(&self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.set_filter(Dimension::Age, values);
    }

    pub fn set_scores_filter<I>(&self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.set_filter(Dimension::Score, values);
    }

    /// Replace the selection on `dimension` and recompute the other two
    /// views. An empty `values` clears the dimension's filter.
    pub fn set_filter<I>(&self, dimension: Dimension, values: I)
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        self.replace_selection(dimension, Selection::new(dimension, values));
    }

    /// Add `value` to the selection on `dimension`, or remove it if present.
    pub fn toggle_filter_value(&self, dimension: Dimension, value: impl Into<FieldValue>) {
        let mut selection = self.filter(dimension);
        selection.toggle(dimension, value.into());
        self.replace_selection(dimension, selection);
    }

    /// Empty all three selections and recompute every view.
    pub fn clear_filters(&self) {
        let updated = {
            let mut state = self.shared.state.borrow_mut();
            if state.filters.is_empty() {
                return;
            }
            state.filters = FilterState::default();
            state.recompute(&Dimension::ALL)
        };
        self.emit(StoreEvent {
            cause: Cause::FiltersCleared,
            updated,
        });
    }

    fn replace_selection(&self, dimension: Dimension, selection: Selection) {
        let updated = {
            let mut state = self.shared.state.borrow_mut();
            if *state.filters.get(dimension) == selection {
                log::trace!("{dimension} filter unchanged; skipping recomputation");
                return;
            }
            log::debug!("{dimension} filter set to {} values", selection.len());
            *state.filters.get_mut(dimension) = selection;
            state.recompute(&dimension.others())
        };
        self.emit(StoreEvent {
            cause: Cause::FilterChanged(dimension),
            updated,
        });
    }

    // -- Outputs --

    /// Current view for `dimension`.
    pub fn aggregate(&self, dimension: Dimension) -> Aggregate {
        self.shared.state.borrow().aggregate(dimension).clone()
    }

    pub fn filter(&self, dimension: Dimension) -> Selection {
        self.shared.state.borrow().filters.get(dimension).clone()
    }

    pub fn years_filter(&self) -> Selection {
        self.filter(Dimension::Year)
    }

    pub fn ages_filter(&self) -> Selection {
        self.filter(Dimension::Age)
    }

    pub fn scores_filter(&self) -> Selection {
        self.filter(Dimension::Score)
    }

    pub fn filters(&self) -> FilterState {
        self.shared.state.borrow().filters.clone()
    }

    pub fn dataset_len(&self) -> usize {
        self.shared.state.borrow().dataset.len()
    }

    /// Number of movies passing all three filters.
    pub fn matching_count(&self) -> usize {
        let state = self.shared.state.borrow();
        filter::matching_count(&state.dataset, &state.filters)
    }

    // -- Subscriptions --

    /// Register `callback`, called synchronously whenever an aggregate
    /// changes. The callback stays registered for as long as the returned
    /// [`Subscription`] lives.
    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        let id = self.shared.next_observer_id.get();
        self.shared.next_observer_id.set(id + 1);
        let callback: Callback = Rc::new(callback);
        self.shared.observers.borrow_mut().push((id, callback));
        Subscription {
            shared: Rc::downgrade(&self.shared),
            id: Some(id),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.observers.borrow().len()
    }

    fn emit(&self, event: StoreEvent) {
        self.shared.pending.borrow_mut().push_back(event);
        if self.shared.notifying.get() {
            // Delivered by the outer loop once the current event is done.
            return;
        }

        self.shared.notifying.set(true);
        let _guard = NotifyGuard(&self.shared);

        let mut rounds = 0;
        loop {
            let Some(event) = self.shared.pending.borrow_mut().pop_front() else {
                break;
            };
            rounds += 1;
            if rounds > MAX_NOTIFY_ROUNDS {
                let folded = self.shared.pending.borrow().len() + 1;
                log::warn!(
                    "Subscriber cascade exceeded {MAX_NOTIFY_ROUNDS} rounds; folding {folded} queued events into one"
                );
                let truncated = self.coalesce(event);
                self.deliver(&truncated);
                let late = self.shared.pending.borrow().len();
                if late > 0 {
                    log::warn!("Dropping {late} events raised during the truncated cascade");
                }
                break;
            }
            self.deliver(&event);
        }
    }

    /// Fold `first` and everything still queued into one event listing every
    /// view changed since the last delivery.
    fn coalesce(&self, first: StoreEvent) -> StoreEvent {
        let mut updated = first.updated;
        for event in self.shared.pending.borrow_mut().drain(..) {
            updated.extend(event.updated);
        }
        updated.sort();
        updated.dedup();
        StoreEvent {
            cause: Cause::CascadeTruncated,
            updated,
        }
    }

    fn deliver(&self, event: &StoreEvent) {
        let snapshot: Vec<(u64, Callback)> = self.shared.observers.borrow().clone();
        for (id, callback) in snapshot {
            let still_subscribed = self
                .shared
                .observers
                .borrow()
                .iter()
                .any(|(other, _)| *other == id);
            if still_subscribed {
                callback(event);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WeakStore
// ---------------------------------------------------------------------------

/// Non-owning handle obtained from [`CrossFilterStore::downgrade`].
#[derive(Clone)]
pub struct WeakStore {
    shared: Weak<Shared>,
}

impl WeakStore {
    pub fn upgrade(&self) -> Option<CrossFilterStore> {
        self.shared.upgrade().map(|shared| CrossFilterStore { shared })
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Keeps a callback registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    shared: Weak<Shared>,
    id: Option<u64>,
}

impl Subscription {
    /// Remove the callback now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the callback registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.id = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let (Some(id), Some(shared)) = (self.id.take(), self.shared.upgrade()) else {
            return;
        };
        // Callbacks may own other subscriptions; drop them after the borrow ends.
        let removed: Vec<(u64, Callback)> = {
            let mut observers = shared.observers.borrow_mut();
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *observers)
                .into_iter()
                .partition(|(other, _)| *other == id);
            *observers = kept;
            removed
        };
        drop(removed);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
