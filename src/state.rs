use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use cinefilter::data::loader;
use cinefilter::{Aggregate, CrossFilterStore, Dimension, FieldValue, FilterState, Subscription};

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
///
/// Holds a handle to the shared store plus a snapshot of everything the
/// panels draw. The snapshot is refreshed after the dashboard's own
/// mutations and whenever the store notifies.
pub struct DashboardState {
    pub store: CrossFilterStore,

    /// Aggregate snapshot, indexed like `Dimension::ALL`.
    aggregates: [Aggregate; 3],

    /// Filter snapshot.
    pub filters: FilterState,

    /// Movies in the dataset / movies passing all three filters.
    pub total: usize,
    pub matching: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    stale: Rc<Cell<bool>>,
    _subscription: Subscription,
}

impl DashboardState {
    pub fn new(store: CrossFilterStore) -> Self {
        let stale = Rc::new(Cell::new(false));
        let flag = Rc::clone(&stale);
        let subscription = store.subscribe(move |_| flag.set(true));

        let mut state = Self {
            aggregates: Dimension::ALL.map(Aggregate::empty),
            filters: FilterState::default(),
            total: 0,
            matching: 0,
            status_message: None,
            stale,
            _subscription: subscription,
            store,
        };
        state.refresh();
        state
    }

    pub fn aggregate(&self, dimension: Dimension) -> &Aggregate {
        &self.aggregates[slot(dimension)]
    }

    /// Re-read the snapshot if the store changed since the last read.
    pub fn refresh_if_stale(&mut self) {
        if self.stale.get() {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        for dimension in Dimension::ALL {
            self.aggregates[slot(dimension)] = self.store.aggregate(dimension);
        }
        self.filters = self.store.filters();
        self.total = self.store.dataset_len();
        self.matching = self.store.matching_count();
        self.stale.set(false);
    }

    /// Load a file and hand its records to the store. On failure the
    /// previous dataset stays in place.
    pub fn load_path(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(records) => {
                self.store.set_dataset(records);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
        self.refresh();
    }

    /// Toggle a single key in a dimension's filter (a bar click or checkbox).
    pub fn toggle_filter_value(&mut self, dimension: Dimension, value: &FieldValue) {
        self.store.toggle_filter_value(dimension, value);
        self.refresh();
    }

    /// Drop the filter on one dimension.
    pub fn clear_filter(&mut self, dimension: Dimension) {
        self.store.set_filter(dimension, Vec::<FieldValue>::new());
        self.refresh();
    }

    pub fn clear_all_filters(&mut self) {
        self.store.clear_filters();
        self.refresh();
    }
}

fn slot(dimension: Dimension) -> usize {
    match dimension {
        Dimension::Year => 0,
        Dimension::Age => 1,
        Dimension::Score => 2,
    }
}
