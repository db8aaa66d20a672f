//! Cross-filtering state for a movie analytics dashboard.
//!
//! Load a dataset with [`data::loader`], push it into a [`CrossFilterStore`],
//! set filter selections and read the per-dimension aggregates back.

pub mod data;
pub mod store;

pub use data::error::DataError;
pub use data::filter::{FilterState, Selection};
pub use data::model::{Aggregate, Bucket, Dimension, FieldValue, Record};
pub use store::{Cause, CrossFilterStore, StoreEvent, Subscription, WeakStore};
