//! Integration tests for the cross-filter store: aggregate totals, filter
//! independence between dimensions, idempotence and reset behaviour.

use std::cell::RefCell;
use std::rc::Rc;

use cinefilter::data::loader;
use cinefilter::{Bucket, CrossFilterStore, Dimension, FieldValue, Record};

// ============================================================================
// FIXTURES
// ============================================================================

fn three_movies() -> Vec<Record> {
    vec![
        Record::new(Some(2020), Some("PG"), Some(7.1)),
        Record::new(Some(2020), Some("R"), Some(8.0)),
        Record::new(Some(2021), Some("PG"), Some(6.5)),
    ]
}

/// A larger, uneven dataset with holes in every column.
fn catalogue() -> Vec<Record> {
    let ratings = [Some("G"), Some("PG"), Some("PG-13"), Some("R"), None, Some("")];
    (0..120)
        .map(|i: i64| {
            let year = match i % 7 {
                0 => None,
                6 => Some(0),
                n => Some(2015 + n),
            };
            let rating = ratings[(i % ratings.len() as i64) as usize];
            let score = match i % 11 {
                0 => None,
                n => Some(5.0 + n as f64 * 0.3),
            };
            Record::new(year, rating, score)
        })
        .collect()
}

fn loaded(records: Vec<Record>) -> CrossFilterStore {
    let store = CrossFilterStore::new();
    store.set_dataset(records);
    store
}

fn bucket(key: impl Into<FieldValue>, count: usize) -> Bucket {
    Bucket {
        key: key.into(),
        count,
    }
}

// ============================================================================
// TOTALS
// ============================================================================

#[test]
fn year_total_is_dataset_minus_falsy_years() {
    for records in [three_movies(), catalogue(), Vec::new()] {
        let expected = records
            .iter()
            .filter(|r| r.release_year.is_some_and(|y| y != 0))
            .count();
        let store = loaded(records);
        assert_eq!(store.aggregate(Dimension::Year).total(), expected);
    }
}

#[test]
fn empty_dataset_gives_empty_views() {
    let store = loaded(three_movies());
    store.set_dataset(Vec::new());

    for dimension in Dimension::ALL {
        let agg = store.aggregate(dimension);
        assert!(agg.is_empty(), "{dimension} should be empty");
        assert!(agg.raw_scores.is_empty());
    }
    assert_eq!(store.dataset_len(), 0);
}

// ============================================================================
// WORKED EXAMPLES
// ============================================================================

#[test]
fn age_filter_narrows_year_and_score_views() {
    let store = loaded(three_movies());
    assert_eq!(
        store.aggregate(Dimension::Year).buckets,
        vec![bucket(2020, 2), bucket(2021, 1)]
    );
    let ages_before = store.aggregate(Dimension::Age);

    store.set_ages_filter(["PG"]);

    assert_eq!(
        store.aggregate(Dimension::Year).buckets,
        vec![bucket(2020, 1), bucket(2021, 1)]
    );
    assert_eq!(store.aggregate(Dimension::Age), ages_before);
    assert_eq!(store.aggregate(Dimension::Score).raw_scores, vec![7.1, 6.5]);
}

#[test]
fn zero_scores_are_listed_but_not_bucketed() {
    let store = loaded(vec![
        Record::new(Some(2020), Some("PG"), Some(7.1)),
        Record::new(Some(2020), Some("PG"), Some(0.0)),
    ]);

    store.set_years_filter([2020]);

    let scores = store.aggregate(Dimension::Score);
    assert_eq!(scores.raw_scores, vec![7.1, 0.0]);
    assert_eq!(scores.buckets, vec![bucket(7.1, 1)]);
}

#[test]
fn unmatched_year_filter_empties_dependent_views() {
    let store = loaded(three_movies());

    store.set_years_filter(["2099"]);

    assert!(store.aggregate(Dimension::Age).is_empty());
    let scores = store.aggregate(Dimension::Score);
    assert!(scores.is_empty());
    assert!(scores.raw_scores.is_empty());
    // The year chart keeps all of its own options.
    assert_eq!(store.aggregate(Dimension::Year).total(), 3);
}

// ============================================================================
// CROSS-FILTER CONTRACT
// ============================================================================

#[test]
fn score_filter_leaves_score_view_alone() {
    let store = loaded(catalogue());
    let scores_before = store.aggregate(Dimension::Score);
    let years_before = store.aggregate(Dimension::Year);
    let ages_before = store.aggregate(Dimension::Age);

    let picked: Vec<FieldValue> = scores_before.keys().take(2).cloned().collect();
    assert_eq!(picked.len(), 2);
    store.set_scores_filter(picked);

    assert_eq!(store.aggregate(Dimension::Score), scores_before);
    assert_ne!(store.aggregate(Dimension::Year), years_before);
    assert_ne!(store.aggregate(Dimension::Age), ages_before);
}

#[test]
fn every_view_matches_a_fresh_computation() {
    let records = catalogue();
    let store = loaded(records.clone());
    store.set_years_filter([2016, 2018]);
    store.set_ages_filter(["PG", "R"]);
    store.set_scores_filter(["5.6", "6.2", "7.1"]);

    // Rebuild each view from scratch with only the other two filters.
    let fresh = CrossFilterStore::new();
    fresh.set_dataset(records);
    for dimension in Dimension::ALL {
        for other in dimension.others() {
            fresh.set_filter(other, store.filter(other).iter());
        }
        assert_eq!(fresh.aggregate(dimension), store.aggregate(dimension));
        fresh.clear_filters();
    }
}

#[test]
fn numeric_and_text_filter_values_are_equivalent() {
    let by_number = loaded(three_movies());
    by_number.set_years_filter([2020]);
    by_number.set_scores_filter([8]);

    let by_text = loaded(three_movies());
    by_text.set_years_filter(["2020"]);
    by_text.set_scores_filter(["8.0"]);

    for dimension in Dimension::ALL {
        assert_eq!(by_number.aggregate(dimension), by_text.aggregate(dimension));
    }
    assert_eq!(by_number.aggregate(Dimension::Age).buckets, vec![bucket("R", 1)]);
}

// ============================================================================
// IDEMPOTENCE AND RESET
// ============================================================================

#[test]
fn repeated_filter_gives_identical_views() {
    let store = loaded(catalogue());

    store.set_years_filter([2017]);
    let first: Vec<_> = Dimension::ALL.map(|d| store.aggregate(d)).into();
    store.set_years_filter([2017]);
    let second: Vec<_> = Dimension::ALL.map(|d| store.aggregate(d)).into();

    assert_eq!(first, second);
}

#[test]
fn empty_filter_restores_unfiltered_views() {
    let store = loaded(catalogue());
    let unfiltered: Vec<_> = Dimension::ALL.map(|d| store.aggregate(d)).into();

    store.set_ages_filter(["PG-13"]);
    store.set_ages_filter(Vec::<&str>::new());

    let restored: Vec<_> = Dimension::ALL.map(|d| store.aggregate(d)).into();
    assert_eq!(unfiltered, restored);
    assert!(!store.ages_filter().is_active());
}

#[test]
fn reloading_keeps_current_filters() {
    let store = loaded(three_movies());
    store.set_ages_filter(["R"]);

    store.set_dataset(vec![
        Record::new(Some(1999), Some("R"), Some(9.0)),
        Record::new(Some(2005), Some("G"), Some(6.0)),
    ]);

    assert_eq!(store.aggregate(Dimension::Year).buckets, vec![bucket(1999, 1)]);
    assert_eq!(store.aggregate(Dimension::Age).total(), 2);
}

// ============================================================================
// SUBSCRIPTIONS
// ============================================================================

#[test]
fn subscribers_see_consistent_views() {
    let store = CrossFilterStore::new();
    let weak = store.downgrade();
    let seen = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&seen);
    let _sub = store.subscribe(move |event| {
        let Some(reader) = weak.upgrade() else {
            return;
        };
        sink.borrow_mut()
            .push((event.updated.clone(), reader.aggregate(Dimension::Year).total()));
    });

    store.set_dataset(three_movies());
    store.set_ages_filter(["R"]);

    assert_eq!(
        *seen.borrow(),
        vec![
            (Dimension::ALL.to_vec(), 3),
            (vec![Dimension::Year, Dimension::Score], 1),
        ]
    );
}

#[test]
fn selection_change_is_reported_even_when_views_stay_put() {
    let store = loaded(three_movies());
    let events = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&events);
    let _sub = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    store.set_years_filter([2020, 2021]);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert!(events[0].updated.is_empty());
}

// ============================================================================
// LOADER → STORE
// ============================================================================

#[test]
fn json_dataset_flows_into_store() {
    let records = loader::records_from_json_str(
        r#"[
            {"release_year": 2020, "age_certification": "PG", "imdb_score": 7.1},
            {"release_year": 2020, "age_certification": "R", "imdb_score": 8.0},
            {"release_year": 2021, "age_certification": "PG", "imdb_score": 6.5},
            {"age_certification": "PG"}
        ]"#,
    )
    .unwrap();
    let store = loaded(records);

    assert_eq!(store.aggregate(Dimension::Year).total(), 3);
    assert_eq!(store.aggregate(Dimension::Age).buckets, vec![bucket("PG", 3), bucket("R", 1)]);
}
