use std::collections::{BTreeSet, HashMap};

use super::model::{Aggregate, Bucket, Dimension, FieldValue, Record};

// ---------------------------------------------------------------------------
// Selection: accepted values on one dimension
// ---------------------------------------------------------------------------

/// Accepted values for one dimension. An empty selection means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    values: BTreeSet<FieldValue>,
}

impl Selection {
    /// Build a selection for `dimension`, canonicalising every value to the
    /// dimension's key type.
    pub fn new<I>(dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        Selection {
            values: values
                .into_iter()
                .map(|v| dimension.canonicalize(v.into()))
                .collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &FieldValue) -> bool {
        self.values.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldValue> {
        self.values.iter()
    }

    /// Add `value` if absent, remove it if present.
    pub fn toggle(&mut self, dimension: Dimension, value: FieldValue) {
        let value = dimension.canonicalize(value);
        if !self.values.remove(&value) {
            self.values.insert(value);
        }
    }

    /// Whether `record` passes this selection on `dimension`.
    ///
    /// * inactive selection → passes (no constraint)
    /// * record has no value on the dimension → fails
    /// * otherwise → membership test
    pub fn admits(&self, record: &Record, dimension: Dimension) -> bool {
        if !self.is_active() {
            return true;
        }
        record
            .value(dimension)
            .is_some_and(|v| self.values.contains(&v))
    }
}

// ---------------------------------------------------------------------------
// FilterState: the three selections together
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub years: Selection,
    pub ages: Selection,
    pub scores: Selection,
}

impl FilterState {
    pub fn get(&self, dimension: Dimension) -> &Selection {
        match dimension {
            Dimension::Year => &self.years,
            Dimension::Age => &self.ages,
            Dimension::Score => &self.scores,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut Selection {
        match dimension {
            Dimension::Year => &mut self.years,
            Dimension::Age => &mut self.ages,
            Dimension::Score => &mut self.scores,
        }
    }

    pub fn is_empty(&self) -> bool {
        Dimension::ALL.iter().all(|&d| !self.get(d).is_active())
    }

    /// Whether `record` passes the filters of every dimension except `target`.
    pub fn admits_except(&self, record: &Record, target: Dimension) -> bool {
        target
            .others()
            .iter()
            .all(|&d| self.get(d).admits(record, d))
    }

    /// Whether `record` passes all three filters.
    pub fn admits_all(&self, record: &Record) -> bool {
        Dimension::ALL.iter().all(|&d| self.get(d).admits(record, d))
    }
}

// ---------------------------------------------------------------------------
// Recomputation
// ---------------------------------------------------------------------------

/// Compute the aggregate view for `target`.
///
/// Records are filtered by the two other dimensions' selections only, then
/// grouped by their `target` value. Records without a `target` value do not
/// appear in any bucket. Buckets keep first-seen order.
pub fn aggregate(dataset: &[Record], filters: &FilterState, target: Dimension) -> Aggregate {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<FieldValue, usize> = HashMap::new();
    let mut raw_scores = Vec::new();

    for record in dataset.iter().filter(|r| filters.admits_except(r, target)) {
        if target == Dimension::Score {
            // A zero score is still a score here, only grouping treats it as missing.
            if let Some(score) = record.imdb_score.filter(|s| !s.is_nan()) {
                raw_scores.push(score);
            }
        }
        let Some(key) = record.value(target) else {
            continue;
        };
        match index.get(&key) {
            Some(&i) => buckets[i].count += 1,
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push(Bucket { key, count: 1 });
            }
        }
    }

    Aggregate {
        dimension: target,
        buckets,
        raw_scores,
    }
}

/// Number of records passing all three filters.
pub fn matching_count(dataset: &[Record], filters: &FilterState) -> usize {
    dataset.iter().filter(|r| filters.admits_all(r)).count()
}
