use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// FieldValue – a single key on one dimension
// ---------------------------------------------------------------------------

/// A dynamically-typed field value, used both as a filter entry and as the
/// key of an aggregate bucket.
/// Kept in `BTreeSet` / `HashMap` downstream so it must be `Ord` and `Hash`.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

// -- Manual Eq/Ord so FieldValue can sit in a BTreeSet --

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use FieldValue::*;
        fn rank(v: &FieldValue) -> u8 {
            match v {
                Integer(_) => 0,
                Float(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for FieldValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FieldValue::Integer(i) => i.hash(state),
            FieldValue::Float(f) => f.to_bits().hash(state),
            FieldValue::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FieldValue {
    /// Numeric view of the value, used for chart positions.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Integer(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&FieldValue> for FieldValue {
    fn from(v: &FieldValue) -> Self {
        v.clone()
    }
}

// ---------------------------------------------------------------------------
// Dimension – one filter / aggregation axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Year,
    Age,
    Score,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Year, Dimension::Age, Dimension::Score];

    /// The two dimensions whose filters feed this dimension's aggregate.
    pub fn others(self) -> [Dimension; 2] {
        match self {
            Dimension::Year => [Dimension::Age, Dimension::Score],
            Dimension::Age => [Dimension::Year, Dimension::Score],
            Dimension::Score => [Dimension::Year, Dimension::Age],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Year => "Release year",
            Dimension::Age => "Age certification",
            Dimension::Score => "IMDb score",
        }
    }

    /// Name of the record field backing this dimension.
    pub fn field_name(self) -> &'static str {
        match self {
            Dimension::Year => "release_year",
            Dimension::Age => "age_certification",
            Dimension::Score => "imdb_score",
        }
    }

    /// Convert a caller-supplied filter value to this dimension's key type.
    ///
    /// Years become integers, ages become text, scores become floats.
    /// Values that cannot be converted are returned unchanged; they will
    /// never match a record.
    pub fn canonicalize(self, value: FieldValue) -> FieldValue {
        match (self, value) {
            (Dimension::Year, FieldValue::Float(f)) if f.is_finite() && f.fract() == 0.0 => {
                FieldValue::Integer(f as i64)
            }
            (Dimension::Year, FieldValue::Text(s)) => match parse_year(&s) {
                Some(y) => FieldValue::Integer(y),
                None => FieldValue::Text(s),
            },
            (Dimension::Age, FieldValue::Integer(i)) => FieldValue::Text(i.to_string()),
            (Dimension::Age, FieldValue::Float(f)) => FieldValue::Text(f.to_string()),
            (Dimension::Score, FieldValue::Integer(i)) => FieldValue::Float(i as f64),
            (Dimension::Score, FieldValue::Text(s)) => match s.trim().parse::<f64>() {
                Ok(f) => FieldValue::Float(f),
                Err(_) => FieldValue::Text(s),
            },
            (_, other) => other,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse an integer year, accepting whole-number floats such as `"2020.0"`.
pub(crate) fn parse_year(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i64),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Record – one movie row
// ---------------------------------------------------------------------------

/// A single movie row. Every field is optional; rows are never rejected for
/// missing data, they simply drop out of the affected aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, alias = "year")]
    pub release_year: Option<i64>,
    #[serde(default, alias = "age")]
    pub age_certification: Option<String>,
    #[serde(default, alias = "score")]
    pub imdb_score: Option<f64>,
}

impl Record {
    pub fn new(
        release_year: Option<i64>,
        age_certification: Option<&str>,
        imdb_score: Option<f64>,
    ) -> Self {
        Record {
            release_year,
            age_certification: age_certification.map(str::to_string),
            imdb_score,
        }
    }

    /// The record's key on `dimension`, or `None` when the field is missing
    /// or falsy (year 0, empty rating, score 0 or NaN).
    pub fn value(&self, dimension: Dimension) -> Option<FieldValue> {
        match dimension {
            Dimension::Year => self
                .release_year
                .filter(|&y| y != 0)
                .map(FieldValue::Integer),
            Dimension::Age => self
                .age_certification
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(FieldValue::from),
            Dimension::Score => self.score().map(FieldValue::Float),
        }
    }

    /// The truthy IMDb score, if any.
    pub fn score(&self) -> Option<f64> {
        self.imdb_score.filter(|s| *s != 0.0 && !s.is_nan())
    }
}

// ---------------------------------------------------------------------------
// Aggregate – one derived count-by-key view
// ---------------------------------------------------------------------------

/// One `{ key, count }` pair of an aggregate view.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: FieldValue,
    pub count: usize,
}

/// The derived view for one dimension. Buckets are in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub dimension: Dimension,
    pub buckets: Vec<Bucket>,
    /// Raw scores of every surviving record, `0.0` included; missing and NaN
    /// scores are left out. Only populated for the score dimension.
    pub raw_scores: Vec<f64>,
}

impl Aggregate {
    pub fn empty(dimension: Dimension) -> Self {
        Aggregate {
            dimension,
            buckets: Vec::new(),
            raw_scores: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum of all bucket counts.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }

    pub fn count_for(&self, key: &FieldValue) -> usize {
        self.buckets
            .iter()
            .find(|b| &b.key == key)
            .map_or(0, |b| b.count)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldValue> {
        self.buckets.iter().map(|b| &b.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_fields_count_as_missing() {
        let r = Record::new(Some(0), Some(""), Some(0.0));
        assert_eq!(r.value(Dimension::Year), None);
        assert_eq!(r.value(Dimension::Age), None);
        assert_eq!(r.value(Dimension::Score), None);

        let nan = Record::new(None, None, Some(f64::NAN));
        assert_eq!(nan.score(), None);
    }

    #[test]
    fn canonicalize_converts_to_dimension_key_type() {
        assert_eq!(
            Dimension::Year.canonicalize("2020".into()),
            FieldValue::Integer(2020)
        );
        assert_eq!(
            Dimension::Year.canonicalize(2021.0.into()),
            FieldValue::Integer(2021)
        );
        assert_eq!(
            Dimension::Age.canonicalize(13.into()),
            FieldValue::Text("13".into())
        );
        assert_eq!(
            Dimension::Score.canonicalize("7.1".into()),
            FieldValue::Float(7.1)
        );
        assert_eq!(Dimension::Score.canonicalize(8.into()), FieldValue::Float(8.0));
        // Unconvertible values pass through untouched.
        assert_eq!(
            Dimension::Year.canonicalize("soon".into()),
            FieldValue::Text("soon".into())
        );
    }

    #[test]
    fn field_values_order_by_type_then_value() {
        let mut v = vec![
            FieldValue::Text("PG".into()),
            FieldValue::Float(6.5),
            FieldValue::Integer(2021),
            FieldValue::Integer(2020),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                FieldValue::Integer(2020),
                FieldValue::Integer(2021),
                FieldValue::Float(6.5),
                FieldValue::Text("PG".into()),
            ]
        );
    }

    #[test]
    fn record_deserializes_with_short_aliases() {
        let r: Record =
            serde_json::from_str(r#"{"year": 2020, "age": "PG", "score": 7.1}"#).unwrap();
        assert_eq!(r, Record::new(Some(2020), Some("PG"), Some(7.1)));

        let partial: Record = serde_json::from_str(r#"{"release_year": 1999}"#).unwrap();
        assert_eq!(partial.age_certification, None);
        assert_eq!(partial.imdb_score, None);
    }

    #[test]
    fn dimension_others_exclude_self() {
        for d in Dimension::ALL {
            assert!(!d.others().contains(&d));
        }
    }
}
