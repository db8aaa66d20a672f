use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::ChunkReader;
use serde_json::{Map, Value as JsonValue};

use super::error::DataError;
use super::model::{parse_year, Dimension, Record};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a movie dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat columns `release_year`, `age_certification`, `imdb_score`
/// * `.json`    – `[{ "release_year": 2020, "age_certification": "PG", "imdb_score": 7.1 }, ...]`
/// * `.csv`     – header row with the same column names
pub fn load_file(path: &Path) -> Result<Vec<Record>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!(DataError::UnsupportedExtension(other.to_string())),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!("Loaded {} movie records from {}", records.len(), path.display());
    Ok(records)
}

/// Column names accepted for each dimension, canonical name first.
fn column_aliases(dimension: Dimension) -> [&'static str; 2] {
    let short = match dimension {
        Dimension::Year => "year",
        Dimension::Age => "age",
        Dimension::Score => "score",
    };
    [dimension.field_name(), short]
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    records_from_json_str(&text)
}

/// Parse a JSON document holding an array of movie objects.
pub fn records_from_json_str(text: &str) -> Result<Vec<Record>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    records_from_json(&root)
}

/// Convert an already-parsed JSON value into records.
///
/// The top level must be an array; anything else is rejected. Rows that are
/// not objects are skipped. Fields are read leniently: numeric strings are
/// accepted for year and score, numbers for the age rating.
pub fn records_from_json(root: &JsonValue) -> Result<Vec<Record>> {
    let rows = match root {
        JsonValue::Array(rows) => rows,
        other => bail!(DataError::NotAnArray(json_kind(other))),
    };

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            log::warn!("Skipping row {i}: expected an object, found {}", json_kind(row));
            continue;
        };
        records.push(Record {
            release_year: json_field(obj, Dimension::Year).and_then(json_year),
            age_certification: json_field(obj, Dimension::Age).and_then(json_text),
            imdb_score: json_field(obj, Dimension::Score).and_then(json_number),
        });
    }
    Ok(records)
}

fn json_field(obj: &Map<String, JsonValue>, dimension: Dimension) -> Option<&JsonValue> {
    column_aliases(dimension)
        .iter()
        .find_map(|name| obj.get(*name))
}

fn json_kind(val: &JsonValue) -> &'static str {
    match val {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

fn json_year(val: &JsonValue) -> Option<i64> {
    match val {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => parse_year(s),
        _ => None,
    }
}

fn json_text(val: &JsonValue) -> Option<String> {
    match val {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    records_from_csv(file)
}

/// CSV layout: header row, then one movie per row. Any of the three columns
/// may be absent; empty or unparseable cells become missing values.
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let position = |dimension: Dimension| {
        column_aliases(dimension)
            .iter()
            .find_map(|name| headers.iter().position(|h| h.trim() == *name))
    };
    let year_idx = position(Dimension::Year);
    let age_idx = position(Dimension::Age);
    let score_idx = position(Dimension::Score);

    if year_idx.is_none() && age_idx.is_none() && score_idx.is_none() {
        bail!(DataError::MissingColumns);
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        records.push(Record {
            release_year: cell(year_idx).and_then(parse_year),
            age_certification: cell(age_idx).map(str::to_string),
            imdb_score: cell(score_idx).and_then(|s| s.parse().ok()),
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    records_from_parquet(file)
}

/// Read movie records from Parquet data.
///
/// Expected schema (every column optional, nullable):
/// - `release_year`: Int32 / Int64 (Float64 and Utf8 are tolerated)
/// - `age_certification`: Utf8 / LargeUtf8
/// - `imdb_score`: Float64 / Float32 (integers and Utf8 are tolerated)
pub fn records_from_parquet<R: ChunkReader + 'static>(reader: R) -> Result<Vec<Record>> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(reader).context("reading parquet metadata")?;
    let batches = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in batches {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let column = |dimension: Dimension| {
            column_aliases(dimension)
                .iter()
                .find_map(|name| schema.index_of(name).ok())
                .map(|idx| batch.column(idx).clone())
        };
        let year_col = column(Dimension::Year);
        let age_col = column(Dimension::Age);
        let score_col = column(Dimension::Score);

        if year_col.is_none() && age_col.is_none() && score_col.is_none() {
            bail!(DataError::MissingColumns);
        }

        for row in 0..batch.num_rows() {
            records.push(Record {
                release_year: year_col.as_ref().and_then(|c| extract_year(c, row)),
                age_certification: age_col.as_ref().and_then(|c| extract_text(c, row)),
                imdb_score: score_col.as_ref().and_then(|c| extract_number(c, row)),
            });
        }
    }

    Ok(records)
}

// -- Arrow helpers --

fn downcast<T: 'static>(col: &ArrayRef) -> Option<&T> {
    col.as_any().downcast_ref::<T>()
}

fn extract_year(col: &ArrayRef, row: usize) -> Option<i64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Int32 => downcast::<Int32Array>(col).map(|a| a.value(row) as i64),
        DataType::Int64 => downcast::<Int64Array>(col).map(|a| a.value(row)),
        DataType::Float64 => downcast::<Float64Array>(col)
            .map(|a| a.value(row))
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64),
        DataType::Utf8 => downcast::<StringArray>(col).and_then(|a| parse_year(a.value(row))),
        other => {
            log::debug!("Ignoring release_year column of type {other:?}");
            None
        }
    }
}

fn extract_text(col: &ArrayRef, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => downcast::<StringArray>(col).map(|a| a.value(row).to_string()),
        DataType::LargeUtf8 => {
            downcast::<LargeStringArray>(col).map(|a| a.value(row).to_string())
        }
        DataType::Int32 => downcast::<Int32Array>(col).map(|a| a.value(row).to_string()),
        DataType::Int64 => downcast::<Int64Array>(col).map(|a| a.value(row).to_string()),
        other => {
            log::debug!("Ignoring age_certification column of type {other:?}");
            None
        }
    }
}

fn extract_number(col: &ArrayRef, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => downcast::<Float64Array>(col).map(|a| a.value(row)),
        DataType::Float32 => downcast::<Float32Array>(col).map(|a| a.value(row) as f64),
        DataType::Int32 => downcast::<Int32Array>(col).map(|a| a.value(row) as f64),
        DataType::Int64 => downcast::<Int64Array>(col).map(|a| a.value(row) as f64),
        DataType::Utf8 => {
            downcast::<StringArray>(col).and_then(|a| a.value(row).trim().parse().ok())
        }
        other => {
            log::debug!("Ignoring imdb_score column of type {other:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    #[test]
    fn json_reads_lenient_fields() {
        let text = r#"[
            {"release_year": 2020, "age_certification": "PG", "imdb_score": 7.1},
            {"release_year": "2021", "age_certification": null, "imdb_score": "6.5"},
            {"year": 2019.0, "age": 13},
            42
        ]"#;
        let records = records_from_json_str(text).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new(Some(2020), Some("PG"), Some(7.1)),
                Record::new(Some(2021), None, Some(6.5)),
                Record::new(Some(2019), Some("13"), None),
            ]
        );
    }

    #[test]
    fn json_rejects_non_array_root() {
        let err = records_from_json_str(r#"{"release_year": 2020}"#).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::NotAnArray("an object"))
        );
    }

    #[test]
    fn csv_reads_partial_rows() {
        let text = "title,release_year,age_certification,imdb_score\n\
                    A,2020,PG,7.1\n\
                    B,,R,8.0\n\
                    C,2021,,n/a\n";
        let records = records_from_csv(text.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                Record::new(Some(2020), Some("PG"), Some(7.1)),
                Record::new(None, Some("R"), Some(8.0)),
                Record::new(Some(2021), None, None),
            ]
        );
    }

    #[test]
    fn csv_without_known_columns_is_an_error() {
        let err = records_from_csv("title,genre\nA,drama\n".as_bytes()).unwrap_err();
        assert_eq!(err.downcast_ref::<DataError>(), Some(&DataError::MissingColumns));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = load_file(Path::new("movies.xlsx")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DataError>(),
            Some(&DataError::UnsupportedExtension("xlsx".into()))
        );
    }

    #[test]
    fn parquet_round_trips_nullable_columns() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("release_year", DataType::Int64, true),
            Field::new("age_certification", DataType::Utf8, true),
            Field::new("imdb_score", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![Some(2020), None])),
                Arc::new(StringArray::from(vec![Some("PG"), Some("R")])),
                Arc::new(Float64Array::from(vec![Some(7.1), None])),
            ],
        )
        .unwrap();

        let path = std::env::temp_dir().join(format!(
            "cinefilter-loader-{}.parquet",
            std::process::id()
        ));
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
            writer.write(&batch).unwrap();
            writer.close().unwrap();
        }

        let records = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(
            records,
            vec![
                Record::new(Some(2020), Some("PG"), Some(7.1)),
                Record::new(None, Some("R"), None),
            ]
        );
    }
}
