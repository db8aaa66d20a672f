use thiserror::Error;

/// Typed failures of the dataset loaders. Wrapped in `anyhow::Error` on the
/// way out; callers can `downcast_ref::<DataError>()` to tell them apart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("expected a top-level JSON array of movie records, found {0}")]
    NotAnArray(&'static str),

    #[error("none of the columns release_year, age_certification, imdb_score are present")]
    MissingColumns,
}
