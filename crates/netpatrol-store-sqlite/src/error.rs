//! Error type for `netpatrol-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its closed set (e.g. an unknown status).
  #[error("decode error: {0}")]
  Decode(String),

  /// An ordered listing met a row without a usable value for its key.
  #[error("cannot order by {0}: some rows have no usable value")]
  OrderingUnavailable(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
