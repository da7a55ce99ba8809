use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while loading the on-disk artifacts. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to parse JSON {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: missing required column `{column}`", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("{}:{line}: {message}", .path.display())]
    InvalidRow {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: model results have no `change_points` field", .path.display())]
    MissingChangePoints { path: PathBuf },
}

pub type DataResult<T> = Result<T, DataError>;

/// Errors a caller can trigger through a query. They never touch the loaded state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate { input: String },

    #[error("Invalid event id '{0}'")]
    InvalidEventId(String),

    #[error("Event {0} not found")]
    EventNotFound(i64),
}

/// Where the three artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSources {
    pub prices: PathBuf,
    pub events: PathBuf,
    pub model_results: PathBuf,
}

impl DataSources {
    pub fn new(prices: impl Into<PathBuf>, events: impl Into<PathBuf>, model_results: impl Into<PathBuf>) -> Self {
        Self {
            prices: prices.into(),
            events: events.into(),
            model_results: model_results.into(),
        }
    }
}

// One row of the price series. Field names follow the CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Price")]
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// A historical event annotation.
///
/// `record` holds every CSV column in header order and is what gets serialized;
/// `id`, `date` and `event_type` are typed copies used for lookups and grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Event {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub date: NaiveDate,
    #[serde(skip)]
    pub event_type: String,
    pub record: Map<String, Value>,
}

/// Output of the upstream change-point model. Only `change_points` is served.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResults {
    pub change_points: Value,
}

impl ModelResults {
    pub fn new(change_points: Value) -> Self {
        Self { change_points }
    }
}
