//! Read-only HTTP API over pre-computed Brent oil price data.
//!
//! The price series, event annotations and change-point model output are
//! loaded from disk once at startup (`data`), summarized per request
//! (`analysis`) and served over axum (`api`).

pub mod analysis;
pub mod api;
pub mod config;
pub mod data;
pub mod telemetry;
