// Static datasets: loading from disk and read-only queries
pub mod types;
pub use types::*;
pub mod loader;
pub mod dataset;
pub use dataset::Dataset;

#[cfg(test)]
pub(crate) mod fixtures;
