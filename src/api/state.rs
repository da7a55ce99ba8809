use std::sync::Arc;

use crate::data::Dataset;

/// Shared by every handler. The dataset is immutable, so no locking is needed.
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }
}
