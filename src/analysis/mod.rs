// Derived, per-request views over the loaded data
pub mod impact;
pub mod stats;
