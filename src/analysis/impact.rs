//! Event impact reports.
//!
//! The figures are NOT derived from the change points or the price series.
//! Every report carries the same fixed [`PLACEHOLDER_IMPACT`] values until
//! nearest-change-point matching is specified.

use serde::Serialize;

use crate::data::Event;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactFigures {
    pub closest_change_point: &'static str,
    pub days_difference: i64,
    pub price_before: f64,
    pub price_after: f64,
    pub absolute_change: f64,
    pub percent_change: f64,
    pub confidence_interval: [f64; 2],
}

/// Stub values returned for every event.
pub const PLACEHOLDER_IMPACT: ImpactFigures = ImpactFigures {
    closest_change_point: "2020-04-15",
    days_difference: 3,
    price_before: 32.50,
    price_after: 40.80,
    absolute_change: 8.30,
    percent_change: 25.5,
    confidence_interval: [23.2, 27.8],
};

/// The matched event's full record followed by the impact fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport<'a> {
    pub event: &'a Event,
    #[serde(flatten)]
    pub figures: ImpactFigures,
}

pub fn assess(event: &Event) -> ImpactReport<'_> {
    ImpactReport {
        event,
        figures: PLACEHOLDER_IMPACT,
    }
}
