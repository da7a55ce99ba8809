use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::analysis::impact::{self, ImpactReport};
use crate::analysis::stats::{self, Statistics};
use crate::data::loader;
use crate::data::types::{DataResult, DataSources, Event, ModelResults, PricePoint, QueryError};

/// Everything the API serves, loaded once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    prices: Vec<PricePoint>,
    events: Vec<Event>,
    model_results: ModelResults,
}

impl Dataset {
    /// Prices are kept ascending by date; equal dates keep their file order.
    pub fn new(mut prices: Vec<PricePoint>, events: Vec<Event>, model_results: ModelResults) -> Self {
        if !prices.windows(2).all(|w| w[0].date <= w[1].date) {
            debug!(rows = prices.len(), "Price series not in date order, sorting");
            prices.sort_by_key(|p| p.date);
        }
        Self {
            prices,
            events,
            model_results,
        }
    }

    #[instrument(skip_all, fields(prices = %sources.prices.display(), events = %sources.events.display()))]
    pub fn load(sources: &DataSources) -> DataResult<Self> {
        let prices = loader::load_prices(&sources.prices)?;
        let events = loader::load_events(&sources.events)?;
        let model_results = loader::load_model_results(&sources.model_results)?;

        metrics::gauge!("brent_api_price_points").set(prices.len() as f64);
        metrics::gauge!("brent_api_events").set(events.len() as f64);

        Ok(Self::new(prices, events, model_results))
    }

    pub fn prices(&self) -> &[PricePoint] {
        &self.prices
    }

    /// Inclusive on both ends. Reversed bounds yield an empty slice.
    pub fn prices_between(&self, start: NaiveDate, end: NaiveDate) -> &[PricePoint] {
        if start > end {
            return &[];
        }
        let lo = self.prices.partition_point(|p| p.date < start);
        let hi = self.prices.partition_point(|p| p.date <= end);
        &self.prices[lo..hi]
    }

    /// Range query over raw `YYYY-MM-DD` strings as they arrive on the wire.
    pub fn prices_in_range(&self, start: &str, end: &str) -> Result<&[PricePoint], QueryError> {
        let start = parse_query_date(start)?;
        let end = parse_query_date(end)?;
        Ok(self.prices_between(start, end))
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// First event carrying `id`, in file order.
    pub fn find_event(&self, id: i64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn change_points(&self) -> &Value {
        &self.model_results.change_points
    }

    pub fn impact(&self, event_id: &str) -> Result<ImpactReport<'_>, QueryError> {
        let id = event_id
            .trim()
            .parse::<i64>()
            .map_err(|_| QueryError::InvalidEventId(event_id.to_string()))?;
        let event = self.find_event(id).ok_or(QueryError::EventNotFound(id))?;
        Ok(impact::assess(event))
    }

    pub fn statistics(&self) -> Statistics {
        stats::summarize(&self.prices, &self.events)
    }
}

fn parse_query_date(s: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| QueryError::InvalidDate { input: s.to_string() })
}
