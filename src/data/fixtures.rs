// Shared in-memory data for unit tests.

use chrono::NaiveDate;
use serde_json::json;

use crate::data::loader::read_events;
use crate::data::{DataSources, Dataset, ModelResults, PricePoint};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn sample_prices() -> Vec<PricePoint> {
    vec![
        PricePoint::new(ymd(2020, 1, 1), 50.0),
        PricePoint::new(ymd(2020, 4, 15), 35.0),
        PricePoint::new(ymd(2020, 6, 1), 40.0),
    ]
}

pub const SAMPLE_EVENTS_CSV: &str = "event_id,event_date,event_name,event_type,expected_impact,description\n\
1,2020-03-06,OPEC+ talks collapse,OPEC,decrease,Russia rejects deeper cuts\n\
2,2020-04-12,OPEC+ record cut,OPEC,increase,9.7 mb/d production cut agreed\n\
3,2020-01-03,Soleimani strike,Conflict,increase,\n";

pub fn sample_dataset() -> Dataset {
    let events = read_events(SAMPLE_EVENTS_CSV.as_bytes(), std::path::Path::new("events.csv")).unwrap();
    let model_results = ModelResults::new(json!([
        {"date": "2020-03-09", "mean_before": 55.1, "mean_after": 28.4}
    ]));
    Dataset::new(sample_prices(), events, model_results)
}

pub fn sources_in(dir: &std::path::Path, prices: &str, events: &str, model_results: &str) -> DataSources {
    DataSources::new(dir.join(prices), dir.join(events), dir.join(model_results))
}
