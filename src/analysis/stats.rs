use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::data::{Event, PricePoint};

/// Summary served by `/api/statistics`. Statistics that are undefined for the
/// current series serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_data_points: usize,
    pub date_range: DateRange,
    pub price_statistics: PriceStatistics,
    pub total_events: usize,
    /// Ordered by count descending, then type name.
    #[serde(serialize_with = "serialize_counts")]
    pub events_by_type: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation (n - 1), undefined below two points.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// `prices` must be ascending by date, which `Dataset` guarantees.
pub fn summarize(prices: &[PricePoint], events: &[Event]) -> Statistics {
    let values: Vec<f64> = prices.iter().map(|p| p.price).collect();

    Statistics {
        total_data_points: prices.len(),
        date_range: DateRange {
            start: prices.first().map(|p| p.date),
            end: prices.last().map(|p| p.date),
        },
        price_statistics: PriceStatistics {
            mean: mean(&values),
            median: median(&values),
            std: sample_std(&values),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        },
        total_events: events.len(),
        events_by_type: count_by_type(events),
    }
}

pub fn count_by_type(events: &[Event]) -> Vec<(String, usize)> {
    events
        .iter()
        .map(|e| e.event_type.as_str())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(t, n)| (t.to_string(), n))
        .collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

fn serialize_counts<S: Serializer>(counts: &[(String, usize)], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(counts.iter().map(|(t, n)| (t, n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{sample_dataset, ymd};
    use serde_json::json;

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_summarize_sample() {
        let dataset = sample_dataset();
        let stats = summarize(dataset.prices(), dataset.events());

        assert_eq!(stats.total_data_points, 3);
        assert_eq!(stats.date_range.start, Some(ymd(2020, 1, 1)));
        assert_eq!(stats.date_range.end, Some(ymd(2020, 6, 1)));
        assert!(approx(stats.price_statistics.mean, 125.0 / 3.0));
        assert!(approx(stats.price_statistics.median, 40.0));
        // sample std of [50, 35, 40]
        assert!(approx(stats.price_statistics.std, (175.0_f64 / 3.0).sqrt()));
        assert!(approx(stats.price_statistics.min, 35.0));
        assert!(approx(stats.price_statistics.max, 50.0));
        assert_eq!(stats.total_events, 3);
        assert_eq!(
            stats.events_by_type,
            vec![("OPEC".to_string(), 2), ("Conflict".to_string(), 1)]
        );
    }

    #[test]
    fn test_events_by_type_sums_to_total() {
        let dataset = sample_dataset();
        let stats = dataset.statistics();
        let sum: usize = stats.events_by_type.iter().map(|(_, n)| n).sum();
        assert_eq!(sum, stats.total_events);
    }

    #[test]
    fn test_empty_series_is_null() {
        let stats = summarize(&[], &[]);
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            value,
            json!({
                "total_data_points": 0,
                "date_range": {"start": null, "end": null},
                "price_statistics": {"mean": null, "median": null, "std": null, "min": null, "max": null},
                "total_events": 0,
                "events_by_type": {}
            })
        );
    }

    #[test]
    fn test_single_point_has_no_std() {
        let prices = [PricePoint::new(ymd(2020, 1, 1), 42.0)];
        let stats = summarize(&prices, &[]);
        assert_eq!(stats.price_statistics.std, None);
        assert_eq!(stats.price_statistics.mean, Some(42.0));
        assert_eq!(stats.price_statistics.median, Some(42.0));
    }

    #[test]
    fn test_median_even() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }
}
