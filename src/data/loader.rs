//! Startup loaders for the price CSV, the events CSV and the model results JSON.
//!
//! Everything here runs once before the listener is bound; any error is fatal.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use serde_json::{Map, Number, Value};
use tracing::{debug, info, warn};

use crate::data::types::{DataError, DataResult, Event, ModelResults, PricePoint};

const DATE_COLUMN: &str = "Date";
const PRICE_COLUMN: &str = "Price";
const EVENT_ID_COLUMN: &str = "event_id";
const EVENT_DATE_COLUMN: &str = "event_date";
const EVENT_TYPE_COLUMN: &str = "event_type";
const CHANGE_POINTS_FIELD: &str = "change_points";

pub fn load_prices(path: &Path) -> DataResult<Vec<PricePoint>> {
    let prices = read_prices(open(path)?, path)?;
    info!(path = %path.display(), rows = prices.len(), "Loaded price series");
    Ok(prices)
}

pub fn load_events(path: &Path) -> DataResult<Vec<Event>> {
    let events = read_events(open(path)?, path)?;
    info!(path = %path.display(), rows = events.len(), "Loaded historical events");
    Ok(events)
}

pub fn load_model_results(path: &Path) -> DataResult<ModelResults> {
    let results = read_model_results(BufReader::new(open(path)?), path)?;
    info!(
        path = %path.display(),
        change_points = results.change_points.as_array().map(Vec::len),
        "Loaded model results"
    );
    Ok(results)
}

/// Parse a `Date,Price` CSV. `origin` is only used in error messages.
pub fn read_prices<R: Read>(reader: R, origin: &Path) -> DataResult<Vec<PricePoint>> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_error(origin, e))?.clone();
    let header_map = build_header_map(&headers);
    let date_idx = required_column(&header_map, DATE_COLUMN, origin)?;
    let price_idx = required_column(&header_map, PRICE_COLUMN, origin)?;

    let mut prices = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        // records() starts after the header, CSV lines are 1-based
        let line = idx + 2;
        let record = result.map_err(|e| csv_error(origin, e))?;

        let raw_date = required_value(&record, date_idx, DATE_COLUMN, origin, line)?;
        let date = parse_date(raw_date).map_err(|m| invalid_row(origin, line, m))?;

        let raw_price = required_value(&record, price_idx, PRICE_COLUMN, origin, line)?;
        let price = raw_price
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| invalid_row(origin, line, format!("invalid price '{raw_price}'")))?;

        prices.push(PricePoint::new(date, price));
    }
    Ok(prices)
}

/// Parse the events CSV, keeping every column in header order.
///
/// Columns other than the three required ones are typed per column: integer,
/// float or boolean when every non-empty cell agrees, text otherwise. Text
/// cells keep their surrounding whitespace. Empty cells become `null`.
/// Repeated header names get `.1`, `.2`, ... suffixes so no column is lost.
pub fn read_events<R: Read>(reader: R, origin: &Path) -> DataResult<Vec<Event>> {
    let mut rdr = csv_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_error(origin, e))?.clone();
    let names = dedupe_header_names(headers.iter().map(normalize_header_name).collect());
    let header_map: HashMap<String, usize> = names.iter().enumerate().map(|(idx, n)| (n.clone(), idx)).collect();
    let id_idx = required_column(&header_map, EVENT_ID_COLUMN, origin)?;
    let date_idx = required_column(&header_map, EVENT_DATE_COLUMN, origin)?;
    let type_idx = required_column(&header_map, EVENT_TYPE_COLUMN, origin)?;

    let records = rdr
        .records()
        .collect::<Result<Vec<StringRecord>, _>>()
        .map_err(|e| csv_error(origin, e))?;

    let kinds: Vec<ColumnKind> = (0..names.len())
        .map(|col| {
            if col == type_idx {
                ColumnKind::Text
            } else {
                ColumnKind::infer(records.iter().filter_map(|r| cell(r, col)))
            }
        })
        .collect();
    debug!(columns = ?names, kinds = ?kinds, "Inferred event column types");

    let mut events = Vec::with_capacity(records.len());
    let mut seen = HashSet::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        let line = idx + 2;

        let raw_id = required_value(record, id_idx, EVENT_ID_COLUMN, origin, line)?;
        let id = raw_id
            .parse::<i64>()
            .map_err(|_| invalid_row(origin, line, format!("invalid event_id '{raw_id}'")))?;
        let raw_date = required_value(record, date_idx, EVENT_DATE_COLUMN, origin, line)?;
        let date = parse_date(raw_date).map_err(|m| invalid_row(origin, line, m))?;
        required_value(record, type_idx, EVENT_TYPE_COLUMN, origin, line)?;
        // grouping uses exactly the text the record serializes
        let event_type = raw_cell(record, type_idx).unwrap_or_default().to_string();

        let mut fields = Map::with_capacity(names.len());
        for (col, name) in names.iter().enumerate() {
            let value = if col == id_idx {
                Value::from(id)
            } else if col == date_idx {
                Value::String(date.format("%Y-%m-%d").to_string())
            } else {
                kinds[col].to_value(record, col)
            };
            fields.insert(name.clone(), value);
        }

        if !seen.insert(id) {
            warn!(event_id = id, line, "Duplicate event_id, lookups return the first occurrence");
        }
        events.push(Event {
            id,
            date,
            event_type,
            record: fields,
        });
    }
    Ok(events)
}

/// Parse the model results document. Only `change_points` is retained.
pub fn read_model_results<R: Read>(reader: R, origin: &Path) -> DataResult<ModelResults> {
    let value: Value = serde_json::from_reader(reader).map_err(|source| DataError::Json {
        path: origin.to_path_buf(),
        source,
    })?;

    let missing = || DataError::MissingChangePoints {
        path: origin.to_path_buf(),
    };
    let Value::Object(mut doc) = value else {
        return Err(missing());
    };
    let change_points = doc.remove(CHANGE_POINTS_FIELD).ok_or_else(missing)?;

    Ok(ModelResults::new(change_points))
}

/// Source CSVs mix ISO dates with the `20-May-87` and `Apr 22, 2020` styles of the
/// published Brent series, so a small fixed set of formats is accepted.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d-%b-%y", "%b %d, %Y", "%m/%d/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, DD-Mon-YY, Mon DD, YYYY, MM/DD/YYYY."
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let (mut integer, mut float, mut boolean, mut any) = (true, true, true, false);
        for c in cells {
            any = true;
            integer &= c.parse::<i64>().is_ok();
            float &= c.parse::<f64>().is_ok_and(f64::is_finite);
            boolean &= parse_bool(c).is_some();
        }
        match (any, integer, float, boolean) {
            (false, ..) => ColumnKind::Text,
            (true, true, _, _) => ColumnKind::Integer,
            (true, false, true, _) => ColumnKind::Float,
            (true, false, false, true) => ColumnKind::Boolean,
            _ => ColumnKind::Text,
        }
    }

    fn to_value(self, record: &StringRecord, col: usize) -> Value {
        if self == ColumnKind::Text {
            return raw_cell(record, col).map_or(Value::Null, |raw| Value::String(raw.to_string()));
        }
        let Some(raw) = cell(record, col) else {
            return Value::Null;
        };
        let typed = match self {
            ColumnKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            ColumnKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            ColumnKind::Boolean => parse_bool(raw).map(Value::Bool),
            ColumnKind::Text => None,
        };
        typed.unwrap_or_else(|| Value::String(raw.to_string()))
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn open(path: &Path) -> DataResult<File> {
    File::open(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

fn dedupe_header_names(names: Vec<String>) -> Vec<String> {
    // every name as written is reserved first, so a suffix never shadows a real column
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut first_seen: HashSet<&str> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in &names {
        if first_seen.insert(name.as_str()) {
            out.push(name.clone());
            continue;
        }
        let mut n = 1;
        let mut candidate = format!("{name}.{n}");
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{name}.{n}");
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        // first occurrence wins on duplicate headers
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str, origin: &Path) -> DataResult<usize> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| DataError::MissingColumn {
            path: origin.to_path_buf(),
            column: name.to_string(),
        })
}

/// Trimmed cell, `None` when blank. Used for every typed value.
fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Cell exactly as written in the file, `None` when empty.
fn raw_cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).filter(|s| !s.is_empty())
}

fn required_value<'a>(
    record: &'a StringRecord,
    idx: usize,
    name: &str,
    origin: &Path,
    line: usize,
) -> DataResult<&'a str> {
    cell(record, idx).ok_or_else(|| invalid_row(origin, line, format!("missing value for `{name}`")))
}

fn invalid_row(origin: &Path, line: usize, message: impl Into<String>) -> DataError {
    DataError::InvalidRow {
        path: origin.to_path_buf(),
        line,
        message: message.into(),
    }
}

fn csv_error(origin: &Path, source: csv::Error) -> DataError {
    DataError::Csv {
        path: origin.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn origin() -> &'static Path {
        Path::new("fixture.csv")
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_read_prices_mixed_date_formats() {
        let csv = "Date,Price\n20-May-87,18.63\n\"Apr 22, 2020\",13.77\n2020-06-01,40\n";
        let prices = read_prices(csv.as_bytes(), origin()).unwrap();
        assert_eq!(
            prices,
            vec![
                PricePoint::new(ymd(1987, 5, 20), 18.63),
                PricePoint::new(ymd(2020, 4, 22), 13.77),
                PricePoint::new(ymd(2020, 6, 1), 40.0),
            ]
        );
    }

    #[test]
    fn test_read_prices_strips_bom_and_whitespace() {
        let csv = "\u{feff}Date , Price\n 2020-01-01 , 50.5 \n";
        let prices = read_prices(csv.as_bytes(), origin()).unwrap();
        assert_eq!(prices, vec![PricePoint::new(ymd(2020, 1, 1), 50.5)]);
    }

    #[test]
    fn test_read_prices_missing_column() {
        let csv = "Date,Close\n2020-01-01,50\n";
        let err = read_prices(csv.as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "Price"));
    }

    #[test]
    fn test_read_prices_bad_price_reports_line() {
        let csv = "Date,Price\n2020-01-01,50\n2020-01-02,abc\n";
        let err = read_prices(csv.as_bytes(), origin()).unwrap_err();
        match err {
            DataError::InvalidRow { line, message, .. } => {
                assert_eq!(line, 3);
                assert!(message.contains("abc"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_prices_bad_date() {
        let csv = "Date,Price\n2020.01.01,50\n";
        let err = read_prices(csv.as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { line: 2, .. }));
    }

    #[test]
    fn test_read_events_keeps_columns_and_types() {
        let csv = "event_id,event_date,event_name,event_type,magnitude,severity,confirmed,notes\n\
                   1,2020-03-06,OPEC+ talks collapse,OPEC,1.5,3,true,\n\
                   2,11-Sep-01,Attacks,Conflict,2,1,false,markets closed\n";
        let events = read_events(csv.as_bytes(), origin()).unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.date, ymd(2020, 3, 6));
        assert_eq!(first.event_type, "OPEC");
        let keys: Vec<&str> = first.record.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["event_id", "event_date", "event_name", "event_type", "magnitude", "severity", "confirmed", "notes"]
        );
        assert_eq!(
            serde_json::to_value(first).unwrap(),
            json!({
                "event_id": 1,
                "event_date": "2020-03-06",
                "event_name": "OPEC+ talks collapse",
                "event_type": "OPEC",
                "magnitude": 1.5,
                "severity": 3,
                "confirmed": true,
                "notes": null
            })
        );

        let second = &events[1];
        assert_eq!(second.record["event_date"], json!("2001-09-11"));
        assert_eq!(second.record["magnitude"], json!(2.0));
        assert_eq!(second.record["notes"], json!("markets closed"));
    }

    #[test]
    fn test_read_events_keeps_text_whitespace() {
        let csv = "event_id,event_date,event_type,description\n 1 , 2020-01-01 ,\" OPEC \",\"  padded text  \"\n";
        let events = read_events(csv.as_bytes(), origin()).unwrap();
        assert_eq!(events[0].id, 1);
        assert_eq!(events[0].date, ymd(2020, 1, 1));
        assert_eq!(events[0].record["description"], json!("  padded text  "));
        assert_eq!(events[0].event_type, " OPEC ");
        assert_eq!(events[0].record["event_type"], json!(events[0].event_type));
    }

    #[test]
    fn test_read_events_renames_repeated_headers() {
        let csv = "event_id,event_date,event_type,event_type,event_type.1\n1,2020-01-01,OPEC,Conflict,x\n";
        let events = read_events(csv.as_bytes(), origin()).unwrap();
        let event = &events[0];
        assert_eq!(event.event_type, "OPEC");
        assert_eq!(event.record["event_id"], json!(1));
        assert_eq!(event.record["event_type"], json!("OPEC"));
        assert_eq!(event.record["event_type.1"], json!("x"));
        assert_eq!(event.record["event_type.2"], json!("Conflict"));
        assert_eq!(event.record.len(), 5);
    }

    #[test]
    fn test_read_events_numeric_event_type_stays_text() {
        let csv = "event_id,event_date,event_type\n1,2020-01-01,7\n";
        let events = read_events(csv.as_bytes(), origin()).unwrap();
        assert_eq!(events[0].event_type, "7");
        assert_eq!(events[0].record["event_type"], json!("7"));
    }

    #[test]
    fn test_read_events_rejects_non_integer_id() {
        let csv = "event_id,event_date,event_type\nx1,2020-01-01,OPEC\n";
        let err = read_events(csv.as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { line: 2, .. }));
    }

    #[test]
    fn test_read_events_requires_event_type() {
        let csv = "event_id,event_date\n1,2020-01-01\n";
        let err = read_events(csv.as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "event_type"));
    }

    #[test]
    fn test_read_model_results() {
        let doc = r#"{"change_points": [{"date": "2020-03-09", "prob": 0.97}], "tau_samples": 4000}"#;
        let results = read_model_results(doc.as_bytes(), origin()).unwrap();
        assert_eq!(results.change_points, json!([{"date": "2020-03-09", "prob": 0.97}]));
    }

    #[test]
    fn test_read_model_results_requires_change_points() {
        let err = read_model_results(r#"{"posterior": []}"#.as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::MissingChangePoints { .. }));

        let err = read_model_results("[1, 2]".as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::MissingChangePoints { .. }));

        let err = read_model_results("{not json".as_bytes(), origin()).unwrap_err();
        assert!(matches!(err, DataError::Json { .. }));
    }

    #[test]
    fn test_load_from_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Price\n2020-01-01,50.0\n2020-01-02,51.0").unwrap();
        let prices = load_prices(file.path()).unwrap();
        assert_eq!(prices.len(), 2);

        let missing = file.path().with_extension("missing");
        let err = load_events(&missing).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
