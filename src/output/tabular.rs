//! Flattening of JSON reports into CSV rows

use serde_json::{Map, Value};

use crate::{Error, Result};

type Row = Map<String, Value>;

const ACCURACY_KEYS: [&str; 3] = ["accuracy_rate", "japanese_accuracy", "english_accuracy"];
const SUMMARY_KEYS: [&str; 7] = [
    "total_executions",
    "successful_executions",
    "failed_executions",
    "average_wall_time_ms",
    "average_cpu_time_ms",
    "average_memory_mb",
    "peak_memory_mb",
];

/// Turn a serialized report into CSV rows.
///
/// Maps holding a `results`, `details` or `violations` list produce one row
/// per element carrying selected top-level fields; other maps become a single
/// flattened row; arrays yield one row per element.
pub(crate) fn rows_for(data: Value) -> Vec<Row> {
    match data {
        Value::Object(map) => {
            if let Some(Value::Array(results)) = map.get("results") {
                expand(results, carried(&map, &ACCURACY_KEYS))
            } else if let Some(Value::Array(details)) = map.get("details") {
                expand(details, carried(&map, &SUMMARY_KEYS))
            } else if let Some(Value::Array(violations)) = map.get("violations") {
                let base: Row = map
                    .iter()
                    .filter(|(k, _)| k.as_str() != "violations")
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if violations.is_empty() {
                    vec![flatten(&base)]
                } else {
                    expand(violations, base)
                }
            } else {
                vec![flatten(&map)]
            }
        }
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => flatten(&map),
                other => single_value(other),
            })
            .collect(),
        other => vec![single_value(other)],
    }
}

fn single_value(value: Value) -> Row {
    let mut row = Row::new();
    row.insert("value".to_string(), value);
    row
}

fn carried(map: &Row, keys: &[&str]) -> Row {
    keys.iter()
        .filter_map(|k| map.get(*k).map(|v| ((*k).to_string(), v.clone())))
        .collect()
}

fn expand(items: &[Value], base: Row) -> Vec<Row> {
    items
        .iter()
        .map(|item| {
            let mut row = base.clone();
            if let Value::Object(fields) = item {
                row.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            flatten(&row)
        })
        .collect()
}

/// Flatten nested maps into `parent_child` keys; lists stay as JSON text.
pub(crate) fn flatten(map: &Row) -> Row {
    let mut out = Row::new();
    flatten_into(map, None, &mut out);
    out
}

fn flatten_into(map: &Row, prefix: Option<&str>, out: &mut Row) {
    for (key, value) in map {
        let name = prefix.map_or_else(|| key.clone(), |p| format!("{p}_{key}"));
        match value {
            Value::Object(inner) => flatten_into(inner, Some(&name), out),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render rows with a header line; `headers` defaults to the first row's keys.
pub(crate) fn write_rows(rows: &[Row], headers: Option<&[String]>) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(String::new());
    };
    let headers: Vec<String> =
        headers.map_or_else(|| first.keys().cloned().collect(), <[String]>::to_vec);

    let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
    writer
        .write_record(&headers)
        .map_err(|e| Error::FormatConversion(format!("Failed to convert to CSV: {e}")))?;
    for row in rows {
        let record: Vec<String> = headers.iter().map(|h| cell(row.get(h))).collect();
        writer
            .write_record(&record)
            .map_err(|e| Error::FormatConversion(format!("Failed to convert to CSV: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::FormatConversion(format!("Failed to convert to CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::FormatConversion(e.to_string()))
}
