use crate::domain::model::Record;
use crate::utils::error::{DemandError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

/// 將 CSV（含標題列）或 JSON（物件陣列）解碼為記錄
pub fn decode_records(path: &str, bytes: &[u8]) -> Result<Vec<Record>> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => decode_csv(bytes),
        Some("json") => decode_json(path, bytes),
        _ => Err(DemandError::InputFormatError {
            path: path.to_string(),
            reason: "expected a .csv or .json file".to_string(),
        }),
    }
}

fn decode_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let data: HashMap<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();
        records.push(Record { data });
    }
    Ok(records)
}

fn decode_json(path: &str, bytes: &[u8]) -> Result<Vec<Record>> {
    let rows: Vec<Value> = serde_json::from_slice(bytes)?;
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(map) => Ok(record_from_map(map)),
            other => Err(DemandError::InputFormatError {
                path: path.to_string(),
                reason: format!("element {} is not an object: {}", i, other),
            }),
        })
        .collect()
}

fn record_from_map(map: Map<String, Value>) -> Record {
    Record {
        data: map.into_iter().collect(),
    }
}
