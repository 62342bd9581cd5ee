//! Rendering of local results as JSON or CSV text.

use serde_json::{Map, Value};

use super::helpers::flatten;
use super::local::LocalResult;
use crate::ast::Format;
use crate::error::{FiklResult, QueryError};

pub fn render(result: &LocalResult, format: Format) -> FiklResult<String> {
    match format {
        Format::Json => render_json(&result.to_value()),
        Format::Csv => render_csv(&result.rows()),
    }
}

pub fn render_json(value: &Value) -> FiklResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| QueryError::Render(e.to_string()))
}

fn row_map(row: &Value) -> Map<String, Value> {
    match row {
        Value::Object(map) => flatten(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rows flattened to dotted columns; the header is the union of keys in
/// first-seen order. Missing and null cells are empty.
pub fn render_csv(rows: &[Value]) -> FiklResult<String> {
    let flat_rows: Vec<Map<String, Value>> = rows.iter().map(row_map).collect();

    let mut header: Vec<&str> = Vec::new();
    for row in &flat_rows {
        for key in row.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }

    if header.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    let render_err = |e: csv::Error| QueryError::Render(e.to_string());

    writer.write_record(&header).map_err(render_err)?;
    for row in &flat_rows {
        let record: Vec<String> = header
            .iter()
            .map(|column| row.get(*column).map(cell).unwrap_or_default())
            .collect();
        writer.write_record(&record).map_err(render_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| QueryError::Render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| QueryError::Render(e.to_string()))
}
