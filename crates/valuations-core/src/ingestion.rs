use std::collections::HashSet;

use polars::prelude::{Column, DataFrame, NamedFrom, PolarsResult, Series};
use serde_json::{Map, Value};

type JsonObject = Map<String, Value>;

/// Shape of a decoded API payload.
///
/// Feeds answer either with a bare list of records or with an envelope object whose
/// first non-empty list holds the records. Anything else carries no rows.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonPayload<'a> {
    Records(Vec<&'a JsonObject>),
    Record(&'a JsonObject),
    Empty,
}

impl<'a> JsonPayload<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => JsonPayload::Records(objects(items)),
            Value::Object(map) => {
                let wrapped = map.values().find_map(|candidate| match candidate {
                    Value::Array(items) if !items.is_empty() => Some(items),
                    _ => None,
                });
                match wrapped {
                    Some(items) => JsonPayload::Records(objects(items)),
                    None => JsonPayload::Record(map),
                }
            }
            _ => JsonPayload::Empty,
        }
    }

    pub fn rows(&self) -> Vec<&'a JsonObject> {
        match self {
            JsonPayload::Records(rows) => rows.clone(),
            JsonPayload::Record(row) => vec![*row],
            JsonPayload::Empty => Vec::new(),
        }
    }
}

// Non-object list elements cannot become rows.
fn objects(items: &[Value]) -> Vec<&JsonObject> {
    items.iter().filter_map(Value::as_object).collect()
}

/// Decodes any JSON payload into a working table. No validation happens here.
pub fn payload_to_frame(value: &Value) -> PolarsResult<DataFrame> {
    records_to_frame(&JsonPayload::classify(value).rows())
}

/// Builds one row per object; the column set is the union of keys in first-seen order.
pub fn records_to_frame(rows: &[&JsonObject]) -> PolarsResult<DataFrame> {
    if rows.is_empty() {
        return Ok(DataFrame::default());
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut names: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let columns = names
        .iter()
        .map(|name| {
            let cells: Vec<Option<&Value>> = rows
                .iter()
                .map(|row| row.get(*name).filter(|value| !value.is_null()))
                .collect();
            build_column(name, &cells)
        })
        .collect::<Vec<Column>>();

    DataFrame::new(columns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Null,
    Boolean,
    Int64,
    Float64,
    String,
    Mixed,
}

fn cell_kind(value: &Value) -> CellKind {
    match value {
        Value::Null => CellKind::Null,
        Value::Bool(_) => CellKind::Boolean,
        Value::Number(n) if n.is_i64() => CellKind::Int64,
        Value::Number(_) => CellKind::Float64,
        Value::String(_) => CellKind::String,
        Value::Array(_) | Value::Object(_) => CellKind::Mixed,
    }
}

fn column_kind(cells: &[Option<&Value>]) -> CellKind {
    let mut kind = CellKind::Null;
    for value in cells.iter().flatten() {
        let observed = cell_kind(value);
        kind = match (kind, observed) {
            (CellKind::Null, other) => other,
            (current, other) if current == other => current,
            (CellKind::Int64, CellKind::Float64) | (CellKind::Float64, CellKind::Int64) => {
                CellKind::Float64
            }
            _ => return CellKind::Mixed,
        };
    }
    kind
}

fn build_column(name: &str, cells: &[Option<&Value>]) -> Column {
    let series = match column_kind(cells) {
        CellKind::Boolean => Series::new(
            name.into(),
            cells
                .iter()
                .map(|cell| cell.and_then(Value::as_bool))
                .collect::<Vec<Option<bool>>>(),
        ),
        CellKind::Int64 => Series::new(
            name.into(),
            cells
                .iter()
                .map(|cell| cell.and_then(Value::as_i64))
                .collect::<Vec<Option<i64>>>(),
        ),
        CellKind::Float64 => Series::new(
            name.into(),
            cells
                .iter()
                .map(|cell| cell.and_then(Value::as_f64))
                .collect::<Vec<Option<f64>>>(),
        ),
        CellKind::Null | CellKind::String | CellKind::Mixed => {
            // Mixed columns keep non-string cells as their JSON text so they can still be coerced.
            let rendered: Vec<Option<String>> = cells
                .iter()
                .map(|cell| {
                    cell.map(|value| match value {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Series::new(
                name.into(),
                rendered
                    .iter()
                    .map(|opt| opt.as_deref())
                    .collect::<Vec<Option<&str>>>(),
            )
        }
    };
    series.into()
}
