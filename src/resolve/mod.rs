// src/resolve/mod.rs
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, time::Instant};
use tracing::{debug, info, warn};

use crate::fetch::{DecodeService, FetchError};
use crate::load::{columns::CANONICAL_VIN, RawTable};

pub mod record;

pub use record::{VehicleRecord, CANONICAL_FIELDS, INCORRECT_VIN};

const PROGRESS_EVERY: usize = 100;

/// Outcome of interpreting one decoder response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Decoded(VehicleRecord),
    Malformed { vin: String, diagnostic: String },
}

impl Resolution {
    pub fn into_record(self) -> VehicleRecord {
        match self {
            Resolution::Decoded(record) => record,
            Resolution::Malformed { vin, diagnostic } => VehicleRecord::error(&vin, &diagnostic),
        }
    }
}

/// Entries stay loose so one odd item does not sink the whole response.
#[derive(Debug, Deserialize)]
struct DecodeResponse {
    #[serde(rename = "Results")]
    results: Vec<Value>,
}

/// Strip every whitespace character; `None` when nothing is left.
pub fn clean_vin(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Cleaned values of the `VIN` column, in row order, blanks skipped.
pub fn collect_vins(table: &RawTable) -> Vec<String> {
    match table.column(CANONICAL_VIN) {
        Some(idx) => table.column_values(idx).filter_map(clean_vin).collect(),
        None => Vec::new(),
    }
}

pub fn interpret_response(vin: &str, body: &str) -> Resolution {
    match serde_json::from_str::<DecodeResponse>(body) {
        Ok(resp) => {
            let variables: HashMap<String, String> = resp
                .results
                .into_iter()
                .filter_map(decoded_variable)
                .collect();
            Resolution::Decoded(VehicleRecord::decoded(vin, &variables))
        }
        Err(e) => {
            debug!(vin, error = %e, "unusable decoder response");
            Resolution::Malformed {
                vin: vin.to_string(),
                diagnostic: INCORRECT_VIN.to_string(),
            }
        }
    }
}

/// `(Variable, Value)` of a `Results` entry; entries without a string `Variable` are skipped.
fn decoded_variable(mut item: Value) -> Option<(String, String)> {
    let entry = item.as_object_mut()?;
    let name = match entry.remove("Variable")? {
        Value::String(name) => name,
        _ => return None,
    };
    let value = entry.remove("Value").unwrap_or(Value::Null);
    Some((name, render_value(value)))
}

fn render_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Look up each VIN in turn. Bad responses become error records; the first
/// network failure aborts the pass and nothing resolved so far is returned.
pub fn resolve_all<D: DecodeService + ?Sized>(
    service: &D,
    vins: &[String],
) -> Result<Vec<VehicleRecord>, FetchError> {
    let start = Instant::now();
    let mut records = Vec::with_capacity(vins.len());

    for (idx, vin) in vins.iter().enumerate() {
        let body = service.fetch(vin).map_err(|e| {
            warn!(vin = %vin, resolved = idx, error = %e, "aborting VIN resolution");
            e
        })?;
        records.push(interpret_response(vin, &body).into_record());

        if (idx + 1) % PROGRESS_EVERY == 0 {
            info!(done = idx + 1, total = vins.len(), elapsed = ?start.elapsed(), "resolving VINs");
        }
    }

    let errors = records.iter().filter(|r| r.is_error()).count();
    info!(total = records.len(), errors, elapsed = ?start.elapsed(), "resolved VINs");
    Ok(records)
}
