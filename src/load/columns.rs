use tracing::{debug, warn};

use super::RawTable;

pub const CANONICAL_VIN: &str = "VIN";

/// Locates the VIN column. An exact header name, when configured, is tried
/// first; the substring rule is the fallback, so a template with
/// "Driving Region" ahead of "VIN Number" still needs the exact name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VinColumnMatcher {
    exact: Option<String>,
    needle: String,
}

impl VinColumnMatcher {
    pub fn new(exact: Option<String>, needle: &str) -> Self {
        Self {
            exact: exact
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty()),
            needle: needle.to_lowercase(),
        }
    }

    pub fn find(&self, headers: &[String]) -> Option<usize> {
        if let Some(exact) = &self.exact {
            if let Some(idx) = headers
                .iter()
                .position(|h| h.trim().to_lowercase() == *exact)
            {
                return Some(idx);
            }
            debug!(exact = %exact, "no exact VIN header; falling back to substring match");
        }
        headers
            .iter()
            .position(|h| h.to_lowercase().contains(&self.needle))
    }
}

impl Default for VinColumnMatcher {
    fn default() -> Self {
        Self::new(None, "vin")
    }
}

/// Rename the matched header to [`CANONICAL_VIN`] and return its index.
pub fn normalize_vin_column(table: &mut RawTable, matcher: &VinColumnMatcher) -> Option<usize> {
    match matcher.find(&table.headers) {
        Some(idx) => {
            debug!(original = %table.headers[idx], column = idx, "using VIN column");
            table.headers[idx] = CANONICAL_VIN.to_string();
            Some(idx)
        }
        None => {
            warn!(headers = ?table.headers, "no VIN column found; output will be empty");
            None
        }
    }
}
