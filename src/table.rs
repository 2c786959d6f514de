use std::collections::HashSet;
use tracing::debug;

use crate::resolve::{VehicleRecord, CANONICAL_FIELDS};

/// Resolved rows, unique by VIN, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    records: Vec<VehicleRecord>,
    duplicates_dropped: usize,
}

impl ResultTable {
    /// Keep the first record for each VIN and drop the rest.
    pub fn build(records: Vec<VehicleRecord>) -> Self {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let records: Vec<VehicleRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.vin().to_string()))
            .collect();

        let duplicates_dropped = total - records.len();
        if duplicates_dropped > 0 {
            debug!(duplicates_dropped, "dropped duplicate VIN rows");
        }
        Self {
            records,
            duplicates_dropped,
        }
    }

    pub fn header() -> &'static [&'static str] {
        &CANONICAL_FIELDS
    }

    pub fn records(&self) -> &[VehicleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn error_rows(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }
}
