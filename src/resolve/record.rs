use std::collections::HashMap;

pub const FIELD_COUNT: usize = 20;

/// Output column order. Every record carries exactly these fields.
pub const CANONICAL_FIELDS: [&str; FIELD_COUNT] = [
    "VIN",
    "VIN Mask",
    "Model Year",
    "Manufacturer",
    "Make",
    "Model",
    "Trim",
    "Weight Class",
    "Body/Cab Type",
    "Body Class",
    "Drive Type",
    "Fuel Type",
    "Engine Model",
    "Engine Configuration",
    "Engine Cyl",
    "Displacement (Litres)",
    "Engine Horse Power",
    "Transmission",
    "Speeds",
    "Error Test",
];

/// Decoder variable behind each field after `VIN`, in `CANONICAL_FIELDS` order.
const SOURCE_VARIABLES: [&str; FIELD_COUNT - 1] = [
    "Vehicle Descriptor",
    "Model Year",
    "Manufacturer Name",
    "Make",
    "Model",
    "Trim",
    "Gross Vehicle Weight Rating From",
    "Cab Type",
    "Body Class",
    "Drive Type",
    "Fuel Type - Primary",
    "Engine Model",
    "Engine Configuration",
    "Engine Number of Cylinders",
    "Displacement (L)",
    "Engine Brake (hp) From",
    "Transmission Style",
    "Transmission Speeds",
    "Error Text",
];

pub const DIAGNOSTIC_FIELD: &str = "Error Test";
pub const NOT_AVAILABLE: &str = "N/A";
pub const ERROR_VALUE: &str = "Error";
pub const INCORRECT_VIN: &str = "Error: Incorrect VIN, no data exists";

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    values: [String; FIELD_COUNT],
    is_error: bool,
}

impl VehicleRecord {
    /// Build from a decoded `Variable -> Value` map; absent variables become `N/A`.
    pub fn decoded(vin: &str, variables: &HashMap<String, String>) -> Self {
        let values = std::array::from_fn(|i| match i {
            0 => vin.to_string(),
            _ => variables
                .get(SOURCE_VARIABLES[i - 1])
                .cloned()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        });
        Self {
            values,
            is_error: false,
        }
    }

    pub fn error(vin: &str, diagnostic: &str) -> Self {
        let values = std::array::from_fn(|i| match i {
            0 => vin.to_string(),
            i if i == FIELD_COUNT - 1 => diagnostic.to_string(),
            _ => ERROR_VALUE.to_string(),
        });
        Self {
            values,
            is_error: true,
        }
    }

    pub fn vin(&self) -> &str {
        &self.values[0]
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        CANONICAL_FIELDS
            .iter()
            .position(|f| *f == field)
            .map(|i| self.values[i].as_str())
    }

    pub fn values(&self) -> &[String; FIELD_COUNT] {
        &self.values
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}
