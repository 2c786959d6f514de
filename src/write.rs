// src/write.rs

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

use crate::resolve::record::DIAGNOSTIC_FIELD;
use crate::table::ResultTable;

#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    pub sheet_name: String,
    pub column_padding: f64,
    /// Fixed width for the diagnostic column; `None` sizes it like the rest.
    pub diagnostic_width: Option<f64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            sheet_name: "Vehicle Data".to_string(),
            column_padding: 2.0,
            diagnostic_width: Some(12.0),
        }
    }
}

/// Serialize `table` as a single-sheet `.xlsx` and return the file bytes.
pub fn write_workbook(table: &ResultTable, opts: &WriterOptions) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let widths = column_widths(table, opts);

    let sheet = workbook.add_worksheet();
    sheet.set_name(&opts.sheet_name)?;

    for (col, name) in ResultTable::header().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header_format)?;
    }
    for (row, record) in table.records().iter().enumerate() {
        for (col, value) in record.values().iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, value)?;
        }
    }
    for (col, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    workbook.save_to_buffer()
}

/// Widest rendered value per column (header included) plus padding.
pub fn column_widths(table: &ResultTable, opts: &WriterOptions) -> Vec<f64> {
    ResultTable::header()
        .iter()
        .enumerate()
        .map(|(col, name)| {
            if *name == DIAGNOSTIC_FIELD {
                if let Some(fixed) = opts.diagnostic_width {
                    return fixed;
                }
            }
            let widest = table
                .records()
                .iter()
                .map(|r| r.values()[col].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0);
            widest as f64 + opts.column_padding
        })
        .collect()
}

/// `fleet.xlsx` -> `fleet_VIN_data.xlsx`; directories are dropped.
pub fn output_file_name(input_name: &str, suffix: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}{}", stem, suffix)
}
