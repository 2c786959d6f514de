// src/load/mod.rs
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use std::{io::Cursor, path::Path};
use thiserror::Error;
use tracing::{debug, info};

pub mod columns;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to open the spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("unable to read CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook has {} sheets but none named '{expected}' (found: {})", .available.len(), .available.join(", "))]
    MissingSheet {
        expected: String,
        available: Vec<String>,
    },

    #[error("the workbook does not contain any worksheets")]
    NoSheets,

    #[error("header row {row} is past the end of the sheet")]
    HeaderRowMissing { row: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub preferred_sheet: String,
    /// 0-based; rows above it are title/banner rows.
    pub header_row: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    /// Column names, from the header row of the sheet.
    pub headers: Vec<String>,
    /// Each data row, padded to `headers.len()`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Index of the first header equal to `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |row| row.get(idx).map(String::as_str).unwrap_or(""))
    }

    fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        let headers = if grid.is_empty() {
            Vec::new()
        } else {
            grid.remove(0)
        };
        let mut width = headers.len();
        let rows: Vec<Vec<String>> = grid
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        for row in &rows {
            width = width.max(row.len());
        }

        let mut table = RawTable { headers, rows };
        table.headers.resize(width, String::new());
        for row in table.rows.iter_mut() {
            row.resize(width, String::new());
        }
        table
    }
}

/// Parse `bytes` into a [`RawTable`]. `.csv` files go through the CSV reader;
/// everything else is handed to calamine, which sniffs xls/xlsx/xlsb/ods.
#[tracing::instrument(level = "info", skip(bytes, opts), fields(size = bytes.len()))]
pub fn load_table(bytes: &[u8], file_name: &str, opts: &LoadOptions) -> Result<RawTable, LoadError> {
    let table = if is_csv(file_name) {
        load_csv(bytes, opts.header_row)?
    } else {
        load_workbook(bytes, opts)?
    };
    info!(
        columns = table.headers.len(),
        rows = table.rows.len(),
        "loaded input table"
    );
    Ok(table)
}

fn is_csv(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn load_workbook(bytes: &[u8], opts: &LoadOptions) -> Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let names = workbook.sheet_names();
    let sheet = select_sheet(&names, &opts.preferred_sheet)?;
    debug!(sheet = %sheet, sheets = names.len(), "selected worksheet");

    let range = workbook.worksheet_range(&sheet)?;
    let grid = grid_from_range(&range, opts.header_row)?;
    Ok(RawTable::from_grid(grid))
}

/// Single-sheet workbooks use that sheet; otherwise the preferred name must exist.
fn select_sheet(names: &[String], preferred: &str) -> Result<String, LoadError> {
    match names {
        [] => Err(LoadError::NoSheets),
        [only] => Ok(only.clone()),
        _ => names
            .iter()
            .find(|name| name.as_str() == preferred)
            .cloned()
            .ok_or_else(|| LoadError::MissingSheet {
                expected: preferred.to_string(),
                available: names.to_vec(),
            }),
    }
}

/// Rows from `header_row` to the end of the used range, in absolute sheet
/// coordinates. calamine trims leading empty rows/columns from the range, so
/// cells are fetched by absolute position rather than iterated.
fn grid_from_range(range: &Range<Data>, header_row: u32) -> Result<Vec<Vec<String>>, LoadError> {
    let Some((end_row, end_col)) = range.end() else {
        return Err(LoadError::HeaderRowMissing { row: header_row });
    };
    if header_row > end_row {
        return Err(LoadError::HeaderRowMissing { row: header_row });
    }

    Ok((header_row..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| range.get_value((r, c)).map(cell_to_string).unwrap_or_default())
                .collect()
        })
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// `header_row` counts physical lines, blank ones included. The csv reader
/// drops empty lines and stamps a record's position before skipping them, so
/// the banner lines are cut off the buffer before parsing.
fn load_csv(bytes: &[u8], header_row: u32) -> Result<RawTable, LoadError> {
    let Some(body) = skip_lines(bytes, header_row) else {
        return Err(LoadError::HeaderRowMissing { row: header_row });
    };
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(|s| s.trim().to_string()).collect());
    }
    if grid.is_empty() {
        return Err(LoadError::HeaderRowMissing { row: header_row });
    }
    Ok(RawTable::from_grid(grid))
}

/// The bytes after the first `lines` `\n` terminators, or `None` if there are fewer.
fn skip_lines(bytes: &[u8], lines: u32) -> Option<&[u8]> {
    if lines == 0 {
        return Some(bytes);
    }
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .nth(lines as usize - 1)
        .and_then(|(i, _)| bytes.get(i + 1..))
}
