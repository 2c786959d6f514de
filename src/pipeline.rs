// src/pipeline.rs

use rust_xlsxwriter::XlsxError;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::fetch::{DecodeService, FetchError};
use crate::load::{columns::normalize_vin_column, load_table, LoadError};
use crate::resolve::{collect_vins, resolve_all};
use crate::table::ResultTable;
use crate::write::{output_file_name, write_workbook};

/// Why a run produced no spreadsheet.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Request Timed out (VIN {vin})")]
    TimedOut { vin: String },

    #[error("decoder request for VIN {vin} failed: {source}")]
    Transport {
        vin: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("writing output workbook: {0}")]
    Write(#[from] XlsxError),
}

impl PipelineError {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, PipelineError::TimedOut { .. })
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { vin } => PipelineError::TimedOut { vin },
            FetchError::Transport { vin, source } => PipelineError::Transport { vin, source },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub vins_read: usize,
    pub rows_written: usize,
    pub error_rows: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub summary: RunSummary,
}

/// Turn one uploaded spreadsheet into the decoded `.xlsx`.
#[tracing::instrument(level = "info", skip(bytes, config, service), fields(size = bytes.len()))]
pub fn process_file<D: DecodeService + ?Sized>(
    bytes: &[u8],
    file_name: &str,
    config: &Config,
    service: &D,
) -> Result<ProcessedFile, PipelineError> {
    let mut raw = load_table(bytes, file_name, &config.input.load_options())?;
    if normalize_vin_column(&mut raw, &config.input.vin_matcher()).is_none() {
        warn!(file_name, "input has no VIN column");
    }

    let vins = collect_vins(&raw);
    info!(vins = vins.len(), "collected VINs");

    let records = resolve_all(service, &vins)?;
    let table = ResultTable::build(records);
    let bytes = write_workbook(&table, &config.output.writer_options())?;

    let summary = RunSummary {
        vins_read: vins.len(),
        rows_written: table.len(),
        error_rows: table.error_rows(),
        duplicates_dropped: table.duplicates_dropped(),
    };
    let file_name = output_file_name(file_name, &config.output.file_suffix);
    info!(output = %file_name, ?summary, "wrote output workbook");

    Ok(ProcessedFile {
        bytes,
        file_name,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Reader};
    use rust_xlsxwriter::Workbook;
    use std::{cell::Cell, collections::HashMap, io::Cursor};
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,vindata=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn decode_body(year: &str, make: &str, model: &str) -> String {
        format!(
            r#"{{"Count":3,"Results":[{{"Variable":"Model Year","Value":"{year}"}},{{"Variable":"Make","Value":"{make}"}},{{"Variable":"Model","Value":"{model}"}},{{"Variable":"Error Text","Value":"0 - VIN decoded clean. Check Digit (9th position) is correct"}}]}}"#
        )
    }

    /// Fake decoder: known VINs get a body, everything else an empty reply.
    struct FakeDecoder {
        known: HashMap<&'static str, String>,
        timeout_on: Option<&'static str>,
        calls: Cell<usize>,
    }

    impl FakeDecoder {
        fn new() -> Self {
            let mut known = HashMap::new();
            known.insert("1HGCM82633A004352", decode_body("2003", "HONDA", "Accord"));
            known.insert("1FTFW1ET5DFC10312", decode_body("2013", "FORD", "F-150"));
            Self {
                known,
                timeout_on: None,
                calls: Cell::new(0),
            }
        }
    }

    impl DecodeService for FakeDecoder {
        fn fetch(&self, vin: &str) -> Result<String, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if self.timeout_on == Some(vin) {
                return Err(FetchError::Timeout {
                    vin: vin.to_string(),
                });
            }
            Ok(self.known.get(vin).cloned().unwrap_or_default())
        }
    }

    fn template_xlsx(vins: &[&str]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.write_string(0, 0, "Fleet Deployment Template").expect("title");
        sheet.write_string(3, 0, "Unit").expect("header");
        sheet.write_string(3, 1, "Driver").expect("header");
        sheet.write_string(3, 2, "Vin Number").expect("header");
        for (i, vin) in vins.iter().enumerate() {
            let row = 4 + i as u32;
            sheet.write_string(row, 0, format!("U{}", i + 1)).expect("unit");
            sheet.write_string(row, 2, *vin).expect("vin");
        }
        wb.save_to_buffer().expect("save fixture")
    }

    fn read_output(bytes: Vec<u8>) -> Vec<Vec<String>> {
        let mut wb = open_workbook_auto_from_rs(Cursor::new(bytes)).expect("open output");
        let range = wb.worksheet_range("Vehicle Data").expect("output sheet");
        range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn end_to_end_dedups_and_marks_bad_vins() {
        init_test_logging();
        let input = template_xlsx(&[
            "1HGCM82633A004352 ",
            "NOTAVIN",
            "",
            "1HGCM 82633A004352",
            "1FTFW1ET5DFC10312",
        ]);
        let decoder = FakeDecoder::new();

        let out = process_file(&input, "fleet.xlsx", &Config::default(), &decoder)
            .expect("pipeline succeeds");

        assert_eq!(out.file_name, "fleet_VIN_data.xlsx");
        assert_eq!(
            out.summary,
            RunSummary {
                vins_read: 4,
                rows_written: 3,
                error_rows: 1,
                duplicates_dropped: 1,
            }
        );
        // duplicates are still queried individually
        assert_eq!(decoder.calls.get(), 4);

        let rows = read_output(out.bytes);
        assert_eq!(rows[0], ResultTable::header().to_vec());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1][0], "1HGCM82633A004352");
        assert_eq!(rows[1][4], "HONDA");
        assert_eq!(rows[1][6], "N/A");
        assert_eq!(rows[2][0], "NOTAVIN");
        assert!(rows[2][1..19].iter().all(|v| v == "Error"));
        assert_eq!(rows[2][19], "Error: Incorrect VIN, no data exists");
        assert_eq!(rows[3][0], "1FTFW1ET5DFC10312");
        assert_eq!(rows[3][5], "F-150");
    }

    #[test]
    fn timeout_yields_no_output() {
        init_test_logging();
        let input = template_xlsx(&["1HGCM82633A004352", "1FTFW1ET5DFC10312", "JH4DA9350LS000000"]);
        let mut decoder = FakeDecoder::new();
        decoder.timeout_on = Some("1FTFW1ET5DFC10312");

        let err = process_file(&input, "fleet.xlsx", &Config::default(), &decoder).unwrap_err();
        assert!(err.is_timed_out());
        assert!(err.to_string().starts_with("Request Timed out"));
        assert_eq!(decoder.calls.get(), 2);
    }

    #[test]
    fn missing_vin_column_gives_empty_sheet() {
        init_test_logging();
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.write_string(3, 0, "Unit").expect("header");
        sheet.write_string(3, 1, "Plate").expect("header");
        sheet.write_string(4, 0, "U1").expect("cell");
        sheet.write_string(4, 1, "ABC123").expect("cell");
        let input = wb.save_to_buffer().expect("save");

        let decoder = FakeDecoder::new();
        let out = process_file(&input, "plates.xlsx", &Config::default(), &decoder)
            .expect("pipeline succeeds");
        assert_eq!(out.summary.rows_written, 0);
        assert_eq!(decoder.calls.get(), 0);
        assert_eq!(read_output(out.bytes).len(), 1);
    }

    #[test]
    fn unreadable_input_is_a_load_error() {
        let err = process_file(b"\x00\x01garbage", "fleet.xls", &Config::default(), &FakeDecoder::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));
        assert!(!err.is_timed_out());
    }

    #[test]
    fn csv_input_and_same_input_twice_give_same_rows() {
        let csv = "Fleet\nCustomer,Example\nRegion,Notes\nUnit,VIN\nU1,1HGCM82633A004352\nU2,1FTFW1ET5DFC10312\nU3,1HGCM82633A004352\n";
        let decoder = FakeDecoder::new();

        let first = process_file(csv.as_bytes(), "fleet.csv", &Config::default(), &decoder)
            .expect("first run");
        let second = process_file(csv.as_bytes(), "fleet.csv", &Config::default(), &decoder)
            .expect("second run");
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.summary.rows_written, 2);
        assert_eq!(read_output(first.bytes), read_output(second.bytes));
    }
}
