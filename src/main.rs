use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vindata::{config::Config, fetch::HttpDecodeService, pipeline};

/// Decode every VIN in a fleet spreadsheet and write the vehicle details to a new workbook.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Spreadsheet with a VIN column (.xls, .xlsx or .csv)
    input: PathBuf,

    /// Where the `<input>_VIN_data.xlsx` file is written
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Exact header of the VIN column
    #[arg(long)]
    vin_column: Option<String>,

    /// Accept invalid TLS certificates from the decoder
    #[arg(long)]
    insecure: bool,
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let args = Args::parse();

    // ─── 2) settings: file first, flags on top ───────────────────────
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.base_url {
        config.decoder.base_url = url;
    }
    if let Some(secs) = args.timeout_secs {
        config.decoder.timeout_secs = secs;
    }
    if args.vin_column.is_some() {
        config.input.vin_column = args.vin_column;
    }
    if args.insecure {
        config.decoder.accept_invalid_certs = true;
    }

    // ─── 3) read input ───────────────────────────────────────────────
    let bytes = fs::read(&args.input)
        .with_context(|| format!("reading input {}", args.input.display()))?;
    let file_name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    info!(input = %args.input.display(), size = bytes.len(), "startup");

    // ─── 4) run ──────────────────────────────────────────────────────
    let service = HttpDecodeService::new(&config.decoder)?;
    let processed = match pipeline::process_file(&bytes, &file_name, &config, &service) {
        Ok(p) => p,
        Err(e) if e.is_timed_out() => {
            error!(error = %e, "decoder timed out; no output written");
            eprintln!("Request Timed out");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e).context("processing input"),
    };

    // ─── 5) write output ─────────────────────────────────────────────
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let out_path = args.output_dir.join(&processed.file_name);
    fs::write(&out_path, &processed.bytes)
        .with_context(|| format!("writing {}", out_path.display()))?;

    info!(
        output = %out_path.display(),
        vins = processed.summary.vins_read,
        rows = processed.summary.rows_written,
        errors = processed.summary.error_rows,
        duplicates = processed.summary.duplicates_dropped,
        "all done"
    );
    println!("{}", out_path.display());
    Ok(ExitCode::SUCCESS)
}
