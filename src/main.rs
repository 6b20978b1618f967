// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! cansleuth - CAN bus new-signal detection
//!
//! Scans a recorded candump trace for message identifiers that emit
//! payload values during a detection window that were never observed in a
//! preceding baseline window. Multiple windows chain: each scan's result
//! is promoted to a saved search that filters the next one.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use cansleuth::bus::parse_bus_list;
use cansleuth::{
    CancelToken, Config, ExportFormat, RecordedTrace, Report, ReportExporter, ScanParameters,
    Session, VERSION,
};

/// cansleuth - CAN bus new-signal detection
#[derive(Parser, Debug)]
#[command(name = "cansleuth")]
#[command(version = VERSION)]
#[command(about = "Find CAN message identifiers emitting payload values absent from a baseline window")]
struct Args {
    /// Recorded trace in candump log format
    trace_file: PathBuf,

    /// Baseline window start in seconds (relative to trace start)
    #[arg(long, default_value = "0")]
    start: f64,

    /// Baseline window end in seconds
    #[arg(long, default_value = "10")]
    end: f64,

    /// Detection span after the baseline, in seconds
    #[arg(long)]
    span: Option<f64>,

    /// Baseline windows as START:END pairs; each scan narrows the next
    /// (overrides --start/--end when given)
    #[arg(short = 'w', long = "window")]
    windows: Vec<String>,

    /// Comma-separated bus ids to restrict to (unparseable tokens ignored)
    #[arg(long)]
    buses: Option<String>,

    /// Minimum distinct payloads per identifier
    #[arg(long)]
    min_unique: Option<usize>,

    /// Maximum distinct payloads per identifier (0 = unbounded)
    #[arg(long)]
    max_unique: Option<usize>,

    /// Saved-search index (insertion order) to use as the identifier
    /// filter for the first scan
    #[arg(long)]
    saved_index: Option<usize>,

    /// Export the final report (json, csv, bin, text); without a value,
    /// the configured default format is used
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "")]
    export: Option<String>,

    /// Export output path (defaults to a timestamped file in the data dir)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("cansleuth v{} - CAN bus new-signal detection", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_create(&config_path)?;

    let windows = resolve_windows(&args)?;

    let trace = RecordedTrace::load_candump(&args.trace_file)
        .with_context(|| format!("failed to load trace {:?}", args.trace_file))?;
    if trace.is_empty() {
        warn!("Trace contains no events");
    }

    let session = Arc::new(Session::new(trace));
    let cancel = CancelToken::new();

    let rt = tokio::runtime::Runtime::new()?;
    let mut final_report = None;

    for (index, &(start, end)) in windows.iter().enumerate() {
        let params = build_params(&args, &config, start, end);
        // Every window after the first narrows to the previous result;
        // the first takes an explicit saved-search index if given.
        let saved_index = match index {
            0 => args.saved_index,
            _ => Some(index - 1),
        };

        info!(
            "Scan {}: baseline [{}s, {}s], span {}s",
            index + 1,
            start,
            end,
            params.detection_span_sec
        );

        let report = run_scan(&rt, &session, params, saved_index, &cancel)?;
        print_report(&report);

        session.promote(format!("Search {}", index + 1), report.identifiers())?;
        final_report = Some(report);
    }

    if let Some(report) = final_report {
        if let Some(format) = &args.export {
            let format = resolve_export_format(format, &config)?;
            export_report(&report, format, args.output, &config)?;
        }
    }

    Ok(())
}

/// Baseline windows from the command line, in scan order.
fn resolve_windows(args: &Args) -> Result<Vec<(f64, f64)>> {
    if args.windows.is_empty() {
        return Ok(vec![(args.start, args.end)]);
    }
    args.windows
        .iter()
        .map(|spec| {
            let (start, end) = spec
                .split_once(':')
                .with_context(|| format!("window {:?} is not START:END", spec))?;
            let start: f64 = start.parse().with_context(|| format!("bad window start {:?}", start))?;
            let end: f64 = end.parse().with_context(|| format!("bad window end {:?}", end))?;
            if start < 0.0 || end < start {
                bail!("window {:?} is inverted or negative", spec);
            }
            Ok((start, end))
        })
        .collect()
}

/// CLI format when given, otherwise the configured default.
fn resolve_export_format(cli: &str, config: &Config) -> Result<ExportFormat> {
    if cli.is_empty() {
        config.export.default_format()
    } else {
        cli.parse().map_err(anyhow::Error::msg)
    }
}

fn build_params(args: &Args, config: &Config, start: f64, end: f64) -> ScanParameters {
    let mut params = config.scan.parameters(start, end);
    if let Some(span) = args.span {
        params.detection_span_sec = span;
    }
    if let Some(min) = args.min_unique {
        params.min_unique_values = min;
    }
    if let Some(max) = args.max_unique {
        params.max_unique_values = max;
    }
    if let Some(buses) = &args.buses {
        params.bus_filter = parse_bus_list(buses);
    }
    params
}

/// Run one scan off the main thread; Ctrl+C cancels it cleanly.
fn run_scan(
    rt: &tokio::runtime::Runtime,
    session: &Arc<Session>,
    params: ScanParameters,
    saved_index: Option<usize>,
    cancel: &CancelToken,
) -> Result<Report> {
    rt.block_on(async {
        let mut handle = session.spawn_scan(params, saved_index, cancel.clone());
        tokio::select! {
            result = &mut handle => result?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received, cancelling scan");
                cancel.cancel();
                handle.await?
            }
        }
    })
}

fn print_report(report: &Report) {
    println!();
    println!(
        "{:<5} {:<12} {:>12} {:>14}",
        "Bus", "Message ID", "New Values", "Unique Values"
    );
    for row in &report.rows {
        println!(
            "{:<5} {:<12} {:>12} {:>14}",
            row.identifier.bus,
            format!("{:#x}", row.identifier.address),
            row.new_value_count,
            row.unique_value_count
        );
    }
    println!();
    info!(
        "{} identifiers with new values ({} events scanned in {}ms)",
        report.rows.len(),
        report.events_scanned,
        report.elapsed_ms
    );
}

fn export_report(
    report: &Report,
    format: ExportFormat,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<()> {
    let exporter = ReportExporter::new(format);
    let path = match output {
        Some(path) => path,
        None => {
            std::fs::create_dir_all(&config.export.dir)?;
            exporter.suggested_path(&config.export.dir)
        }
    };
    let file = File::create(&path).with_context(|| format!("cannot create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    exporter.export(report, &mut writer)?;
    info!("Exported report to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_falls_back_to_config() {
        let config = Config::default();
        assert_eq!(resolve_export_format("", &config).unwrap(), ExportFormat::Csv);
        assert_eq!(
            resolve_export_format("json", &config).unwrap(),
            ExportFormat::Json
        );
        assert!(resolve_export_format("xml", &config).is_err());
    }

    #[test]
    fn test_cli_windows_and_saved_index() {
        let args = Args::try_parse_from([
            "cansleuth",
            "trace.log",
            "-w",
            "0:10",
            "-w",
            "20:30",
            "--saved-index",
            "0",
            "--export",
        ])
        .unwrap();
        assert_eq!(args.saved_index, Some(0));
        assert_eq!(args.export.as_deref(), Some(""));
        assert_eq!(resolve_windows(&args).unwrap(), vec![(0.0, 10.0), (20.0, 30.0)]);

        let inverted = Args::try_parse_from(["cansleuth", "trace.log", "-w", "10:5"]).unwrap();
        assert!(resolve_windows(&inverted).is_err());
    }
}
