//! Report export - JSON, CSV, binary, and clipboard-style identifier lists

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use chrono::Utc;

use crate::detection::{Report, ReportRow};

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON of the whole report.
    Json,
    /// One CSV line per row.
    Csv,
    /// Bincode blob of the whole report.
    Binary,
    /// Plain identifier list, one per line.
    Text,
}

impl ExportFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Binary => "bin",
            ExportFormat::Text => "txt",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "bin" | "binary" => Ok(ExportFormat::Binary),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(format!("unknown export format {other:?}")),
        }
    }
}

/// Serializes scan reports for external consumption.
pub struct ReportExporter {
    format: ExportFormat,
}

impl ReportExporter {
    /// An exporter for the given format.
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Write a report to `writer` in the configured format.
    pub fn export<W: Write>(&self, report: &Report, writer: &mut W) -> Result<()> {
        match self.format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, report)?;
                writeln!(writer)?;
            }
            ExportFormat::Csv => {
                writeln!(writer, "bus,address,new_values,unique_values")?;
                for row in &report.rows {
                    writeln!(
                        writer,
                        "{},{:#x},{},{}",
                        row.identifier.bus,
                        row.identifier.address,
                        row.new_value_count,
                        row.unique_value_count
                    )?;
                }
            }
            ExportFormat::Binary => {
                let bytes = bincode::serialize(report)?;
                writer.write_all(&bytes)?;
            }
            ExportFormat::Text => {
                writer.write_all(identifier_list(&report.rows).as_bytes())?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Suggested output path under `dir`, timestamped like
    /// `report_20260823_101500.csv`.
    pub fn suggested_path(&self, dir: &Path) -> PathBuf {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        dir.join(format!("report_{}.{}", timestamp, self.format.extension()))
    }
}

/// Textual identifier list for a row selection, one `address:bus` pair per
/// line, suitable for clipboard-style consumption.
pub fn identifier_list(rows: &[ReportRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(out, "{}", row.identifier);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessageIdentifier;
    use chrono::Utc;
    use uuid::Uuid;

    fn report() -> Report {
        Report {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            rows: vec![
                ReportRow {
                    identifier: MessageIdentifier { address: 0x244, bus: 0 },
                    new_value_count: 4,
                    unique_value_count: 5,
                },
                ReportRow {
                    identifier: MessageIdentifier { address: 0x3e9, bus: 1 },
                    new_value_count: 1,
                    unique_value_count: 1,
                },
            ],
            events_scanned: 42,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_csv_export() {
        let mut buf = Vec::new();
        ReportExporter::new(ExportFormat::Csv)
            .export(&report(), &mut buf)
            .unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("bus,address,new_values,unique_values\n"));
        assert!(text.contains("0,0x244,4,5\n"));
        assert!(text.contains("1,0x3e9,1,1\n"));
    }

    #[test]
    fn test_json_round_trip() {
        let report = report();
        let mut buf = Vec::new();
        ReportExporter::new(ExportFormat::Json)
            .export(&report, &mut buf)
            .unwrap();
        let parsed: Report = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed.rows, report.rows);
        assert_eq!(parsed.id, report.id);
    }

    #[test]
    fn test_identifier_list() {
        let list = identifier_list(&report().rows);
        assert_eq!(list, "0x244:0\n0x3e9:1\n");
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
