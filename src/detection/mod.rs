//! Detection module - windowed new-signal diffing

mod scan;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::bus::{EventSource, MessageIdentifier};

/// Scan failure modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    /// Malformed or inverted time bounds; no pass has run.
    #[error("invalid scan range: baseline [{start}s, {end}s], span {span}s")]
    InvalidRange {
        /// Baseline window start in seconds.
        start: f64,
        /// Baseline window end in seconds.
        end: f64,
        /// Detection span in seconds.
        span: f64,
    },

    /// The scan was cancelled; partial accumulators were discarded.
    #[error("scan cancelled")]
    Cancelled,
}

/// Parameters for one scan invocation.
///
/// Times are relative seconds; they are converted to the source's
/// monotonic domain once per scan. The baseline window is inclusive on
/// both ends, the detection window covers `(baseline_end, baseline_end +
/// detection_span]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanParameters {
    /// Baseline window start (seconds, inclusive).
    pub baseline_start_sec: f64,
    /// Baseline window end (seconds, inclusive).
    pub baseline_end_sec: f64,
    /// Duration scanned immediately after the baseline (seconds).
    pub detection_span_sec: f64,
    /// Restrict the scan to these buses; empty means no restriction.
    pub bus_filter: HashSet<u8>,
    /// Restrict the scan to these identifiers; `None` means no restriction.
    pub identifier_filter: Option<HashSet<MessageIdentifier>>,
    /// Minimum distinct payloads per identifier (inclusive).
    pub min_unique_values: usize,
    /// Maximum distinct payloads per identifier (inclusive, 0 = unbounded).
    pub max_unique_values: usize,
}

impl Default for ScanParameters {
    fn default() -> Self {
        Self {
            baseline_start_sec: 0.0,
            baseline_end_sec: 10.0,
            detection_span_sec: 3.0,
            bus_filter: HashSet::new(),
            identifier_filter: None,
            min_unique_values: 0,
            max_unique_values: 0,
        }
    }
}

impl ScanParameters {
    /// Baseline window over `[start, end]` seconds with the default span.
    pub fn window(start_sec: f64, end_sec: f64) -> Self {
        Self {
            baseline_start_sec: start_sec,
            baseline_end_sec: end_sec,
            ..Self::default()
        }
    }
}

/// One qualifying identifier in a scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// The message channel.
    pub identifier: MessageIdentifier,
    /// Occurrences of previously-unseen payloads in the detection window.
    pub new_value_count: usize,
    /// Distinct payloads observed in the detection window.
    pub unique_value_count: usize,
}

/// Ranked result of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Unique id of this scan run.
    pub id: Uuid,
    /// When the scan completed.
    pub created_at: DateTime<Utc>,
    /// Qualifying identifiers, ordered by `new_value_count` descending
    /// (ties keep discovery order).
    pub rows: Vec<ReportRow>,
    /// Filtered events visited across both passes.
    pub events_scanned: usize,
    /// Scan duration in milliseconds.
    pub elapsed_ms: u64,
}

impl Report {
    /// Identifiers of all rows, in report order.
    pub fn identifiers(&self) -> Vec<MessageIdentifier> {
        self.rows.iter().map(|r| r.identifier).collect()
    }
}

/// Cooperative cancellation flag, checked at the top of each pass iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the scan holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// New-signal detection engine.
///
/// Pure with respect to its input: `scan` reads the event source, mutates
/// nothing shared, and is independently reproducible given identical
/// inputs. Independent scans may run in parallel over the same source.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionEngine;

impl DetectionEngine {
    /// Create an engine.
    pub fn new() -> Self {
        Self
    }

    /// Classify which identifiers emitted payload values during the
    /// detection window that were absent from the baseline window.
    ///
    /// A scan over zero matching events yields an empty report.
    pub fn scan<S: EventSource + ?Sized>(
        &self,
        source: &S,
        params: &ScanParameters,
        cancel: &CancelToken,
    ) -> Result<Report, ScanError> {
        scan::run_scan(source, params, cancel)
    }
}
