//! Two-pass windowed diff: accumulate baseline values, then rank
//! identifiers producing values absent from that baseline.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::bus::{Event, EventSource, MessageIdentifier, MessageValue};

use super::{CancelToken, Report, ReportRow, ScanError, ScanParameters};

pub(super) fn run_scan<S: EventSource + ?Sized>(
    source: &S,
    params: &ScanParameters,
    cancel: &CancelToken,
) -> Result<Report, ScanError> {
    if params.baseline_end_sec < params.baseline_start_sec || params.detection_span_sec < 0.0 {
        return Err(ScanError::InvalidRange {
            start: params.baseline_start_sec,
            end: params.baseline_end_sec,
            span: params.detection_span_sec,
        });
    }

    let started = Instant::now();

    // One conversion per bound, per scan.
    let start_mono = source.to_mono_time(params.baseline_start_sec);
    let end_mono = source.to_mono_time(params.baseline_end_sec);
    let detect_end_mono =
        source.to_mono_time(params.baseline_end_sec + params.detection_span_sec);

    let events = source.events();
    let mut events_scanned = 0usize;

    // First pass: every value observed inside the baseline window.
    let mut seen: HashSet<MessageValue> = HashSet::new();
    for event in events {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        if !passes_filters(event, params) {
            continue;
        }
        if event.mono_time >= start_mono && event.mono_time <= end_mono {
            events_scanned += 1;
            seen.insert(event.value());
        }
    }

    // Second pass: values after the baseline that were never seen before.
    // `new_counts` tracks occurrences of first-time values per identifier;
    // `distinct` tracks every payload regardless of baseline membership.
    let mut new_counts: HashMap<MessageIdentifier, usize> = HashMap::new();
    let mut distinct: HashMap<MessageIdentifier, HashSet<Vec<u8>>> = HashMap::new();
    let mut discovery_order: Vec<MessageIdentifier> = Vec::new();

    for event in events {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        if !passes_filters(event, params) {
            continue;
        }
        if event.mono_time > end_mono && event.mono_time <= detect_end_mono {
            events_scanned += 1;
            let id = event.identifier();

            let values = distinct.entry(id).or_default();
            if !values.contains(&event.payload) {
                values.insert(event.payload.clone());
            }

            let value = event.value();
            if !seen.contains(&value) {
                let count = new_counts.entry(id).or_insert(0);
                if *count == 0 {
                    discovery_order.push(id);
                }
                *count += 1;
                // Re-occurrences of this value are no longer "new".
                seen.insert(value);
            }
        }
    }

    // Identifiers with zero new values never become candidates; the
    // unique-value thresholds then restrict by distinct-value cardinality.
    let mut rows: Vec<ReportRow> = discovery_order
        .iter()
        .map(|id| ReportRow {
            identifier: *id,
            new_value_count: new_counts[id],
            unique_value_count: distinct[id].len(),
        })
        .filter(|row| passes_thresholds(row.unique_value_count, params))
        .collect();

    // Stable sort keeps discovery order among equal counts.
    rows.sort_by(|a, b| b.new_value_count.cmp(&a.new_value_count));

    let elapsed = started.elapsed();
    debug!(
        "Scan visited {} events, {} identifiers qualified in {:?}",
        events_scanned,
        rows.len(),
        elapsed
    );

    Ok(Report {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        rows,
        events_scanned,
        elapsed_ms: elapsed.as_millis() as u64,
    })
}

/// An event excluded here is invisible to both passes.
fn passes_filters(event: &Event, params: &ScanParameters) -> bool {
    if !params.bus_filter.is_empty() && !params.bus_filter.contains(&event.bus) {
        return false;
    }
    if let Some(ids) = &params.identifier_filter {
        if !ids.contains(&event.identifier()) {
            return false;
        }
    }
    true
}

fn passes_thresholds(unique_values: usize, params: &ScanParameters) -> bool {
    if unique_values < params.min_unique_values {
        return false;
    }
    // max of zero means unbounded
    params.max_unique_values == 0 || unique_values <= params.max_unique_values
}
