// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! Recorded trace storage and candump log ingestion

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::bus::{Event, EventSource};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Trace loading errors.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Underlying I/O failure.
    #[error("trace i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line that does not follow the candump format.
    #[error("malformed candump line {line}: {reason}")]
    Parse {
        /// 1-based line number within the log file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },
}

/// An in-memory, time-ordered recording of bus events.
///
/// Owns its events for the lifetime of the session; scans borrow them
/// read-only. The relative-seconds origin is the capture start, so
/// `to_mono_time(0.0)` maps to the first recorded event.
#[derive(Debug, Clone, Default)]
pub struct RecordedTrace {
    events: Vec<Event>,
    start_mono: u64,
}

impl RecordedTrace {
    /// Build a trace anchored at its first event.
    ///
    /// Events are sorted by `mono_time` (stable) in case the producer
    /// interleaved buses out of order.
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.mono_time);
        let start_mono = events.first().map(|e| e.mono_time).unwrap_or(0);
        Self { events, start_mono }
    }

    /// Build a trace with an explicit capture start time.
    pub fn with_start(mut events: Vec<Event>, start_mono: u64) -> Self {
        events.sort_by_key(|e| e.mono_time);
        Self { events, start_mono }
    }

    /// Load a trace from a candump-format log file.
    pub fn load_candump(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path)?;
        let trace = parse_candump(BufReader::new(file))?;
        info!(
            "Loaded {} events ({:.1}s) from {:?}",
            trace.len(),
            trace.duration_sec(),
            path
        );
        Ok(trace)
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the trace contains no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Recording length in seconds.
    pub fn duration_sec(&self) -> f64 {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => (last.mono_time - first.mono_time) as f64 / NANOS_PER_SEC,
            _ => 0.0,
        }
    }
}

impl EventSource for RecordedTrace {
    fn events(&self) -> &[Event] {
        &self.events
    }

    fn to_mono_time(&self, seconds: f64) -> u64 {
        self.start_mono
            .saturating_add((seconds * NANOS_PER_SEC).round() as u64)
    }
}

/// Parse candump log lines: `(1436509052.249713) can0 244#DEADBEEF`.
///
/// CAN FD lines (`id##<flags><data>`) are accepted with the flags nibble
/// dropped; remote frames (`id#R`) carry no payload and are skipped.
pub fn parse_candump<R: BufRead>(reader: R) -> Result<RecordedTrace, TraceError> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (ts, iface, frame) = match (fields.next(), fields.next(), fields.next()) {
            (Some(ts), Some(iface), Some(frame)) => (ts, iface, frame),
            _ => {
                return Err(TraceError::Parse {
                    line: line_no,
                    reason: "expected `(timestamp) iface id#data`".to_string(),
                })
            }
        };

        let ts: f64 = ts
            .trim_start_matches('(')
            .trim_end_matches(')')
            .parse()
            .map_err(|_| TraceError::Parse {
                line: line_no,
                reason: format!("bad timestamp {:?}", ts),
            })?;

        let bus = parse_bus(iface).ok_or_else(|| TraceError::Parse {
            line: line_no,
            reason: format!("no bus number in interface {:?}", iface),
        })?;

        let (id, data) = frame.split_once('#').ok_or_else(|| TraceError::Parse {
            line: line_no,
            reason: "missing `#` separator".to_string(),
        })?;

        let address = u32::from_str_radix(id, 16).map_err(|_| TraceError::Parse {
            line: line_no,
            reason: format!("bad message id {:?}", id),
        })?;

        // Remote frames have no payload to diff.
        if data.starts_with('R') {
            skipped += 1;
            continue;
        }

        // CAN FD: `##` plus a flags nibble before the data bytes.
        let data = match data.strip_prefix('#') {
            Some("") => "",
            // Slicing past the nibble is safe only once it is ASCII hex.
            Some(fd) if fd.as_bytes()[0].is_ascii_hexdigit() => &fd[1..],
            Some(_) => {
                return Err(TraceError::Parse {
                    line: line_no,
                    reason: format!("bad FD flags in {:?}", data),
                })
            }
            None => data,
        };

        let payload = parse_hex(data).ok_or_else(|| TraceError::Parse {
            line: line_no,
            reason: format!("bad payload hex {:?}", data),
        })?;

        events.push(Event {
            bus,
            address,
            mono_time: (ts * NANOS_PER_SEC).round() as u64,
            payload,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} remote frames", skipped);
    }

    Ok(RecordedTrace::new(events))
}

/// Bus number from an interface name: `can0` -> 0, `vcan12` -> 12.
fn parse_bus(iface: &str) -> Option<u8> {
    let digits = iface.trim_start_matches(|c: char| !c.is_ascii_digit());
    digits.parse().ok()
}

/// Byte-wise hex decode; rejects odd lengths and anything outside ASCII
/// hex, so multi-byte characters fail cleanly instead of slicing mid-char.
fn parse_hex(data: &str) -> Option<Vec<u8>> {
    let bytes = data.as_bytes();
    if bytes.len() % 2 != 0 {
        return None;
    }
    bytes
        .chunks_exact(2)
        .map(|pair| Some((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
        .collect()
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_candump() {
        let log = "\
(1640000000.000000) can0 244#DEADBEEF
(1640000000.010000) can1 3E9#0102
(1640000000.020000) can0 244#DEADBEEF
";
        let trace = parse_candump(Cursor::new(log)).unwrap();
        assert_eq!(trace.len(), 3);

        let events = trace.events();
        assert_eq!(events[0].address, 0x244);
        assert_eq!(events[0].bus, 0);
        assert_eq!(events[0].payload, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(events[1].address, 0x3e9);
        assert_eq!(events[1].bus, 1);
        assert_eq!(events[1].payload, vec![0x01, 0x02]);
    }

    #[test]
    fn test_parse_candump_fd_and_remote() {
        let log = "\
(100.0) can0 123#R
(100.1) can0 123##1AABB
(100.2) can0 124#
";
        let trace = parse_candump(Cursor::new(log)).unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.events()[0].payload, vec![0xaa, 0xbb]);
        assert!(trace.events()[1].payload.is_empty());
    }

    #[test]
    fn test_parse_candump_malformed() {
        let err = parse_candump(Cursor::new("(1.0) can0 zzz#00")).unwrap_err();
        match err {
            TraceError::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other}"),
        }

        assert!(parse_candump(Cursor::new("(1.0) can0 123#0")).is_err());
        assert!(parse_candump(Cursor::new("garbage")).is_err());
    }

    #[test]
    fn test_parse_candump_non_ascii() {
        // Multi-byte characters in the payload must surface as a parse
        // error, never a panic.
        let err = parse_candump(Cursor::new("(1.0) can0 123#Aé0")).unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 1, .. }));

        // Same for a non-ASCII FD flags nibble.
        let err = parse_candump(Cursor::new("(1.0) can0 123##éAA")).unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_mono_time_anchored_at_first_event() {
        let log = "(50.000000) can0 100#00\n(53.500000) can0 100#01\n";
        let trace = parse_candump(Cursor::new(log)).unwrap();
        assert_eq!(trace.to_mono_time(0.0), 50_000_000_000);
        assert_eq!(trace.to_mono_time(3.5), trace.events()[1].mono_time);
    }

    #[test]
    fn test_out_of_order_events_are_sorted() {
        let mk = |t: u64| Event {
            bus: 0,
            address: 0x100,
            mono_time: t,
            payload: vec![],
        };
        let trace = RecordedTrace::new(vec![mk(30), mk(10), mk(20)]);
        let times: Vec<u64> = trace.events().iter().map(|e| e.mono_time).collect();
        assert_eq!(times, vec![10, 20, 30]);
        assert_eq!(trace.to_mono_time(0.0), 10);
    }
}
