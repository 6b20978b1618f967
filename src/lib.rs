// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! cansleuth - CAN bus new-signal detection
//!
//! Finds message identifiers that start emitting payload values never seen
//! during a baseline window of a recorded trace. Built for diagnostic work
//! on vehicle buses: record, pick a quiet baseline, trigger the behavior
//! under study, and diff.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    cansleuth Engine                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌───────────┐   ┌────────┐   ┌─────────┐  │
//! │  │ Trace   │ → │ Detection │ → │ Report │ → │ Export  │  │
//! │  │ Loader  │   │ Engine    │   │        │   │         │  │
//! │  └─────────┘   └───────────┘   └────────┘   └─────────┘  │
//! │                      ↑              ↓                    │
//! │                ┌──────────────────────────┐              │
//! │                │     SavedSearchStore     │              │
//! │                │  (filter chaining state) │              │
//! │                └──────────────────────────┘              │
//! └──────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod bus;
pub mod config;
pub mod core;
pub mod detection;
pub mod export;
pub mod search;
pub mod trace;

// Re-exports for convenience
pub use bus::{Event, EventSource, MessageIdentifier, MessageValue};
pub use config::Config;
pub use core::Session;
pub use detection::{CancelToken, DetectionEngine, Report, ReportRow, ScanError, ScanParameters};
pub use export::{ExportFormat, ReportExporter};
pub use search::{SavedSearch, SavedSearchStore, StoreError};
pub use trace::RecordedTrace;

/// cansleuth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// cansleuth name
pub const NAME: &str = "cansleuth";
