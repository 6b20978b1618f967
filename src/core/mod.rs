// Copyright (c) 2026 cansleuth contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/cansleuth/cansleuth

//! Core session - ties a recorded trace, the detection engine, and the
//! saved-search store together for a host application

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::bus::MessageIdentifier;
use crate::detection::{CancelToken, DetectionEngine, Report, ScanError, ScanParameters};
use crate::search::SavedSearchStore;
use crate::trace::RecordedTrace;

/// One analysis session over a recorded trace.
///
/// The trace is read-only for the session's lifetime; scans borrow it and
/// mutate nothing shared, so independent scans may run concurrently.
/// Saved-search mutation is serialized through an internal lock.
pub struct Session {
    trace: Arc<RecordedTrace>,
    engine: DetectionEngine,
    store: Mutex<SavedSearchStore>,
}

impl Session {
    /// Start a session over a recorded trace.
    pub fn new(trace: RecordedTrace) -> Self {
        info!("Session opened over {} events", trace.len());
        Self {
            trace: Arc::new(trace),
            engine: DetectionEngine::new(),
            store: Mutex::new(SavedSearchStore::new()),
        }
    }

    /// The trace this session analyzes.
    pub fn trace(&self) -> &RecordedTrace {
        &self.trace
    }

    /// Run a scan synchronously on the calling thread.
    pub fn scan(&self, params: &ScanParameters, cancel: &CancelToken) -> Result<Report, ScanError> {
        self.engine.scan(self.trace.as_ref(), params, cancel)
    }

    /// Run a scan, optionally narrowing to a previously saved search.
    ///
    /// `saved_index` selects a [`crate::search::SavedSearch`] by insertion
    /// order; its identifiers become the scan's identifier filter.
    pub fn scan_filtered(
        &self,
        mut params: ScanParameters,
        saved_index: Option<usize>,
        cancel: &CancelToken,
    ) -> Result<Report> {
        if let Some(index) = saved_index {
            let identifiers = {
                let store = self.store.lock();
                store.get(index)?.identifiers.clone()
            };
            info!("Restricting scan to {} saved identifiers", identifiers.len());
            params.identifier_filter = Some(identifiers);
        }
        Ok(self.engine.scan(self.trace.as_ref(), &params, cancel)?)
    }

    /// Run a scan on a blocking worker thread.
    ///
    /// The finished report comes back through the join handle in a single
    /// handoff; no partial results are published. Cancel via the token to
    /// make the task fail with [`ScanError::Cancelled`].
    pub fn spawn_scan(
        self: &Arc<Self>,
        params: ScanParameters,
        saved_index: Option<usize>,
        cancel: CancelToken,
    ) -> JoinHandle<Result<Report>> {
        let session = Arc::clone(self);
        tokio::task::spawn_blocking(move || session.scan_filtered(params, saved_index, &cancel))
    }

    /// Promote a set of identifiers (a row selection or a whole report)
    /// into a named saved search.
    pub fn promote(
        &self,
        name: impl Into<String>,
        identifiers: impl IntoIterator<Item = MessageIdentifier>,
    ) -> Result<()> {
        let mut store = self.store.lock();
        store.save(name, identifiers.into_iter().collect())?;
        Ok(())
    }

    /// Saved-search names in insertion order.
    pub fn saved_names(&self) -> Vec<String> {
        self.store.lock().names().iter().map(|s| s.to_string()).collect()
    }

    /// Number of saved searches.
    pub fn saved_count(&self) -> usize {
        self.store.lock().len()
    }

    /// Drop every saved search.
    pub fn clear_saved(&self) {
        self.store.lock().clear();
    }
}
