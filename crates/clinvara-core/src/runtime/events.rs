// crates/clinvara-core/src/runtime/events.rs
// ============================================================================
// Module: Clinvara Event Sinks
// Description: Event sinks writing structured engine events as JSON lines.
// Purpose: Emit redacted operational events without a logging framework.
// Dependencies: serde_json, crate::interfaces
// ============================================================================

//! ## Overview
//! Events are serialized one JSON object per line. Sinks swallow their own
//! I/O failures so that observability can never fail a screening operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::EventRecord;
use crate::interfaces::EventSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Sink that discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &EventRecord) {}
}

/// Sink that writes JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &EventRecord) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileEventSink {
    /// Opens the event log in append mode, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &EventRecord) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Sink that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    /// Recorded events as JSON values.
    events: Mutex<Vec<serde_json::Value>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &EventRecord) {
        if let Ok(value) = serde_json::to_value(event)
            && let Ok(mut guard) = self.events.lock()
        {
            guard.push(value);
        }
    }
}
