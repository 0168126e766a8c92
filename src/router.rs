//! Dispatch of raw units to the matching decoder and into the store.
//!
//! Decode failures are counted and logged, never propagated: one bad sentence
//! must not stall the link it arrived on.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

use crate::TelemetryError;
use crate::frame::FrameDecoder;
use crate::sentence::SentenceDecoder;
use crate::store::MetricStore;
use crate::transport::FrameSink;
use crate::types::{Decoded, ProtocolKind, RawFrame};

#[derive(Debug, Default)]
struct RouterCounters {
    units: AtomicU64,
    records: AtomicU64,
    fields_written: AtomicU64,
    unrecognized: AtomicU64,
    checksum_failures: AtomicU64,
    format_errors: AtomicU64,
}

/// Router counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct RouterStats {
    pub units: u64,
    pub records: u64,
    pub fields_written: u64,
    pub unrecognized: u64,
    pub checksum_failures: u64,
    pub format_errors: u64,
}

/// What happened to a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Decoded; `fields` values were accepted by the store
    Stored { fields: usize },
    Unrecognized(String),
    Rejected,
}

/// Routes every unit to exactly one decoder, then writes its valid fields.
#[derive(Debug)]
pub struct Router {
    sentences: SentenceDecoder,
    frames: FrameDecoder,
    store: Arc<MetricStore>,
    counters: RouterCounters,
}

impl Router {
    pub fn new(sentences: SentenceDecoder, store: Arc<MetricStore>) -> Self {
        Self { sentences, frames: FrameDecoder, store, counters: RouterCounters::default() }
    }

    pub fn store(&self) -> &Arc<MetricStore> {
        &self.store
    }

    /// Decode `frame` and write its fields stamped with the unit's arrival time.
    pub fn route(&self, frame: &RawFrame) -> RouteOutcome {
        self.counters.units.fetch_add(1, Ordering::Relaxed);

        let decoded = match frame.protocol {
            ProtocolKind::Sentence => self.sentences.decode(frame.as_bytes()),
            ProtocolKind::Frame => self.frames.decode(frame.as_bytes()),
        };

        let record = match decoded {
            Ok(Decoded::Record(record)) => record,
            Ok(Decoded::Unrecognized { identifier }) => {
                trace!(%identifier, "Unrecognized unit");
                self.counters.unrecognized.fetch_add(1, Ordering::Relaxed);
                return RouteOutcome::Unrecognized(identifier);
            }
            Err(error) => {
                self.reject(frame, &error);
                return RouteOutcome::Rejected;
            }
        };

        self.counters.records.fetch_add(1, Ordering::Relaxed);
        let mut fields = 0;
        for (key, value) in record.metrics() {
            if self.store.write(key, value, frame.received_at) {
                fields += 1;
            }
        }
        self.counters.fields_written.fetch_add(fields as u64, Ordering::Relaxed);
        RouteOutcome::Stored { fields }
    }

    fn reject(&self, frame: &RawFrame, error: &TelemetryError) {
        match error {
            TelemetryError::ChecksumMismatch { .. } => {
                self.counters.checksum_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    unit = %String::from_utf8_lossy(frame.as_bytes()),
                    error = %error,
                    "Dropping unit"
                );
            }
            _ => {
                self.counters.format_errors.fetch_add(1, Ordering::Relaxed);
                debug!(protocol = ?frame.protocol, error = %error, "Dropping malformed unit");
            }
        }
    }

    pub fn stats(&self) -> RouterStats {
        let c = &self.counters;
        RouterStats {
            units: c.units.load(Ordering::Relaxed),
            records: c.records.load(Ordering::Relaxed),
            fields_written: c.fields_written.load(Ordering::Relaxed),
            unrecognized: c.unrecognized.load(Ordering::Relaxed),
            checksum_failures: c.checksum_failures.load(Ordering::Relaxed),
            format_errors: c.format_errors.load(Ordering::Relaxed),
        }
    }
}

impl FrameSink for Router {
    fn accept(&self, frame: RawFrame) {
        self.route(&frame);
    }
}
