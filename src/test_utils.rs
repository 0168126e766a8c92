//! Test utilities shared by unit tests and benchmarks
//!
//! Builders for well-formed units, a scripted [`Connector`] for driving the
//! transport state machine without sockets, and fixture path resolution for
//! the recorded captures under `test-data/`.

#![cfg(any(test, feature = "benchmark"))]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::frame;
use crate::sentence::checksum;
use crate::transport::{CodecStats, Connector, Endpoint, FRAME_START, Link};
use crate::types::{ProtocolKind, RawFrame, Timestamp, TransportKind};
use crate::{Result, TelemetryError};

/// Wrap a sentence body as `$body*HH` with a correct checksum.
pub fn sentence(body: &str) -> String {
    format!("${body}*{:02X}", checksum::compute(body.as_bytes()))
}

/// Frame bytes as they appear on the wire: start byte, length, frame data.
pub fn wire_frame(pgn: u32, source: u8, payload: &[u8]) -> Vec<u8> {
    let data = frame::encode(pgn, source, payload);
    let mut bytes = Vec::with_capacity(data.len() + 2);
    bytes.push(FRAME_START);
    bytes.push(data.len() as u8);
    bytes.extend_from_slice(&data);
    bytes
}

/// Path of a file inside `test-data/`.
pub fn fixture_path(name: impl AsRef<Path>) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data").join(name)
}

/// Lines of a recorded sentence capture, blank lines and `#` comments removed.
pub fn capture_lines(name: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let text = std::fs::read_to_string(fixture_path(name))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

const UNIT_PACE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkEnd {
    Close,
    Hang,
}

/// A link that replays fixed units, one every 10ms.
pub struct ScriptedLink {
    units: VecDeque<Vec<u8>>,
    end: LinkEnd,
    delivered: u64,
    drops: Arc<AtomicUsize>,
}

impl ScriptedLink {
    /// Deliver `units`, then report the peer closed.
    pub fn new(units: Vec<Vec<u8>>) -> Self {
        Self { units: units.into(), end: LinkEnd::Close, delivered: 0, drops: Arc::default() }
    }

    /// Never yields a unit and never closes.
    pub fn endless() -> Self {
        let mut link = Self::new(Vec::new());
        link.end = LinkEnd::Hang;
        link
    }

    /// Incremented when the link is dropped.
    pub fn drop_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.drops)
    }
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Link for ScriptedLink {
    async fn next_unit(&mut self) -> Result<Option<RawFrame>> {
        if let Some(unit) = self.units.pop_front() {
            tokio::time::sleep(UNIT_PACE).await;
            self.delivered += 1;
            let protocol = match unit.first() {
                Some(b'$' | b'!') => ProtocolKind::Sentence,
                _ => ProtocolKind::Frame,
            };
            return Ok(Some(RawFrame::new(unit, Timestamp::now(), TransportKind::Stream, protocol)));
        }
        match self.end {
            LinkEnd::Close => {
                tokio::time::sleep(UNIT_PACE).await;
                Ok(None)
            }
            LinkEnd::Hang => std::future::pending().await,
        }
    }

    fn stats(&self) -> CodecStats {
        CodecStats { units: self.delivered, ..CodecStats::default() }
    }
}

/// Hands out scripted connect results in order; fails once the script runs out.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Result<ScriptedLink>>>,
    attempts: Mutex<Vec<Instant>>,
    calls: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Result<ScriptedLink>>) -> Self {
        Self { script: Mutex::new(script.into()), ..Self::default() }
    }

    pub fn always_failing() -> Self {
        Self::default()
    }

    /// Number of connect calls so far.
    pub fn attempts(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Tokio clock reading at each connect call.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Link>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.attempts.lock().push(Instant::now());
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(link)) => Ok(Box::new(link)),
            Some(Err(error)) => Err(error),
            None => Err(TelemetryError::transport_failed(format!("{endpoint} refused"))),
        }
    }
}
