//! Connection lifecycle: connect, read, drop, back off, retry

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::backoff::{ReconnectPolicy, ReconnectTracker, RetryDecision};
use super::codec::CodecStats;
use super::link::{Connector, Endpoint, Link};
use crate::types::{RawFrame, Timestamp};
use crate::{Result, TelemetryError};

/// Receives every reassembled unit, synchronously and in arrival order.
pub trait FrameSink: Send + Sync + 'static {
    fn accept(&self, frame: RawFrame);
}

impl<F> FrameSink for F
where
    F: Fn(RawFrame) + Send + Sync + 'static,
{
    fn accept(&self, frame: RawFrame) {
        self(frame)
    }
}

/// Link state shown by a status indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Terminal until [`TransportManager::reset`]
    Error(String),
}

/// Snapshot published on every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    /// Consecutive failures since the last successful connect
    pub attempt_count: u32,
    pub next_retry_at: Option<Timestamp>,
}

/// Lifetime counters across every link the manager has opened.
#[derive(Debug, Default)]
pub struct TransportStats {
    connects: AtomicU64,
    connection_losses: AtomicU64,
    units: AtomicU64,
    overflows: AtomicU64,
    skipped_bytes: AtomicU64,
}

/// Plain copy of [`TransportStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct TransportStatsSnapshot {
    pub connects: u64,
    pub connection_losses: u64,
    pub units: u64,
    pub overflows: u64,
    pub skipped_bytes: u64,
}

impl TransportStats {
    pub fn snapshot(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            connection_losses: self.connection_losses.load(Ordering::Relaxed),
            units: self.units.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            skipped_bytes: self.skipped_bytes.load(Ordering::Relaxed),
        }
    }

    fn absorb(&self, codec: CodecStats) {
        self.overflows.fetch_add(codec.overflows, Ordering::Relaxed);
        self.skipped_bytes.fetch_add(codec.skipped_bytes, Ordering::Relaxed);
    }
}

struct Session {
    endpoint: Endpoint,
    cancel: CancellationToken,
    /// Reset signal for this session only
    reset: Arc<Notify>,
    task: JoinHandle<()>,
}

/// State shared between the manager handle and its driver task.
struct Shared {
    connector: Arc<dyn Connector>,
    sink: Arc<dyn FrameSink>,
    policy: ReconnectPolicy,
    status: watch::Sender<ConnectionStatus>,
    stats: TransportStats,
}

impl Shared {
    fn publish(&self, state: ConnectionState, attempt_count: u32, next_retry_at: Option<Timestamp>) {
        self.status.send_replace(ConnectionStatus { state, attempt_count, next_retry_at });
    }
}

/// Owns the live connection and its reconnect state machine.
///
/// One driver task per [`connect`](Self::connect). The task alone touches the
/// socket; [`disconnect`](Self::disconnect) cancels it and waits for it to
/// finish, so the link is dropped exactly once.
pub struct TransportManager {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

enum ReadEnd {
    Cancelled,
    Closed,
    Failed(TelemetryError),
}

impl TransportManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        sink: Arc<dyn FrameSink>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            shared: Arc::new(Shared {
                connector,
                sink,
                policy,
                status,
                stats: TransportStats::default(),
            }),
            session: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    pub fn stats(&self) -> TransportStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Endpoint of the current session, if any.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.session.lock().as_ref().map(|session| session.endpoint.clone())
    }

    /// Start connecting to `endpoint`, replacing any current session.
    ///
    /// Returns once the driver task is running; progress is reported through
    /// [`subscribe_status`](Self::subscribe_status).
    pub async fn connect(&self, endpoint: Endpoint) -> Result<()> {
        endpoint.validate()?;
        self.disconnect().await;

        let cancel = CancellationToken::new();
        let reset = Arc::new(Notify::new());
        let shared = Arc::clone(&self.shared);
        let task =
            tokio::spawn(drive(shared, endpoint.clone(), cancel.clone(), Arc::clone(&reset)));

        let previous = self.session.lock().replace(Session { endpoint, cancel, reset, task });
        if let Some(previous) = previous {
            // A concurrent connect raced us; stop its task too
            previous.cancel.cancel();
        }
        Ok(())
    }

    /// Stop the session and release its socket and timers.
    ///
    /// Idempotent and callable from any task: a second call finds no session
    /// and returns immediately.
    pub async fn disconnect(&self) {
        let Some(session) = self.session.lock().take() else {
            return;
        };
        info!(endpoint = %session.endpoint, "Disconnecting");
        session.cancel.cancel();
        if let Err(e) = session.task.await {
            warn!(error = %e, "Transport task ended abnormally");
        }
        self.shared.publish(ConnectionState::Disconnected, 0, None);
    }

    /// Leave the terminal error state and start retrying from the first
    /// ladder step. No effect in any other state.
    pub fn reset(&self) {
        if !matches!(self.shared.status.borrow().state, ConnectionState::Error(_)) {
            return;
        }
        if let Some(session) = self.session.lock().as_ref() {
            info!(endpoint = %session.endpoint, "Reconnect reset requested");
            session.reset.notify_one();
        }
    }
}

impl Drop for TransportManager {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

async fn drive(
    shared: Arc<Shared>,
    endpoint: Endpoint,
    cancel: CancellationToken,
    reset: Arc<Notify>,
) {
    let mut tracker = ReconnectTracker::new(shared.policy.clone());
    info!(%endpoint, "Transport task started");

    loop {
        shared.publish(ConnectionState::Connecting, tracker.attempt_count(), None);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = tokio::time::timeout(
                shared.policy.connect_timeout(),
                shared.connector.connect(&endpoint),
            ) => attempt,
        };

        let failure = match attempt {
            Ok(Ok(link)) => {
                tracker.record_success();
                shared.stats.connects.fetch_add(1, Ordering::Relaxed);
                shared.publish(ConnectionState::Connected, 0, None);
                info!(%endpoint, "Connected");

                match read_units(link, &shared, &cancel).await {
                    ReadEnd::Cancelled => break,
                    ReadEnd::Closed => "peer closed the connection".to_string(),
                    ReadEnd::Failed(e) => e.to_string(),
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("connect timed out after {:?}", shared.policy.connect_timeout()),
        };

        match tracker.record_failure() {
            RetryDecision::Retry(delay) => {
                let next = Timestamp::now().saturating_add(delay);
                warn!(%endpoint, reason = %failure, attempt = tracker.attempt_count(), ?delay, "Link down, retrying");
                shared.publish(ConnectionState::Disconnected, tracker.attempt_count(), Some(next));
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::Exhausted => {
                let attempts = tracker.attempt_count() - 1;
                let exhausted = TelemetryError::ReconnectExhausted { attempts };
                error!(%endpoint, last_failure = %failure, "{exhausted}");
                shared.publish(ConnectionState::Error(exhausted.to_string()), attempts, None);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = reset.notified() => tracker.reset(),
                }
            }
        }
    }

    debug!(%endpoint, "Transport task stopped");
}

/// Pump units into the sink until the link ends or the session is cancelled.
/// The link is dropped before returning.
async fn read_units(mut link: Box<dyn Link>, shared: &Shared, cancel: &CancellationToken) -> ReadEnd {
    let end = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break ReadEnd::Cancelled,
            unit = link.next_unit() => match unit {
                Ok(Some(frame)) => {
                    shared.stats.units.fetch_add(1, Ordering::Relaxed);
                    shared.sink.accept(frame);
                }
                Ok(None) => break ReadEnd::Closed,
                Err(e) => break ReadEnd::Failed(e),
            },
        }
    };

    shared.stats.absorb(link.stats());
    if !matches!(end, ReadEnd::Cancelled) {
        shared.stats.connection_losses.fetch_add(1, Ordering::Relaxed);
    }
    drop(link);
    end
}
