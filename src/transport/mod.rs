//! Network transport: sockets, reassembly and the reconnect state machine.
//!
//! ```text
//! Connector ──connect──▶ Link ──next_unit──▶ TransportManager ──accept──▶ FrameSink
//!                         │                         │
//!                    UnitCodec                ReconnectTracker
//! ```
//!
//! The [`TransportManager`] owns a single driver task per session. That task
//! opens the link, pumps units into the sink in arrival order and, when the
//! link fails, walks the backoff ladder in [`ReconnectPolicy`] until it
//! reconnects or runs out of attempts.

mod backoff;
mod codec;
mod link;
mod manager;

pub use backoff::{ReconnectPolicy, ReconnectTracker, RetryDecision};
pub use codec::{CodecStats, DEFAULT_MAX_BUFFER, FRAME_START, UnitCodec, WireProtocol};
pub use link::{Connector, Endpoint, Link, LinkKind, NetConnector};
pub use manager::{
    ConnectionState, ConnectionStatus, FrameSink, TransportManager, TransportStats,
    TransportStatsSnapshot,
};
