//! Raw protocol units handed from the transport to the router

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Timestamp;

/// Kind of socket a unit arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum TransportKind {
    Stream,
    Datagram,
}

/// Wire protocol of a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum ProtocolKind {
    /// One ASCII sentence, line terminator stripped
    Sentence,
    /// One binary frame: `pgn: u32 LE`, `source: u8`, PGN data
    Frame,
}

/// One complete protocol unit as reassembled by the transport.
///
/// Consumed exactly once by the matching decoder and dropped afterwards.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Unit bytes (shared, never copied after reassembly)
    pub data: Arc<[u8]>,

    /// Time the last byte of the unit arrived
    pub received_at: Timestamp,

    pub transport: TransportKind,

    pub protocol: ProtocolKind,
}

impl RawFrame {
    pub fn new(
        data: impl Into<Arc<[u8]>>,
        received_at: Timestamp,
        transport: TransportKind,
        protocol: ProtocolKind,
    ) -> Self {
        Self { data: data.into(), received_at, transport, protocol }
    }

    /// Convenience constructor for a sentence received over a stream.
    pub fn sentence(line: &str, received_at: Timestamp) -> Self {
        Self::new(line.as_bytes(), received_at, TransportKind::Stream, ProtocolKind::Sentence)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
