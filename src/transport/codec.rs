//! Reassembly of byte streams into protocol units
//!
//! Sentences run from `$` or `!` to a line feed. Binary frames are wrapped as
//! `0x93`, a length byte, then `length` bytes of frame data (PGN, source and
//! payload). In [`WireProtocol::Auto`] both may be interleaved on one link.
//! Bytes that cannot start a unit are skipped.

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

use crate::frame::HEADER_LEN;
use crate::types::{ProtocolKind, RawFrame, Timestamp, TransportKind};
use crate::TelemetryError;

/// First byte of a wrapped binary frame.
pub const FRAME_START: u8 = 0x93;

/// Default bound on a partially received unit.
pub const DEFAULT_MAX_BUFFER: usize = 4_096;

/// Which unit kinds a link carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum WireProtocol {
    #[default]
    Sentence,
    Frame,
    /// Sentences and frames interleaved
    Auto,
}

impl WireProtocol {
    fn starts_unit(self, byte: u8) -> bool {
        match self {
            WireProtocol::Sentence => matches!(byte, b'$' | b'!'),
            WireProtocol::Frame => byte == FRAME_START,
            WireProtocol::Auto => matches!(byte, b'$' | b'!' | FRAME_START),
        }
    }
}

/// Counters kept by one codec instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct CodecStats {
    pub units: u64,
    pub overflows: u64,
    pub skipped_bytes: u64,
}

/// `tokio_util` decoder producing [`RawFrame`]s.
#[derive(Debug, Clone)]
pub struct UnitCodec {
    protocol: WireProtocol,
    transport: TransportKind,
    max_buffer: usize,
    stats: CodecStats,
}

impl UnitCodec {
    pub fn new(protocol: WireProtocol, transport: TransportKind, max_buffer: usize) -> Self {
        Self { protocol, transport, max_buffer: max_buffer.max(1), stats: CodecStats::default() }
    }

    pub fn stats(&self) -> CodecStats {
        self.stats
    }

    fn unit(&mut self, bytes: &[u8], protocol: ProtocolKind) -> RawFrame {
        self.stats.units += 1;
        RawFrame::new(bytes, Timestamp::now(), self.transport, protocol)
    }

    fn skip(&mut self, src: &mut BytesMut, count: usize) {
        if count > 0 {
            trace!(count, "Skipping bytes outside any unit");
            src.advance(count);
            self.stats.skipped_bytes += count as u64;
        }
    }

    fn overflow(&mut self, src: &mut BytesMut) {
        let error = TelemetryError::FramingOverflow { limit: self.max_buffer };
        warn!(buffered = src.len(), "{error}, discarding");
        self.stats.overflows += 1;
        self.stats.skipped_bytes += src.len() as u64;
        src.clear();
    }
}

impl Decoder for UnitCodec {
    type Item = RawFrame;
    type Error = TelemetryError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, TelemetryError> {
        loop {
            let start = src.iter().position(|&b| self.protocol.starts_unit(b)).unwrap_or(src.len());
            self.skip(src, start);
            let Some(&first) = src.first() else {
                return Ok(None);
            };

            if first == FRAME_START {
                let Some(&length) = src.get(1) else {
                    return Ok(None);
                };
                let length = usize::from(length);
                if length < HEADER_LEN {
                    trace!(length, "Frame length shorter than header");
                    self.skip(src, 1);
                    continue;
                }
                if src.len() < 2 + length {
                    if src.len() > self.max_buffer {
                        self.overflow(src);
                    }
                    return Ok(None);
                }
                let unit = src.split_to(2 + length);
                return Ok(Some(self.unit(&unit[2..], ProtocolKind::Frame)));
            }

            let Some(newline) = src.iter().position(|&b| b == b'\n') else {
                if src.len() > self.max_buffer {
                    self.overflow(src);
                }
                return Ok(None);
            };
            let line = src.split_to(newline + 1);
            let end = line.iter().rposition(|b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
            return Ok(Some(self.unit(&line[..end], ProtocolKind::Sentence)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>, TelemetryError> {
        if let Some(unit) = self.decode(src)? {
            return Ok(Some(unit));
        }
        // An unterminated final sentence is still a complete unit
        if src.first().is_some_and(|&b| b != FRAME_START) {
            let line = src.split();
            let end = line.iter().rposition(|b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
            return Ok(Some(self.unit(&line[..end], ProtocolKind::Sentence)));
        }
        if !src.is_empty() {
            trace!(remaining = src.len(), "Dropping truncated frame at end of input");
            self.stats.skipped_bytes += src.len() as u64;
            src.clear();
        }
        Ok(None)
    }
}
