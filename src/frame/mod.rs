//! Binary parameter-group decoder.
//!
//! A frame is `pgn: u32 LE`, `source: u8`, then the group payload. Layouts are
//! table driven (see `pgn.rs`): each field has an offset, a width, a
//! resolution and a unit conversion. Fields past the end of a short payload
//! and fields holding the "no data" sentinel are absent.
//!
//! ```rust
//! use bridgewatch::frame::{self, FrameDecoder};
//!
//! // Battery status, instance 2, 12.60 V
//! let payload = [0x02, 0xEC, 0x04, 0xFF, 0x7F, 0xFF, 0xFF, 0x00];
//! let bytes = frame::encode(127508, 17, &payload);
//!
//! let record = FrameDecoder.decode(&bytes).unwrap().into_record().unwrap();
//! assert_eq!(record.instance, 2);
//! assert_eq!(record.field("voltage"), Some(12.6));
//! assert_eq!(record.field("current"), None);
//! ```

mod layout;
mod pgn;

use tracing::trace;

use crate::types::{Decoded, DecodedRecord};
use crate::{Result, TelemetryError};
use layout::FieldName;

/// Bytes before the payload: PGN and source address.
pub const HEADER_LEN: usize = 5;

/// Parameter group numbers this decoder interprets.
pub fn supported_pgns() -> impl Iterator<Item = u32> {
    pgn::LAYOUTS.iter().map(|layout| layout.pgn)
}

/// Human-readable group name, if supported.
pub fn pgn_name(pgn: u32) -> Option<&'static str> {
    pgn::lookup(pgn).map(|layout| layout.name)
}

/// Build frame bytes from a PGN, source address and payload.
pub fn encode(pgn: u32, source: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&pgn.to_le_bytes());
    bytes.push(source);
    bytes.extend_from_slice(payload);
    bytes
}

/// Stateless binary frame decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn decode(&self, data: &[u8]) -> Result<Decoded> {
        if data.len() < HEADER_LEN {
            return Err(TelemetryError::format(
                "frame",
                format!("{} bytes is shorter than the {HEADER_LEN}-byte header", data.len()),
            ));
        }
        let pgn = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let source = data[4];
        let payload = &data[HEADER_LEN..];

        let Some(layout) = pgn::lookup(pgn) else {
            trace!(pgn, source, "Unsupported parameter group");
            return Ok(Decoded::Unrecognized { identifier: pgn.to_string() });
        };

        let instance = layout.instance.read(payload);
        let primary = layout.reference.and_then(|reference| reference.resolve(payload));

        let mut record = DecodedRecord::new(layout.kind, layout.sensor, instance);
        for field in layout.fields {
            let name = match field.name {
                FieldName::Fixed(name) => name,
                FieldName::Referenced { primary: true_name, alternate } => match primary {
                    Some(true) => true_name,
                    Some(false) => alternate,
                    None => continue,
                },
            };
            record.push_field(name, field.extract(payload));
        }

        trace!(pgn, source, instance, valid = record.valid_count(), "Decoded frame");
        Ok(Decoded::Record(record))
    }
}
