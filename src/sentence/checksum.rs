//! Sentence framing and checksum validation

use crate::{Result, TelemetryError};

/// XOR of every byte in `body`.
pub fn compute(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Validate the start marker and checksum of a sentence, returning the body
/// between the marker and the `*` delimiter.
///
/// A sentence without `*` is accepted only when `require_checksum` is false.
pub fn verify(line: &[u8], require_checksum: bool) -> Result<&[u8]> {
    let rest = match line.split_first() {
        Some((b'$' | b'!', rest)) => rest,
        _ => return Err(TelemetryError::format("sentence", "missing '$' or '!' start marker")),
    };

    let Some(star) = rest.iter().position(|&b| b == b'*') else {
        if require_checksum {
            return Err(TelemetryError::format("sentence", "missing '*' checksum delimiter"));
        }
        return Ok(rest);
    };

    let (body, tail) = rest.split_at(star);
    let found = parse_hex_pair(&tail[1..])?;
    let expected = compute(body);
    if expected != found {
        return Err(TelemetryError::ChecksumMismatch { expected, found });
    }

    Ok(body)
}

fn parse_hex_pair(digits: &[u8]) -> Result<u8> {
    if digits.len() != 2 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(TelemetryError::format(
            "sentence",
            format!("checksum must be two hex digits, got {:?}", String::from_utf8_lossy(digits)),
        ));
    }
    // Both bytes are ASCII hex digits, so the slice is valid UTF-8.
    let text = std::str::from_utf8(digits)
        .map_err(|e| TelemetryError::format("sentence", format!("checksum: {e}")))?;
    u8::from_str_radix(text, 16)
        .map_err(|e| TelemetryError::format("sentence", format!("checksum: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sentence_checksum() {
        // Reference sentence from a depth sounder
        let line = b"$IIDBT,036.41,f,011.10,M,005.99,F*25";
        assert_eq!(verify(line, true).unwrap(), b"IIDBT,036.41,f,011.10,M,005.99,F");
    }

    #[test]
    fn lowercase_checksum_digits_are_accepted() {
        let body = b"GPHDT,123.4,T";
        let line = format!("${}*{:02x}", std::str::from_utf8(body).unwrap(), compute(body));
        assert!(verify(line.as_bytes(), true).is_ok());
    }

    #[test]
    fn mismatch_reports_both_values() {
        let err = verify(b"$IIDBT,036.41,f,011.10,M,005.99,F*26", true).unwrap_err();
        assert!(matches!(err, TelemetryError::ChecksumMismatch { expected: 0x25, found: 0x26 }));
    }

    #[test]
    fn malformed_framing_is_a_format_error() {
        assert!(matches!(verify(b"IIDBT,1,f*00", true), Err(TelemetryError::Format { .. })));
        assert!(matches!(verify(b"$IIDBT,1,f", true), Err(TelemetryError::Format { .. })));
        assert!(matches!(verify(b"$IIDBT,1,f*0", true), Err(TelemetryError::Format { .. })));
        assert!(matches!(verify(b"$IIDBT,1,f*0G", true), Err(TelemetryError::Format { .. })));
        assert!(matches!(verify(b"", true), Err(TelemetryError::Format { .. })));
    }

    #[test]
    fn optional_checksum_mode() {
        assert_eq!(verify(b"$IIDBT,1,f", false).unwrap(), b"IIDBT,1,f");
    }
}
