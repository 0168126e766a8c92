//! Field access for a split sentence body

use tracing::trace;

pub(crate) const KNOT: f64 = 1852.0 / 3600.0;
pub(crate) const KILOMETER_PER_HOUR: f64 = 1.0 / 3.6;
pub(crate) const MILE_PER_HOUR: f64 = 0.447_04;
pub(crate) const FOOT: f64 = 0.3048;
pub(crate) const FATHOM: f64 = 1.8288;

/// Comma-separated fields of one sentence; index 0 is the address field.
pub(crate) struct Fields<'a> {
    items: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    pub(crate) fn split(body: &'a str) -> Self {
        Self { items: body.split(',').collect() }
    }

    pub(crate) fn address(&self) -> &'a str {
        self.items.first().copied().unwrap_or("")
    }

    /// Raw field text; empty fields read as absent.
    pub(crate) fn text(&self, index: usize) -> Option<&'a str> {
        self.items.get(index).copied().filter(|field| !field.is_empty())
    }

    /// Single-character flag such as `A`, `N` or `T`.
    pub(crate) fn flag(&self, index: usize) -> Option<char> {
        let text = self.text(index)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c.to_ascii_uppercase()),
            _ => None,
        }
    }

    /// Base-10 decimal number; absent when empty, malformed or non-finite.
    pub(crate) fn number(&self, index: usize) -> Option<f64> {
        let text = self.text(index)?;
        match parse_decimal(text) {
            Some(value) => Some(value),
            None => {
                trace!(field = index, text, address = self.address(), "Unparseable numeric field");
                None
            }
        }
    }

    /// Non-negative integer in the given radix.
    pub(crate) fn integer(&self, index: usize, radix: u32) -> Option<u32> {
        let text = self.text(index)?;
        match u32::from_str_radix(text, radix) {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(field = index, text, error = %e, "Unparseable integer field");
                None
            }
        }
    }

    /// `ddmm.mmmm` + `N`/`S` as signed decimal degrees.
    pub(crate) fn latitude(&self, value: usize, hemisphere: usize) -> Option<f64> {
        let degrees = parse_degrees_minutes(self.text(value)?, 90.0)?;
        match self.flag(hemisphere)? {
            'N' => Some(degrees),
            'S' => Some(-degrees),
            _ => None,
        }
    }

    /// `dddmm.mmmm` + `E`/`W` as signed decimal degrees.
    pub(crate) fn longitude(&self, value: usize, hemisphere: usize) -> Option<f64> {
        let degrees = parse_degrees_minutes(self.text(value)?, 180.0)?;
        match self.flag(hemisphere)? {
            'E' => Some(degrees),
            'W' => Some(-degrees),
            _ => None,
        }
    }

    /// Magnitude signed by an `E`/`W` direction flag (east positive).
    pub(crate) fn east_west(&self, value: usize, direction: usize) -> Option<f64> {
        let magnitude = self.number(value)?;
        match self.flag(direction)? {
            'E' => Some(magnitude),
            'W' => Some(-magnitude),
            _ => None,
        }
    }
}

/// Parse `[+-]digits[.digits]` strictly in base 10.
///
/// Rejects exponents, `inf`, `nan` and anything else `f64::from_str` would
/// otherwise let through.
pub(crate) fn parse_decimal(text: &str) -> Option<f64> {
    let unsigned = text.strip_prefix(['-', '+']).unwrap_or(text);
    let mut seen_digit = false;
    let mut seen_point = false;
    for c in unsigned.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_degrees_minutes(text: &str, limit: f64) -> Option<f64> {
    let raw = parse_decimal(text)?;
    if raw < 0.0 {
        return None;
    }
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return None;
    }
    let value = degrees + minutes / 60.0;
    (value <= limit).then_some(value)
}

/// Wrap an angle into `[0, 360)`.
pub(crate) fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Trailing decimal digits of a transducer name (`BAT2` → 2), else 0.
pub(crate) fn trailing_instance(name: &str) -> u8 {
    let digits_start = name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name[digits_start..].parse::<u8>().unwrap_or(0)
}
