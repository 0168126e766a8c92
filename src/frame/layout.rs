//! Field extraction primitives for binary parameter groups

/// Storage width of a field inside the payload, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Width {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    /// Bits 0-3 of one byte
    LowNibble,
    /// Bits 4-7 of one byte
    HighNibble,
}

impl Width {
    fn bytes(self) -> usize {
        match self {
            Width::U8 | Width::I8 | Width::LowNibble | Width::HighNibble => 1,
            Width::U16 | Width::I16 => 2,
            Width::U32 | Width::I32 => 4,
        }
    }

    /// Read the raw integer; `None` when truncated or equal to the "no data"
    /// sentinel (all ones unsigned, maximum positive signed, `0xF` nibble).
    pub(crate) fn read(self, payload: &[u8], offset: usize) -> Option<i64> {
        let bytes = payload.get(offset..offset + self.bytes())?;
        match self {
            Width::U8 => (bytes[0] != u8::MAX).then_some(i64::from(bytes[0])),
            Width::U16 => {
                let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
                (raw != u16::MAX).then_some(i64::from(raw))
            }
            Width::U32 => {
                let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (raw != u32::MAX).then_some(i64::from(raw))
            }
            Width::I8 => {
                let raw = i8::from_le_bytes([bytes[0]]);
                (raw != i8::MAX).then_some(i64::from(raw))
            }
            Width::I16 => {
                let raw = i16::from_le_bytes([bytes[0], bytes[1]]);
                (raw != i16::MAX).then_some(i64::from(raw))
            }
            Width::I32 => {
                let raw = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                (raw != i32::MAX).then_some(i64::from(raw))
            }
            Width::LowNibble => {
                let raw = bytes[0] & 0x0F;
                (raw != 0x0F).then_some(i64::from(raw))
            }
            Width::HighNibble => {
                let raw = bytes[0] >> 4;
                (raw != 0x0F).then_some(i64::from(raw))
            }
        }
    }
}

/// Post-scaling conversion into canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Convert {
    None,
    KelvinToCelsius,
    /// Signed angle, radians to degrees
    RadiansToDegrees,
    /// Bearing, radians to degrees wrapped into `[0, 360)`
    RadiansToBearing,
    RadiansPerSecondToDegrees,
}

impl Convert {
    pub(crate) fn apply(self, value: f64) -> f64 {
        match self {
            Convert::None => value,
            Convert::KelvinToCelsius => value - 273.15,
            Convert::RadiansToDegrees | Convert::RadiansPerSecondToDegrees => value.to_degrees(),
            Convert::RadiansToBearing => {
                let degrees = value.to_degrees().rem_euclid(360.0);
                if degrees >= 360.0 { 0.0 } else { degrees }
            }
        }
    }
}

/// Field name, possibly chosen by the group's reference byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldName {
    Fixed(&'static str),
    /// `primary` for true-referenced data, `alternate` otherwise
    Referenced { primary: &'static str, alternate: &'static str },
}

/// How a group's reference byte selects between field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reference {
    /// Bits 0-2: 2 is apparent, 0/1/3/4 are true (ground or water referenced)
    Wind { offset: usize },
    /// Bits 0-1: 0 is true, 1 is magnetic
    Heading { offset: usize },
}

impl Reference {
    /// `Some(true)` for the primary name, `None` when unavailable.
    pub(crate) fn resolve(self, payload: &[u8]) -> Option<bool> {
        match self {
            Reference::Wind { offset } => match payload.get(offset)? & 0x07 {
                0 | 1 | 3 | 4 => Some(true),
                2 => Some(false),
                _ => None,
            },
            Reference::Heading { offset } => match payload.get(offset)? & 0x03 {
                0 => Some(true),
                1 => Some(false),
                _ => None,
            },
        }
    }
}

/// Where a group carries its device instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstanceSource {
    /// Single-instance group
    Zero,
    Byte(usize),
    LowNibble(usize),
}

impl InstanceSource {
    pub(crate) fn read(self, payload: &[u8]) -> u8 {
        match self {
            InstanceSource::Zero => 0,
            InstanceSource::Byte(offset) => payload.get(offset).copied().unwrap_or(0),
            InstanceSource::LowNibble(offset) => payload.get(offset).map_or(0, |b| b & 0x0F),
        }
    }
}

/// One field of a parameter group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FieldLayout {
    pub name: FieldName,
    pub offset: usize,
    pub width: Width,
    pub resolution: f64,
    pub convert: Convert,
}

impl FieldLayout {
    /// Scaled, converted value; `None` when truncated or "no data".
    pub(crate) fn extract(&self, payload: &[u8]) -> Option<f64> {
        let raw = self.width.read(payload, self.offset)?;
        Some(self.convert.apply(raw as f64 * self.resolution))
    }
}

pub(crate) const fn field(
    name: &'static str,
    offset: usize,
    width: Width,
    resolution: f64,
    convert: Convert,
) -> FieldLayout {
    FieldLayout { name: FieldName::Fixed(name), offset, width, resolution, convert }
}

pub(crate) const fn referenced(
    primary: &'static str,
    alternate: &'static str,
    offset: usize,
    width: Width,
    resolution: f64,
    convert: Convert,
) -> FieldLayout {
    FieldLayout { name: FieldName::Referenced { primary, alternate }, offset, width, resolution, convert }
}
