//! Decoded, validated readings shared by both decoders

use serde::{Deserialize, Serialize};

use super::{MetricKey, SensorType};

/// Which sentence or frame type produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum RecordKind {
    Depth,
    WaterSpeed,
    Wind,
    Position,
    CourseOverGround,
    GnssFix,
    Heading,
    RateOfTurn,
    Engine,
    Battery,
    FluidLevel,
    Temperature,
    Environment,
    Transducer,
}

/// One named field of a record.
///
/// `value` is `None` when the field was empty, carried the protocol's "no
/// data" sentinel, or failed to parse. An absent field is never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct FieldReading {
    pub name: &'static str,
    pub value: Option<f64>,

    /// Sensor and instance for this field when it differs from the record's.
    /// Only transducer records, which bundle unrelated measurements, set it.
    pub target: Option<(SensorType, u8)>,
}

/// A decoded sentence or frame, all values in canonical units.
///
/// Canonical units are metres, metres per second, degrees, degrees Celsius,
/// pascals, volts, amperes, revolutions per minute, percent, litres, litres
/// per hour and seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct DecodedRecord {
    pub kind: RecordKind,
    pub sensor: SensorType,
    pub instance: u8,
    pub fields: Vec<FieldReading>,
}

impl DecodedRecord {
    pub fn new(kind: RecordKind, sensor: SensorType, instance: u8) -> Self {
        Self { kind, sensor, instance, fields: Vec::new() }
    }

    /// Append a field; non-finite values are stored as absent.
    pub fn with_field(mut self, name: &'static str, value: Option<f64>) -> Self {
        self.push_field(name, value);
        self
    }

    pub fn push_field(&mut self, name: &'static str, value: Option<f64>) {
        self.fields.push(FieldReading { name, value: value.filter(|v| v.is_finite()), target: None });
    }

    /// Append a field addressed to another sensor/instance.
    pub fn push_targeted(
        &mut self,
        sensor: SensorType,
        instance: u8,
        name: &'static str,
        value: Option<f64>,
    ) {
        self.fields.push(FieldReading {
            name,
            value: value.filter(|v| v.is_finite()),
            target: Some((sensor, instance)),
        });
    }

    /// Value of the first field with this name, if present and valid.
    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.iter().find(|f| f.name == name).and_then(|f| f.value)
    }

    /// Number of fields that carry a value.
    pub fn valid_count(&self) -> usize {
        self.fields.iter().filter(|f| f.value.is_some()).count()
    }

    /// Metric keys and values for every valid field, in field order.
    pub fn metrics(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        self.fields.iter().filter_map(move |field| {
            let value = field.value?;
            let (sensor, instance) = field.target.unwrap_or((self.sensor, self.instance));
            Some((MetricKey::new(sensor, instance, field.name), value))
        })
    }
}

/// Outcome of decoding one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(DecodedRecord),

    /// Well-formed unit of a type this core does not interpret. Not an error.
    Unrecognized { identifier: String },
}

impl Decoded {
    pub fn into_record(self) -> Option<DecodedRecord> {
        match self {
            Decoded::Record(record) => Some(record),
            Decoded::Unrecognized { .. } => None,
        }
    }
}
