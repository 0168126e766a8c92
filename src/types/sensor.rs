//! Sensor identities and metric keys

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::TelemetryError;

/// Logical sensor category a reading belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SensorType {
    Depth,
    Speed,
    Wind,
    Gps,
    Compass,
    Engine,
    Battery,
    Tank,
    Temperature,
    Weather,
}

impl SensorType {
    pub const ALL: [SensorType; 10] = [
        SensorType::Depth,
        SensorType::Speed,
        SensorType::Wind,
        SensorType::Gps,
        SensorType::Compass,
        SensorType::Engine,
        SensorType::Battery,
        SensorType::Tank,
        SensorType::Temperature,
        SensorType::Weather,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SensorType::Depth => "depth",
            SensorType::Speed => "speed",
            SensorType::Wind => "wind",
            SensorType::Gps => "gps",
            SensorType::Compass => "compass",
            SensorType::Engine => "engine",
            SensorType::Battery => "battery",
            SensorType::Tank => "tank",
            SensorType::Temperature => "temperature",
            SensorType::Weather => "weather",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|sensor| sensor.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TelemetryError::format("sensor type", format!("unknown sensor '{s}'")))
    }
}

/// Identity of one time series: sensor type, instance and field name.
///
/// Field names are the camelCase names the display layer already uses
/// (`depth`, `voltage`, `apparentSpeed`, ...). Keys produced by the decoders
/// borrow `'static` names; keys parsed from configuration own theirs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct MetricKey {
    pub sensor: SensorType,
    pub instance: u8,
    pub field: Cow<'static, str>,
}

impl MetricKey {
    pub fn new(sensor: SensorType, instance: u8, field: impl Into<Cow<'static, str>>) -> Self {
        Self { sensor, instance, field: field.into() }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.sensor, self.instance, self.field)
    }
}

/// Parses the `sensor/instance/field` form used in configuration files.
impl FromStr for MetricKey {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let (Some(sensor), Some(instance), Some(field), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TelemetryError::format(
                "metric key",
                format!("expected sensor/instance/field, got '{s}'"),
            ));
        };

        let sensor = sensor.parse::<SensorType>()?;
        let instance = instance.parse::<u8>().map_err(|e| {
            TelemetryError::format("metric key", format!("bad instance '{instance}': {e}"))
        })?;
        if field.is_empty() {
            return Err(TelemetryError::format("metric key", "empty field name"));
        }

        Ok(MetricKey::new(sensor, instance, field.to_string()))
    }
}
