//! Static description of every field the decoders can produce.
//!
//! The table gives each `(sensor, field)` pair the unit category used for
//! enrichment, the short mnemonic instrument faces print next to a value, and
//! whether thresholds may be attached to it.

use crate::enrich::UnitCategory;
use crate::types::{MetricKey, SensorType};

/// Schema entry for one sensor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    pub sensor: SensorType,
    pub field: &'static str,
    pub category: UnitCategory,
    pub mnemonic: &'static str,
    /// Whether alarm thresholds make sense for this field
    pub alarmable: bool,
}

const fn entry(
    sensor: SensorType,
    field: &'static str,
    category: UnitCategory,
    mnemonic: &'static str,
    alarmable: bool,
) -> FieldSchema {
    FieldSchema { sensor, field, category, mnemonic, alarmable }
}

use SensorType as S;
use UnitCategory as C;

/// Every field known to the decoders.
pub static FIELDS: &[FieldSchema] = &[
    entry(S::Depth, "depth", C::Depth, "DPT", true),
    entry(S::Depth, "offset", C::Depth, "OFS", false),
    entry(S::Speed, "throughWater", C::BoatSpeed, "STW", true),
    entry(S::Speed, "overGround", C::BoatSpeed, "SOG", true),
    entry(S::Wind, "apparentSpeed", C::WindSpeed, "AWS", true),
    entry(S::Wind, "apparentDirection", C::Angle, "AWA", false),
    entry(S::Wind, "trueSpeed", C::WindSpeed, "TWS", true),
    entry(S::Wind, "trueDirection", C::Angle, "TWD", false),
    entry(S::Gps, "latitude", C::Latitude, "LAT", false),
    entry(S::Gps, "longitude", C::Longitude, "LON", false),
    entry(S::Gps, "altitude", C::Depth, "ALT", false),
    entry(S::Gps, "speedOverGround", C::BoatSpeed, "SOG", true),
    entry(S::Gps, "courseOverGround", C::Angle, "COG", false),
    entry(S::Gps, "numberOfSatellites", C::Count, "SATS", true),
    entry(S::Gps, "horizontalDilutionOfPrecision", C::Dimensionless, "HDOP", true),
    entry(S::Gps, "fixQuality", C::Count, "FIX", false),
    entry(S::Gps, "magneticVariation", C::Angle, "VAR", false),
    entry(S::Compass, "heading", C::Angle, "HDG", false),
    entry(S::Compass, "magneticHeading", C::Angle, "HDM", false),
    entry(S::Compass, "trueHeading", C::Angle, "HDT", false),
    entry(S::Compass, "variation", C::Angle, "VAR", false),
    entry(S::Compass, "deviation", C::Angle, "DEV", false),
    entry(S::Compass, "rateOfTurn", C::AngularRate, "ROT", true),
    entry(S::Engine, "rpm", C::RotationalSpeed, "RPM", true),
    entry(S::Engine, "shaftRpm", C::RotationalSpeed, "SRPM", true),
    entry(S::Engine, "boostPressure", C::Pressure, "BST", true),
    entry(S::Engine, "oilPressure", C::Pressure, "EOP", true),
    entry(S::Engine, "oilTemp", C::Temperature, "EOT", true),
    entry(S::Engine, "coolantTemp", C::Temperature, "ECT", true),
    entry(S::Engine, "alternatorVoltage", C::Voltage, "ALT", true),
    entry(S::Engine, "fuelRate", C::FlowRate, "FLOW", true),
    entry(S::Engine, "hours", C::Duration, "EHR", false),
    entry(S::Battery, "voltage", C::Voltage, "VLT", true),
    entry(S::Battery, "current", C::Current, "AMP", true),
    entry(S::Battery, "temperature", C::Temperature, "TMP", true),
    entry(S::Battery, "stateOfCharge", C::Percentage, "SOC", true),
    entry(S::Battery, "stateOfHealth", C::Percentage, "SOH", true),
    entry(S::Battery, "timeRemaining", C::Duration, "REM", true),
    entry(S::Tank, "level", C::Percentage, "LVL", true),
    entry(S::Tank, "capacity", C::Volume, "CAP", false),
    entry(S::Tank, "tankType", C::Count, "TYPE", false),
    entry(S::Temperature, "value", C::Temperature, "VAL", true),
    entry(S::Weather, "airTemperature", C::Temperature, "ATMP", true),
    entry(S::Weather, "barometricPressure", C::Pressure, "BARO", true),
    entry(S::Weather, "humidity", C::Percentage, "HUM", true),
];

/// Schema entry for a sensor field, if known.
pub fn lookup(sensor: SensorType, field: &str) -> Option<&'static FieldSchema> {
    FIELDS.iter().find(|schema| schema.sensor == sensor && schema.field == field)
}

/// Unit category for a metric; unknown fields are plain counts.
pub fn category_of(key: &MetricKey) -> UnitCategory {
    lookup(key.sensor, key.field()).map(|schema| schema.category).unwrap_or(UnitCategory::Count)
}

/// Mnemonic for a metric; unknown fields use the first five letters, upper-cased.
pub fn mnemonic_of(key: &MetricKey) -> String {
    match lookup(key.sensor, key.field()) {
        Some(schema) => schema.mnemonic.to_string(),
        None => key.field().chars().take(5).collect::<String>().to_uppercase(),
    }
}

/// Whether thresholds may be attached; unknown fields are allowed.
pub fn is_alarmable(key: &MetricKey) -> bool {
    lookup(key.sensor, key.field()).is_none_or(|schema| schema.alarmable)
}
