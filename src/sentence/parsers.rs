//! Per-formatter field mappings
//!
//! Every routine receives the already verified sentence body and produces a
//! record in canonical units. A field that is empty, malformed or invalidated
//! by a status flag is absent, never zero.

use super::fields::{
    FATHOM, FOOT, Fields, KILOMETER_PER_HOUR, KNOT, MILE_PER_HOUR, normalize_degrees,
    trailing_instance,
};
use crate::types::{DecodedRecord, RecordKind, SensorType};
use crate::{Result, TelemetryError};

/// Formatters this decoder interprets.
pub const SUPPORTED: &[&str] = &[
    "DBT", "DBS", "DPT", "VHW", "VTG", "MWV", "RMC", "GGA", "GLL", "HDG", "HDT", "HDM", "ROT",
    "MTW", "RPM", "XDR",
];

/// Decode a body by formatter; `Ok(None)` for formatters outside [`SUPPORTED`].
pub(crate) fn decode(formatter: &str, fields: &Fields<'_>) -> Result<Option<DecodedRecord>> {
    let record = match formatter {
        "DBT" | "DBS" => depth_below(fields),
        "DPT" => depth(fields),
        "VHW" => water_speed(fields),
        "VTG" => course_over_ground(fields),
        "MWV" => wind(fields)?,
        "RMC" => recommended_minimum(fields),
        "GGA" => fix(fields),
        "GLL" => geographic_position(fields),
        "HDG" => heading_deviation_variation(fields),
        "HDT" => true_heading(fields),
        "HDM" => magnetic_heading(fields),
        "ROT" => rate_of_turn(fields),
        "MTW" => water_temperature(fields),
        "RPM" => revolutions(fields),
        "XDR" => transducers(fields),
        _ => return Ok(None),
    };
    Ok(Some(record))
}

/// Value at `index` when the unit flag at `index + 1` matches `unit`.
fn with_unit(fields: &Fields<'_>, index: usize, unit: char) -> Option<f64> {
    match fields.flag(index + 1) {
        Some(flag) if flag == unit.to_ascii_uppercase() => fields.number(index),
        _ => None,
    }
}

fn status_ok(fields: &Fields<'_>, index: usize) -> bool {
    fields.flag(index) == Some('A')
}

fn depth_below(fields: &Fields<'_>) -> DecodedRecord {
    // Prefer metres, then feet, then fathoms
    let depth = with_unit(fields, 3, 'M')
        .or_else(|| with_unit(fields, 1, 'f').map(|feet| feet * FOOT))
        .or_else(|| with_unit(fields, 5, 'F').map(|fathoms| fathoms * FATHOM));
    DecodedRecord::new(RecordKind::Depth, SensorType::Depth, 0).with_field("depth", depth)
}

fn depth(fields: &Fields<'_>) -> DecodedRecord {
    DecodedRecord::new(RecordKind::Depth, SensorType::Depth, 0)
        .with_field("depth", fields.number(1))
        .with_field("offset", fields.number(2))
}

fn water_speed(fields: &Fields<'_>) -> DecodedRecord {
    let speed = with_unit(fields, 5, 'N')
        .map(|knots| knots * KNOT)
        .or_else(|| with_unit(fields, 7, 'K').map(|kmh| kmh * KILOMETER_PER_HOUR));
    DecodedRecord::new(RecordKind::WaterSpeed, SensorType::Speed, 0)
        .with_field("throughWater", speed)
}

fn course_over_ground(fields: &Fields<'_>) -> DecodedRecord {
    let valid = fields.flag(9) != Some('N');
    let course = with_unit(fields, 1, 'T').map(normalize_degrees).filter(|_| valid);
    let speed = with_unit(fields, 5, 'N')
        .map(|knots| knots * KNOT)
        .or_else(|| with_unit(fields, 7, 'K').map(|kmh| kmh * KILOMETER_PER_HOUR))
        .filter(|_| valid);
    DecodedRecord::new(RecordKind::CourseOverGround, SensorType::Gps, 0)
        .with_field("courseOverGround", course)
        .with_field("speedOverGround", speed)
}

fn wind(fields: &Fields<'_>) -> Result<DecodedRecord> {
    let (direction_name, speed_name) = match fields.flag(2) {
        Some('R') => ("apparentDirection", "apparentSpeed"),
        Some('T') => ("trueDirection", "trueSpeed"),
        other => {
            return Err(TelemetryError::format(
                "MWV",
                format!("wind reference must be R or T, got {other:?}"),
            ));
        }
    };

    let valid = status_ok(fields, 5);
    let direction = fields.number(1).map(normalize_degrees).filter(|_| valid);
    let speed = fields
        .number(3)
        .and_then(|raw| match fields.flag(4)? {
            'K' => Some(raw * KILOMETER_PER_HOUR),
            'M' => Some(raw),
            'N' => Some(raw * KNOT),
            'S' => Some(raw * MILE_PER_HOUR),
            _ => None,
        })
        .filter(|_| valid);

    Ok(DecodedRecord::new(RecordKind::Wind, SensorType::Wind, 0)
        .with_field(direction_name, direction)
        .with_field(speed_name, speed))
}

fn recommended_minimum(fields: &Fields<'_>) -> DecodedRecord {
    let valid = status_ok(fields, 2);
    let gate = |value: Option<f64>| value.filter(|_| valid);
    DecodedRecord::new(RecordKind::Position, SensorType::Gps, 0)
        .with_field("latitude", gate(fields.latitude(3, 4)))
        .with_field("longitude", gate(fields.longitude(5, 6)))
        .with_field("speedOverGround", gate(fields.number(7).map(|knots| knots * KNOT)))
        .with_field("courseOverGround", gate(fields.number(8).map(normalize_degrees)))
        .with_field("magneticVariation", gate(fields.east_west(10, 11)))
}

fn fix(fields: &Fields<'_>) -> DecodedRecord {
    let quality = fields.integer(6, 10);
    let has_fix = quality.is_some_and(|q| q > 0);
    let gate = |value: Option<f64>| value.filter(|_| has_fix);
    DecodedRecord::new(RecordKind::GnssFix, SensorType::Gps, 0)
        .with_field("latitude", gate(fields.latitude(2, 3)))
        .with_field("longitude", gate(fields.longitude(4, 5)))
        .with_field("fixQuality", quality.map(f64::from))
        .with_field("numberOfSatellites", fields.integer(7, 10).map(f64::from))
        .with_field("horizontalDilutionOfPrecision", fields.number(8))
        .with_field("altitude", gate(with_unit(fields, 9, 'M')))
}

fn geographic_position(fields: &Fields<'_>) -> DecodedRecord {
    let valid = status_ok(fields, 6);
    DecodedRecord::new(RecordKind::Position, SensorType::Gps, 0)
        .with_field("latitude", fields.latitude(1, 2).filter(|_| valid))
        .with_field("longitude", fields.longitude(3, 4).filter(|_| valid))
}

fn heading_deviation_variation(fields: &Fields<'_>) -> DecodedRecord {
    let sensor = fields.number(1);
    let deviation = fields.east_west(2, 3);
    let variation = fields.east_west(4, 5);

    // Sensor heading corrected for deviation is magnetic; adding variation gives true
    let magnetic = sensor.map(|raw| normalize_degrees(raw + deviation.unwrap_or(0.0)));
    let true_heading = magnetic.zip(variation).map(|(m, v)| normalize_degrees(m + v));

    DecodedRecord::new(RecordKind::Heading, SensorType::Compass, 0)
        .with_field("magneticHeading", magnetic)
        .with_field("heading", magnetic)
        .with_field("deviation", deviation)
        .with_field("variation", variation)
        .with_field("trueHeading", true_heading)
}

fn true_heading(fields: &Fields<'_>) -> DecodedRecord {
    let heading = with_unit(fields, 1, 'T').map(normalize_degrees);
    DecodedRecord::new(RecordKind::Heading, SensorType::Compass, 0)
        .with_field("trueHeading", heading)
        .with_field("heading", heading)
}

fn magnetic_heading(fields: &Fields<'_>) -> DecodedRecord {
    DecodedRecord::new(RecordKind::Heading, SensorType::Compass, 0)
        .with_field("magneticHeading", with_unit(fields, 1, 'M').map(normalize_degrees))
}

fn rate_of_turn(fields: &Fields<'_>) -> DecodedRecord {
    let valid = status_ok(fields, 2);
    let degrees_per_second = fields.number(1).map(|per_minute| per_minute / 60.0);
    DecodedRecord::new(RecordKind::RateOfTurn, SensorType::Compass, 0)
        .with_field("rateOfTurn", degrees_per_second.filter(|_| valid))
}

fn water_temperature(fields: &Fields<'_>) -> DecodedRecord {
    let celsius = fields.number(1).and_then(|raw| match fields.flag(2)? {
        'C' => Some(raw),
        'F' => Some((raw - 32.0) * 5.0 / 9.0),
        _ => None,
    });
    DecodedRecord::new(RecordKind::Temperature, SensorType::Temperature, 0)
        .with_field("value", celsius)
}

fn revolutions(fields: &Fields<'_>) -> DecodedRecord {
    let number = fields.integer(2, 10).and_then(|n| u8::try_from(n).ok()).unwrap_or(0);
    let valid = status_ok(fields, 5);
    let rpm = fields.number(3).filter(|_| valid);

    let mut record = DecodedRecord::new(RecordKind::Engine, SensorType::Engine, number);
    match fields.flag(1) {
        Some('S') => record.push_field("shaftRpm", rpm),
        _ => record.push_field("rpm", rpm),
    }
    record
}

/// Each quadruplet stands alone; one without a type is skipped.
fn transducers(fields: &Fields<'_>) -> DecodedRecord {
    let mut record = DecodedRecord::new(RecordKind::Transducer, SensorType::Weather, 0);
    let mut index = 1;
    while fields.text(index).is_some() || fields.text(index + 3).is_some() {
        transducer(fields, index, &mut record);
        index += 4;
    }
    record
}

fn transducer(fields: &Fields<'_>, index: usize, record: &mut DecodedRecord) {
    let Some(kind) = fields.flag(index) else {
        tracing::trace!(field = index, name = fields.text(index + 3), "Skipping transducer without a type");
        return;
    };
    let value = fields.number(index + 1);
    let unit = fields.flag(index + 2);
    let name = fields.text(index + 3).unwrap_or("").to_ascii_uppercase();
    let instance = trailing_instance(&name);
    let named = |prefix: &str| name.starts_with(prefix);

    match kind {
        'C' => {
            let celsius = match unit {
                Some('C') => value,
                Some('F') => value.map(|f| (f - 32.0) * 5.0 / 9.0),
                Some('K') => value.map(|k| k - 273.15),
                _ => None,
            };
            if named("WATER") || named("SEA") {
                record.push_targeted(SensorType::Temperature, instance, "value", celsius);
            } else if named("BAT") {
                record.push_targeted(SensorType::Battery, instance, "temperature", celsius);
            } else if named("ENG") {
                record.push_targeted(SensorType::Engine, instance, "coolantTemp", celsius);
            } else {
                record.push_targeted(SensorType::Weather, instance, "airTemperature", celsius);
            }
        }
        'P' => {
            let pascals = match unit {
                Some('B') => value.map(|bar| bar * 100_000.0),
                Some('P') => value,
                _ => None,
            };
            if named("OIL") || named("ENG") {
                record.push_targeted(SensorType::Engine, instance, "oilPressure", pascals);
            } else {
                record.push_targeted(SensorType::Weather, instance, "barometricPressure", pascals);
            }
        }
        'H' => {
            let percent = value.filter(|_| unit == Some('P'));
            record.push_targeted(SensorType::Weather, instance, "humidity", percent);
        }
        'U' => {
            let volts = value.filter(|_| unit == Some('V'));
            if named("ALT") {
                record.push_targeted(SensorType::Engine, instance, "alternatorVoltage", volts);
            } else {
                record.push_targeted(SensorType::Battery, instance, "voltage", volts);
            }
        }
        'I' => {
            let amps = value.filter(|_| unit == Some('A'));
            record.push_targeted(SensorType::Battery, instance, "current", amps);
        }
        'T' => {
            let rpm = value.filter(|_| unit == Some('R'));
            record.push_targeted(SensorType::Engine, instance, "rpm", rpm);
        }
        'V' => {
            let percent = value.filter(|_| unit == Some('P'));
            record.push_targeted(SensorType::Tank, instance, "level", percent);
        }
        other => {
            tracing::trace!(kind = %other, name, "Ignoring unsupported transducer type");
        }
    }
}
