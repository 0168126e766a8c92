//! Unit categories, display units and the conversion table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Physical quantity a metric measures; selects the applicable units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum UnitCategory {
    Depth,
    BoatSpeed,
    WindSpeed,
    Angle,
    AngularRate,
    Temperature,
    Pressure,
    Voltage,
    Current,
    RotationalSpeed,
    Percentage,
    Volume,
    FlowRate,
    Duration,
    Latitude,
    Longitude,
    Count,
    Dimensionless,
}

/// A display unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Unit {
    Meter,
    Foot,
    Fathom,
    MeterPerSecond,
    Knot,
    KilometerPerHour,
    MilePerHour,
    Degree,
    Radian,
    DegreePerSecond,
    DegreePerMinute,
    Celsius,
    Fahrenheit,
    Kelvin,
    Pascal,
    Hectopascal,
    Kilopascal,
    Bar,
    Psi,
    InchOfMercury,
    Volt,
    Ampere,
    Rpm,
    Hertz,
    Percent,
    Liter,
    UsGallon,
    ImperialGallon,
    LiterPerHour,
    UsGallonPerHour,
    Second,
    Hour,
    DecimalDegrees,
    DegreesMinutes,
    DegreesMinutesSeconds,
    Count,
    Ratio,
}

impl Unit {
    /// Symbol appended to formatted values; empty for unitless values.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Unit::Meter => "m",
            Unit::Foot => "ft",
            Unit::Fathom => "ftm",
            Unit::MeterPerSecond => "m/s",
            Unit::Knot => "kn",
            Unit::KilometerPerHour => "km/h",
            Unit::MilePerHour => "mph",
            Unit::Degree => "°",
            Unit::Radian => "rad",
            Unit::DegreePerSecond => "°/s",
            Unit::DegreePerMinute => "°/min",
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
            Unit::Kelvin => "K",
            Unit::Pascal => "Pa",
            Unit::Hectopascal => "hPa",
            Unit::Kilopascal => "kPa",
            Unit::Bar => "bar",
            Unit::Psi => "psi",
            Unit::InchOfMercury => "inHg",
            Unit::Volt => "V",
            Unit::Ampere => "A",
            Unit::Rpm => "rpm",
            Unit::Hertz => "Hz",
            Unit::Percent => "%",
            Unit::Liter => "L",
            Unit::UsGallon => "gal",
            Unit::ImperialGallon => "imp gal",
            Unit::LiterPerHour => "L/h",
            Unit::UsGallonPerHour => "gal/h",
            Unit::Second => "s",
            Unit::Hour => "h",
            Unit::DecimalDegrees
            | Unit::DegreesMinutes
            | Unit::DegreesMinutesSeconds
            | Unit::Count
            | Unit::Ratio => "",
        }
    }
}

impl UnitCategory {
    /// Units applicable to this category, canonical unit first.
    pub const fn units(&self) -> &'static [Unit] {
        match self {
            UnitCategory::Depth => &[Unit::Meter, Unit::Foot, Unit::Fathom],
            UnitCategory::BoatSpeed | UnitCategory::WindSpeed => {
                &[Unit::MeterPerSecond, Unit::Knot, Unit::KilometerPerHour, Unit::MilePerHour]
            }
            UnitCategory::Angle => &[Unit::Degree, Unit::Radian],
            UnitCategory::AngularRate => &[Unit::DegreePerSecond, Unit::DegreePerMinute],
            UnitCategory::Temperature => &[Unit::Celsius, Unit::Fahrenheit, Unit::Kelvin],
            UnitCategory::Pressure => &[
                Unit::Pascal,
                Unit::Hectopascal,
                Unit::Kilopascal,
                Unit::Bar,
                Unit::Psi,
                Unit::InchOfMercury,
            ],
            UnitCategory::Voltage => &[Unit::Volt],
            UnitCategory::Current => &[Unit::Ampere],
            UnitCategory::RotationalSpeed => &[Unit::Rpm, Unit::Hertz],
            UnitCategory::Percentage => &[Unit::Percent],
            UnitCategory::Volume => &[Unit::Liter, Unit::UsGallon, Unit::ImperialGallon],
            UnitCategory::FlowRate => &[Unit::LiterPerHour, Unit::UsGallonPerHour],
            UnitCategory::Duration => &[Unit::Second, Unit::Hour],
            UnitCategory::Latitude | UnitCategory::Longitude => {
                &[Unit::DecimalDegrees, Unit::DegreesMinutes, Unit::DegreesMinutesSeconds]
            }
            UnitCategory::Count => &[Unit::Count],
            UnitCategory::Dimensionless => &[Unit::Ratio],
        }
    }

    /// Unit the decoders deliver values in.
    pub const fn base_unit(&self) -> Unit {
        self.units()[0]
    }

    /// Unit shown when the user has not chosen one.
    pub const fn default_unit(&self) -> Unit {
        match self {
            UnitCategory::BoatSpeed | UnitCategory::WindSpeed => Unit::Knot,
            UnitCategory::AngularRate => Unit::DegreePerMinute,
            UnitCategory::Pressure => Unit::Hectopascal,
            UnitCategory::Duration => Unit::Hour,
            UnitCategory::Latitude | UnitCategory::Longitude => Unit::DegreesMinutes,
            other => other.base_unit(),
        }
    }

    pub fn accepts(&self, unit: Unit) -> bool {
        self.units().contains(&unit)
    }
}

/// Linear conversion from the canonical unit: `display = si * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    pub offset: f64,
    /// Decimal places used when formatting
    pub decimals: usize,
}

impl Conversion {
    pub const fn scale(factor: f64, decimals: usize) -> Self {
        Self { factor, offset: 0.0, decimals }
    }

    pub fn apply(&self, si_value: f64) -> f64 {
        si_value * self.factor + self.offset
    }
}

/// Conversion-factor table keyed by unit.
///
/// Constructed once and handed to whatever builds the enricher; tests can
/// swap individual entries with [`UnitRegistry::with_conversion`].
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    conversions: HashMap<Unit, Conversion>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl UnitRegistry {
    /// Registry with the standard marine conversions.
    pub fn standard() -> Self {
        let table = [
            (Unit::Meter, Conversion::scale(1.0, 1)),
            (Unit::Foot, Conversion::scale(1.0 / 0.3048, 1)),
            (Unit::Fathom, Conversion::scale(1.0 / 1.8288, 1)),
            (Unit::MeterPerSecond, Conversion::scale(1.0, 1)),
            (Unit::Knot, Conversion::scale(3600.0 / 1852.0, 1)),
            (Unit::KilometerPerHour, Conversion::scale(3.6, 1)),
            (Unit::MilePerHour, Conversion::scale(3600.0 / 1609.344, 1)),
            (Unit::Degree, Conversion::scale(1.0, 0)),
            (Unit::Radian, Conversion::scale(PI / 180.0, 3)),
            (Unit::DegreePerSecond, Conversion::scale(1.0, 1)),
            (Unit::DegreePerMinute, Conversion::scale(60.0, 0)),
            (Unit::Celsius, Conversion::scale(1.0, 1)),
            (Unit::Fahrenheit, Conversion { factor: 1.8, offset: 32.0, decimals: 1 }),
            (Unit::Kelvin, Conversion { factor: 1.0, offset: 273.15, decimals: 1 }),
            (Unit::Pascal, Conversion::scale(1.0, 0)),
            (Unit::Hectopascal, Conversion::scale(0.01, 1)),
            (Unit::Kilopascal, Conversion::scale(0.001, 1)),
            (Unit::Bar, Conversion::scale(1e-5, 3)),
            (Unit::Psi, Conversion::scale(1.0 / 6894.757_293_168, 1)),
            (Unit::InchOfMercury, Conversion::scale(1.0 / 3386.389, 2)),
            (Unit::Volt, Conversion::scale(1.0, 2)),
            (Unit::Ampere, Conversion::scale(1.0, 1)),
            (Unit::Rpm, Conversion::scale(1.0, 0)),
            (Unit::Hertz, Conversion::scale(1.0 / 60.0, 1)),
            (Unit::Percent, Conversion::scale(1.0, 0)),
            (Unit::Liter, Conversion::scale(1.0, 0)),
            (Unit::UsGallon, Conversion::scale(1.0 / 3.785_411_784, 1)),
            (Unit::ImperialGallon, Conversion::scale(1.0 / 4.546_09, 1)),
            (Unit::LiterPerHour, Conversion::scale(1.0, 1)),
            (Unit::UsGallonPerHour, Conversion::scale(1.0 / 3.785_411_784, 1)),
            (Unit::Second, Conversion::scale(1.0, 0)),
            (Unit::Hour, Conversion::scale(1.0 / 3600.0, 1)),
            (Unit::DecimalDegrees, Conversion::scale(1.0, 5)),
            (Unit::DegreesMinutes, Conversion::scale(1.0, 3)),
            (Unit::DegreesMinutesSeconds, Conversion::scale(1.0, 1)),
            (Unit::Count, Conversion::scale(1.0, 0)),
            (Unit::Ratio, Conversion::scale(1.0, 1)),
        ];

        Self { conversions: table.into_iter().collect() }
    }

    /// Replace the conversion for one unit.
    pub fn with_conversion(mut self, unit: Unit, conversion: Conversion) -> Self {
        self.conversions.insert(unit, conversion);
        self
    }

    pub fn conversion(&self, unit: Unit) -> Option<&Conversion> {
        self.conversions.get(&unit)
    }
}
