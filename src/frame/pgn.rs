//! Parameter group table

use super::layout::{
    Convert as Cv, FieldLayout, InstanceSource, Reference, Width as W, field, referenced,
};
use crate::types::{RecordKind, SensorType};

/// Decoding recipe for one parameter group number.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PgnLayout {
    pub pgn: u32,
    pub name: &'static str,
    pub kind: RecordKind,
    pub sensor: SensorType,
    pub instance: InstanceSource,
    pub reference: Option<Reference>,
    pub fields: &'static [FieldLayout],
}

const RAD: f64 = 0.0001;

pub(crate) static LAYOUTS: &[PgnLayout] = &[
    PgnLayout {
        pgn: 127250,
        name: "Vessel Heading",
        kind: RecordKind::Heading,
        sensor: SensorType::Compass,
        instance: InstanceSource::Zero,
        reference: Some(Reference::Heading { offset: 7 }),
        fields: &[
            referenced("trueHeading", "magneticHeading", 1, W::U16, RAD, Cv::RadiansToBearing),
            field("deviation", 3, W::I16, RAD, Cv::RadiansToDegrees),
            field("variation", 5, W::I16, RAD, Cv::RadiansToDegrees),
        ],
    },
    PgnLayout {
        pgn: 127251,
        name: "Rate of Turn",
        kind: RecordKind::RateOfTurn,
        sensor: SensorType::Compass,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[field("rateOfTurn", 1, W::I32, 3.125e-8, Cv::RadiansPerSecondToDegrees)],
    },
    PgnLayout {
        pgn: 127488,
        name: "Engine Parameters, Rapid Update",
        kind: RecordKind::Engine,
        sensor: SensorType::Engine,
        instance: InstanceSource::Byte(0),
        reference: None,
        fields: &[
            field("rpm", 1, W::U16, 0.25, Cv::None),
            field("boostPressure", 3, W::U16, 100.0, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 127489,
        name: "Engine Parameters, Dynamic",
        kind: RecordKind::Engine,
        sensor: SensorType::Engine,
        instance: InstanceSource::Byte(0),
        reference: None,
        fields: &[
            field("oilPressure", 1, W::U16, 100.0, Cv::None),
            field("oilTemp", 3, W::U16, 0.1, Cv::KelvinToCelsius),
            field("coolantTemp", 5, W::U16, 0.01, Cv::KelvinToCelsius),
            field("alternatorVoltage", 7, W::I16, 0.01, Cv::None),
            field("fuelRate", 9, W::I16, 0.1, Cv::None),
            field("hours", 11, W::U32, 1.0, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 127505,
        name: "Fluid Level",
        kind: RecordKind::FluidLevel,
        sensor: SensorType::Tank,
        instance: InstanceSource::LowNibble(0),
        reference: None,
        fields: &[
            field("tankType", 0, W::HighNibble, 1.0, Cv::None),
            field("level", 1, W::I16, 0.004, Cv::None),
            field("capacity", 3, W::U32, 0.1, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 127506,
        name: "DC Detailed Status",
        kind: RecordKind::Battery,
        sensor: SensorType::Battery,
        instance: InstanceSource::Byte(1),
        reference: None,
        fields: &[
            field("stateOfCharge", 3, W::U8, 1.0, Cv::None),
            field("stateOfHealth", 4, W::U8, 1.0, Cv::None),
            field("timeRemaining", 5, W::U16, 60.0, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 127508,
        name: "Battery Status",
        kind: RecordKind::Battery,
        sensor: SensorType::Battery,
        instance: InstanceSource::Byte(0),
        reference: None,
        fields: &[
            field("voltage", 1, W::I16, 0.01, Cv::None),
            field("current", 3, W::I16, 0.1, Cv::None),
            field("temperature", 5, W::U16, 0.01, Cv::KelvinToCelsius),
        ],
    },
    PgnLayout {
        pgn: 128259,
        name: "Speed",
        kind: RecordKind::WaterSpeed,
        sensor: SensorType::Speed,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[
            field("throughWater", 1, W::U16, 0.01, Cv::None),
            field("overGround", 3, W::U16, 0.01, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 128267,
        name: "Water Depth",
        kind: RecordKind::Depth,
        sensor: SensorType::Depth,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[
            field("depth", 1, W::U32, 0.01, Cv::None),
            field("offset", 5, W::I16, 0.001, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 129025,
        name: "Position, Rapid Update",
        kind: RecordKind::Position,
        sensor: SensorType::Gps,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[
            field("latitude", 0, W::I32, 1e-7, Cv::None),
            field("longitude", 4, W::I32, 1e-7, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 129026,
        name: "COG & SOG, Rapid Update",
        kind: RecordKind::CourseOverGround,
        sensor: SensorType::Gps,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[
            field("courseOverGround", 2, W::U16, RAD, Cv::RadiansToBearing),
            field("speedOverGround", 4, W::U16, 0.01, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 130306,
        name: "Wind Data",
        kind: RecordKind::Wind,
        sensor: SensorType::Wind,
        instance: InstanceSource::Zero,
        reference: Some(Reference::Wind { offset: 5 }),
        fields: &[
            referenced("trueSpeed", "apparentSpeed", 1, W::U16, 0.01, Cv::None),
            referenced("trueDirection", "apparentDirection", 3, W::U16, RAD, Cv::RadiansToBearing),
        ],
    },
    PgnLayout {
        pgn: 130311,
        name: "Environmental Parameters",
        kind: RecordKind::Environment,
        sensor: SensorType::Weather,
        instance: InstanceSource::Zero,
        reference: None,
        fields: &[
            field("airTemperature", 2, W::U16, 0.01, Cv::KelvinToCelsius),
            field("humidity", 4, W::I16, 0.004, Cv::None),
            field("barometricPressure", 6, W::U16, 100.0, Cv::None),
        ],
    },
    PgnLayout {
        pgn: 130312,
        name: "Temperature",
        kind: RecordKind::Temperature,
        sensor: SensorType::Temperature,
        instance: InstanceSource::Byte(1),
        reference: None,
        fields: &[field("value", 3, W::U16, 0.01, Cv::KelvinToCelsius)],
    },
];

pub(crate) fn lookup(pgn: u32) -> Option<&'static PgnLayout> {
    LAYOUTS.iter().find(|layout| layout.pgn == pgn)
}
