//! ASCII sentence decoder.
//!
//! A sentence is `$` or `!`, an address field, comma-separated data fields,
//! and an optional `*hh` checksum over everything between the marker and
//! the `*`. The last three characters of the address select the formatter;
//! the leading talker identifier is ignored.
//!
//! ```rust
//! use bridgewatch::sentence::SentenceDecoder;
//! use bridgewatch::types::SensorType;
//!
//! let decoder = SentenceDecoder::default();
//! let record = decoder
//!     .decode_str("$IIDBT,036.41,f,011.10,M,005.99,F*25")
//!     .unwrap()
//!     .into_record()
//!     .unwrap();
//!
//! assert_eq!(record.sensor, SensorType::Depth);
//! assert_eq!(record.field("depth"), Some(11.10));
//! ```

pub mod checksum;
mod fields;
mod parsers;

pub use parsers::SUPPORTED;

use tracing::trace;

use crate::types::Decoded;
use crate::{Result, TelemetryError};
use fields::Fields;

/// Stateless sentence decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceDecoder {
    require_checksum: bool,
}

impl Default for SentenceDecoder {
    fn default() -> Self {
        Self { require_checksum: true }
    }
}

impl SentenceDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept sentences without a `*hh` suffix when `require` is false.
    ///
    /// A checksum that is present is always verified.
    pub fn with_require_checksum(mut self, require: bool) -> Self {
        self.require_checksum = require;
        self
    }

    pub fn requires_checksum(&self) -> bool {
        self.require_checksum
    }

    /// Decode one sentence, line terminator optional.
    pub fn decode(&self, line: &[u8]) -> Result<Decoded> {
        let line = trim_line_end(line);
        let body = checksum::verify(line, self.require_checksum)?;
        let body = std::str::from_utf8(body)
            .map_err(|e| TelemetryError::format("sentence", format!("not ASCII: {e}")))?;
        if !body.is_ascii() {
            return Err(TelemetryError::format("sentence", "not ASCII"));
        }

        let fields = Fields::split(body);
        let address = fields.address();
        if address.len() < 3 || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TelemetryError::format(
                "sentence",
                format!("invalid address field {address:?}"),
            ));
        }

        // Proprietary sentences carry a manufacturer code rather than a formatter
        if address.starts_with('P') {
            trace!(address, "Proprietary sentence");
            return Ok(Decoded::Unrecognized { identifier: address.to_string() });
        }

        let formatter = &address[address.len() - 3..];
        match parsers::decode(formatter, &fields)? {
            Some(record) => Ok(Decoded::Record(record)),
            None => {
                trace!(address, "Unsupported formatter");
                Ok(Decoded::Unrecognized { identifier: address.to_string() })
            }
        }
    }

    pub fn decode_str(&self, line: &str) -> Result<Decoded> {
        self.decode(line.as_bytes())
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line.iter().rposition(|b| !matches!(b, b'\r' | b'\n')).map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sentence;
    use crate::types::{DecodedRecord, RecordKind, SensorType};
    use proptest::prelude::*;

    fn record(line: &str) -> DecodedRecord {
        SentenceDecoder::default()
            .decode_str(line)
            .unwrap_or_else(|e| panic!("{line}: {e}"))
            .into_record()
            .unwrap_or_else(|| panic!("{line} was not recognized"))
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap_or_else(|| panic!("expected {expected}, field absent"));
        assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
    }

    #[test]
    fn depth_below_transducer() {
        let rec = record("$IIDBT,036.41,f,011.10,M,005.99,F*25\r\n");
        assert_eq!(rec.kind, RecordKind::Depth);
        assert_eq!(rec.instance, 0);
        assert_eq!(rec.field("depth"), Some(11.10));
    }

    #[test]
    fn depth_falls_back_to_feet() {
        let rec = record(&sentence("SDDBT,10.0,f,,M,,F"));
        approx(rec.field("depth"), 3.048);
    }

    #[test]
    fn empty_depth_is_absent() {
        let rec = record(&sentence("SDDBT,,f,,M,,F"));
        assert_eq!(rec.field("depth"), None);
        assert_eq!(rec.metrics().count(), 0);
    }

    #[test]
    fn depth_with_offset() {
        let rec = record(&sentence("SDDPT,4.5,-0.3,100"));
        assert_eq!(rec.field("depth"), Some(4.5));
        assert_eq!(rec.field("offset"), Some(-0.3));
    }

    #[test]
    fn water_speed_in_knots() {
        let rec = record(&sentence("VWVHW,,T,,M,6.0,N,11.1,K"));
        assert_eq!(rec.sensor, SensorType::Speed);
        approx(rec.field("throughWater"), 6.0 * 1852.0 / 3600.0);
    }

    #[test]
    fn course_over_ground_mode_not_valid() {
        let rec = record(&sentence("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,N"));
        assert_eq!(rec.valid_count(), 0);

        let rec = record(&sentence("GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,A"));
        approx(rec.field("courseOverGround"), 54.7);
        approx(rec.field("speedOverGround"), 5.5 * 1852.0 / 3600.0);
    }

    #[test]
    fn wind_relative_and_true() {
        let rec = record(&sentence("WIMWV,045.0,R,10.0,N,A"));
        approx(rec.field("apparentDirection"), 45.0);
        approx(rec.field("apparentSpeed"), 10.0 * 1852.0 / 3600.0);

        let rec = record(&sentence("WIMWV,370.0,T,5.0,M,A"));
        approx(rec.field("trueDirection"), 10.0);
        assert_eq!(rec.field("trueSpeed"), Some(5.0));
    }

    #[test]
    fn wind_void_status_keeps_fields_absent() {
        let rec = record(&sentence("WIMWV,045.0,R,10.0,N,V"));
        assert_eq!(rec.kind, RecordKind::Wind);
        assert_eq!(rec.valid_count(), 0);
    }

    #[test]
    fn wind_with_bad_reference_is_a_format_error() {
        let result = SentenceDecoder::default().decode_str(&sentence("WIMWV,045.0,X,10.0,N,A"));
        assert!(matches!(result, Err(TelemetryError::Format { .. })));
    }

    #[test]
    fn recommended_minimum_position() {
        let rec = record(&sentence(
            "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W",
        ));
        approx(rec.field("latitude"), 48.1173);
        approx(rec.field("longitude"), 11.516_666_666);
        approx(rec.field("speedOverGround"), 22.4 * 1852.0 / 3600.0);
        approx(rec.field("courseOverGround"), 84.4);
        approx(rec.field("magneticVariation"), -3.1);
    }

    #[test]
    fn recommended_minimum_void_is_absent() {
        let rec = record(&sentence("GPRMC,123519,V,4807.038,N,01131.000,E,022.4,084.4,230394,,"));
        assert_eq!(rec.valid_count(), 0);
    }

    #[test]
    fn fix_data() {
        let rec = record(&sentence(
            "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,",
        ));
        approx(rec.field("latitude"), 48.1173);
        assert_eq!(rec.field("fixQuality"), Some(1.0));
        assert_eq!(rec.field("numberOfSatellites"), Some(8.0));
        assert_eq!(rec.field("horizontalDilutionOfPrecision"), Some(0.9));
        assert_eq!(rec.field("altitude"), Some(545.4));
    }

    #[test]
    fn fix_without_quality_has_no_position() {
        let rec = record(&sentence("GPGGA,123519,4807.038,N,01131.000,E,0,00,,,M,,M,,"));
        assert_eq!(rec.field("latitude"), None);
        assert_eq!(rec.field("fixQuality"), Some(0.0));
    }

    #[test]
    fn geographic_position_status() {
        let rec = record(&sentence("GPGLL,4916.45,N,12311.12,W,225444,A"));
        approx(rec.field("longitude"), -123.185_333_333);

        let rec = record(&sentence("GPGLL,4916.45,N,12311.12,W,225444,V"));
        assert_eq!(rec.valid_count(), 0);
    }

    #[test]
    fn heading_with_deviation_and_variation() {
        let rec = record(&sentence("HCHDG,355.0,2.0,E,10.0,E"));
        approx(rec.field("magneticHeading"), 357.0);
        approx(rec.field("deviation"), 2.0);
        approx(rec.field("variation"), 10.0);
        approx(rec.field("trueHeading"), 7.0);
    }

    #[test]
    fn true_and_magnetic_heading() {
        let rec = record(&sentence("HEHDT,274.07,T"));
        approx(rec.field("trueHeading"), 274.07);
        approx(rec.field("heading"), 274.07);

        let rec = record(&sentence("HCHDM,180.5,M"));
        approx(rec.field("magneticHeading"), 180.5);
    }

    #[test]
    fn rate_of_turn_per_second() {
        let rec = record(&sentence("TIROT,-30.0,A"));
        approx(rec.field("rateOfTurn"), -0.5);

        let rec = record(&sentence("TIROT,-30.0,V"));
        assert_eq!(rec.field("rateOfTurn"), None);
    }

    #[test]
    fn water_temperature_fahrenheit() {
        let rec = record(&sentence("YXMTW,68.0,F"));
        approx(rec.field("value"), 20.0);
    }

    #[test]
    fn engine_and_shaft_revolutions() {
        let rec = record(&sentence("ERRPM,E,2,1800.0,,A"));
        assert_eq!(rec.sensor, SensorType::Engine);
        assert_eq!(rec.instance, 2);
        assert_eq!(rec.field("rpm"), Some(1800.0));

        let rec = record(&sentence("ERRPM,S,1,950.0,,A"));
        assert_eq!(rec.field("shaftRpm"), Some(950.0));
    }

    #[test]
    fn transducer_measurements_route_by_name() {
        let rec = record(&sentence(
            "IIXDR,P,1.0132,B,Barometer,C,21.5,C,AIR,U,12.7,V,BAT2,V,55.0,P,FUEL1",
        ));
        let keys: Vec<String> = rec.metrics().map(|(key, _)| key.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "weather/0/barometricPressure",
                "weather/0/airTemperature",
                "battery/2/voltage",
                "tank/1/level",
            ]
        );
        approx(rec.field("barometricPressure"), 101_320.0);
    }

    #[test]
    fn transducer_without_type_is_skipped() {
        let rec = record(&sentence("IIXDR,U,12.7,V,BAT2,,1.0,C,AIR,C,19.0,C,WATER"));
        let metrics: Vec<(String, f64)> =
            rec.metrics().map(|(key, value)| (key.to_string(), value)).collect();
        assert_eq!(
            metrics,
            vec![("battery/2/voltage".to_string(), 12.7), ("temperature/0/value".to_string(), 19.0)]
        );
    }

    #[test]
    fn proprietary_and_unknown_formatters_are_unrecognized() {
        let decoder = SentenceDecoder::default();
        let proprietary = decoder.decode_str(&sentence("PGRME,15.0,M,45.0,M,25.0,M")).unwrap();
        assert_eq!(proprietary, Decoded::Unrecognized { identifier: "PGRME".into() });

        let unknown = decoder.decode_str(&sentence("GPZDA,201530.00,04,07,2002,00,00")).unwrap();
        assert_eq!(unknown, Decoded::Unrecognized { identifier: "GPZDA".into() });
    }

    #[test]
    fn short_address_is_a_format_error() {
        let result = SentenceDecoder::default().decode_str(&sentence("DB,1.0"));
        assert!(matches!(result, Err(TelemetryError::Format { .. })));
    }

    #[test]
    fn optional_checksum() {
        let strict = SentenceDecoder::default();
        assert!(strict.decode_str("$SDDPT,4.5,0.0").is_err());

        let lenient = strict.with_require_checksum(false);
        let rec = lenient.decode_str("$SDDPT,4.5,0.0").unwrap().into_record().unwrap();
        assert_eq!(rec.field("depth"), Some(4.5));
    }

    #[test]
    fn malformed_number_is_absent_not_an_error() {
        let rec = record(&sentence("SDDPT,4.x5,0.0"));
        assert_eq!(rec.field("depth"), None);
        assert_eq!(rec.field("offset"), Some(0.0));
    }

    proptest! {
        // Flipping bit 5 of a hex letter in the checksum only changes its
        // case, which the case-insensitive comparison accepts.
        #[test]
        fn prop_single_bit_flip_is_rejected(index in 0usize..64, bit in 0u8..8) {
            let line = "$IIDBT,036.41,f,011.10,M,005.99,F*25";
            let mut bytes = line.as_bytes().to_vec();
            let index = index % bytes.len();
            let original = bytes[index];
            bytes[index] ^= 1 << bit;

            let in_checksum = index > line.len() - 3;
            let case_toggle = bit == 5
                && original.is_ascii_alphabetic()
                && bytes[index].eq_ignore_ascii_case(&original);
            prop_assume!(!(in_checksum && case_toggle));

            prop_assert!(SentenceDecoder::default().decode(&bytes).is_err());
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..96)) {
            let _ = SentenceDecoder::default().decode(&bytes);
        }

        #[test]
        fn prop_depth_round_trips_through_text(meters in 0.0f64..10_000.0) {
            let line = sentence(&format!("SDDBT,,f,{meters:.2},M,,F"));
            let rec = record(&line);
            let parsed = rec.field("depth").unwrap();
            prop_assert!((parsed - meters).abs() <= 0.005 + 1e-9);
        }
    }
}
