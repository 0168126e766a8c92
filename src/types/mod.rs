//! Core types shared by the decoders, the router and the metric store.
//!
//! ## Architecture
//!
//! - [`RawFrame`] is one reassembled protocol unit, shared via `Arc<[u8]>`
//! - [`DecodedRecord`] is the typed output of either decoder, canonical units
//! - [`MetricKey`] names one time series: `(sensor, instance, field)`
//! - [`Timestamp`] is a wall-clock millisecond instant
//! - [`UpdateRate`] controls how often a subscriber sees changes
//!
//! ## Usage Example
//!
//! ```rust
//! use bridgewatch::types::{DecodedRecord, MetricKey, RecordKind, SensorType};
//!
//! let record = DecodedRecord::new(RecordKind::Battery, SensorType::Battery, 2)
//!     .with_field("voltage", Some(12.6))
//!     .with_field("current", None);
//!
//! let metrics: Vec<_> = record.metrics().collect();
//! assert_eq!(metrics, vec![(MetricKey::new(SensorType::Battery, 2, "voltage"), 12.6)]);
//! ```

mod raw_frame;
mod record;
mod sensor;
mod timestamp;
mod update_rate;

pub use raw_frame::{ProtocolKind, RawFrame, TransportKind};
pub use record::{Decoded, DecodedRecord, FieldReading, RecordKind};
pub use sensor::{MetricKey, SensorType};
pub use timestamp::Timestamp;
pub use update_rate::UpdateRate;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    prop_compose! {
        fn arb_metric_key()(
            sensor in prop::sample::select(SensorType::ALL.to_vec()),
            instance in any::<u8>(),
            field in "[a-z][a-zA-Z]{0,20}",
        ) -> MetricKey {
            MetricKey::new(sensor, instance, field)
        }
    }

    proptest! {
        #[test]
        fn prop_metric_key_display_parses_back(key in arb_metric_key()) {
            let parsed: MetricKey = key.to_string().parse().unwrap();
            prop_assert_eq!(parsed, key);
        }

        #[test]
        fn prop_non_finite_fields_are_absent(value in prop::num::f64::ANY) {
            let record = DecodedRecord::new(RecordKind::Depth, SensorType::Depth, 0)
                .with_field("depth", Some(value));

            if value.is_finite() {
                prop_assert_eq!(record.field("depth"), Some(value));
                prop_assert_eq!(record.metrics().count(), 1);
            } else {
                prop_assert_eq!(record.field("depth"), None);
                prop_assert_eq!(record.metrics().count(), 0);
            }
        }

        #[test]
        fn prop_timestamp_arithmetic_saturates(millis in any::<u64>(), delta in any::<u32>()) {
            let ts = Timestamp::from_millis(millis);
            let delta = Duration::from_millis(u64::from(delta));

            prop_assert!(ts.saturating_add(delta) >= ts);
            prop_assert!(ts.saturating_sub(delta) <= ts);
            prop_assert!(ts.saturating_add(delta).duration_since(ts) <= delta);
        }
    }

    #[test]
    fn metric_key_rejects_malformed_strings() {
        assert!("depth/0".parse::<MetricKey>().is_err());
        assert!("depth/0/depth/extra".parse::<MetricKey>().is_err());
        assert!("sonar/0/depth".parse::<MetricKey>().is_err());
        assert!("depth/300/depth".parse::<MetricKey>().is_err());
        assert!("depth/0/".parse::<MetricKey>().is_err());
    }

    #[test]
    fn sensor_type_parsing_is_case_insensitive() {
        assert_eq!("Battery".parse::<SensorType>().unwrap(), SensorType::Battery);
        assert_eq!("GPS".parse::<SensorType>().unwrap(), SensorType::Gps);
    }

    #[test]
    fn targeted_fields_override_record_identity() {
        let mut record = DecodedRecord::new(RecordKind::Transducer, SensorType::Weather, 0);
        record.push_field("barometricPressure", Some(101_325.0));
        record.push_targeted(SensorType::Battery, 1, "voltage", Some(12.4));

        let keys: Vec<String> = record.metrics().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, vec!["weather/0/barometricPressure", "battery/1/voltage"]);
    }

    #[test]
    fn unrecognized_has_no_record() {
        let decoded = Decoded::Unrecognized { identifier: "PGRME".to_string() };
        assert!(decoded.into_record().is_none());
    }

    #[test]
    fn update_rate_interval() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).throttle_interval(), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn timestamp_duration_since_clamps_to_zero() {
        let earlier = Timestamp::from_millis(1_000);
        let later = Timestamp::from_millis(4_500);
        assert_eq!(later.duration_since(earlier), Duration::from_millis(3_500));
        assert_eq!(earlier.duration_since(later), Duration::ZERO);
    }
}
