//! End-to-end decoding: bytes in, stored and enriched values out.

use bridgewatch::frame;
use bridgewatch::sentence::checksum;
use bridgewatch::transport::{FRAME_START, UnitCodec, WireProtocol};
use bridgewatch::{
    Bridgewatch, CoreConfig, MetricKey, RouteOutcome, SensorType, StatKind, Timestamp,
    TransportKind,
};
use bytes::BytesMut;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::codec::Decoder;

fn key(sensor: SensorType, instance: u8, field: &'static str) -> MetricKey {
    MetricKey::new(sensor, instance, field)
}

fn checksummed(body: &str) -> String {
    format!("${body}*{:02X}", checksum::compute(body.as_bytes()))
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-6, "expected {expected}, got {actual}");
}

#[test]
fn depth_sentence_end_to_end() {
    let core = Bridgewatch::new(CoreConfig::default()).unwrap();
    let outcome = core.ingest_sentence(
        "$IIDBT,036.41,f,011.10,M,005.99,F*25",
        Timestamp::from_millis(10_000),
    );
    assert_eq!(outcome, RouteOutcome::Stored { fields: 1 });

    let depth = key(SensorType::Depth, 0, "depth");
    let record = core.store().read(&depth).unwrap();
    assert_eq!(record.current_si_value, 11.10);
    assert_eq!(record.last_update, Timestamp::from_millis(10_000));

    let display = core.store().display(&depth).unwrap();
    assert_eq!(display.mnemonic, "DPT");
    assert_eq!(display.enriched.formatted_value_with_unit, "11.1 m");
}

#[test]
fn battery_frame_end_to_end() {
    // PGN 127508 instance 2: 12.60 V, -3.0 A, 298.15 K
    let data = frame::encode(127_508, 17, &[2, 0xEC, 0x04, 0xE2, 0xFF, 0x77, 0x74, 0x00]);
    let mut wire = BytesMut::new();
    wire.extend_from_slice(b"\x00\x00");
    wire.extend_from_slice(&[FRAME_START, data.len() as u8]);
    wire.extend_from_slice(&data);

    let mut codec = UnitCodec::new(WireProtocol::Frame, TransportKind::Stream, 1_024);
    let unit = codec.decode(&mut wire).unwrap().expect("one complete frame");
    assert_eq!(unit.as_bytes(), data.as_slice());

    let core = Bridgewatch::new(CoreConfig::default()).unwrap();
    assert_eq!(core.ingest(&unit), RouteOutcome::Stored { fields: 3 });

    let store = core.store();
    assert_close(store.read(&key(SensorType::Battery, 2, "voltage")).unwrap().current_si_value, 12.60);
    assert_close(store.read(&key(SensorType::Battery, 2, "current")).unwrap().current_si_value, -3.0);
    assert_close(
        store.read(&key(SensorType::Battery, 2, "temperature")).unwrap().current_si_value,
        25.0,
    );
    assert!(store.read(&key(SensorType::Battery, 0, "voltage")).is_none());
}

#[test]
fn harbor_capture_replay() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data/captures/harbor.nmea");
    let capture = std::fs::read(&path).unwrap();

    let mut codec = UnitCodec::new(WireProtocol::Sentence, TransportKind::Stream, 1_024);
    let mut buffer = BytesMut::from(capture.as_slice());
    let core = Bridgewatch::new(CoreConfig::default()).unwrap();
    let mut at = 1_000;
    while let Some(unit) = codec.decode_eof(&mut buffer).unwrap() {
        let mut unit = unit;
        unit.received_at = Timestamp::from_millis(at);
        core.ingest(&unit);
        at += 100;
    }

    let stats = core.router_stats();
    assert_eq!(stats.units, 18);
    assert_eq!(stats.unrecognized, 1);
    assert_eq!(stats.checksum_failures, 0);
    assert_eq!(stats.format_errors, 0);

    let store = core.store();
    let value = |k: MetricKey| store.read(&k).unwrap().current_si_value;
    assert_close(value(key(SensorType::Depth, 0, "depth")), 11.10);
    assert_close(value(key(SensorType::Gps, 0, "latitude")), 48.0 + 7.038 / 60.0);
    assert_close(value(key(SensorType::Gps, 0, "numberOfSatellites")), 8.0);
    assert_close(value(key(SensorType::Compass, 0, "trueHeading")), 274.0);
    assert_close(value(key(SensorType::Compass, 0, "magneticHeading")), 272.0);
    assert_close(value(key(SensorType::Compass, 0, "rateOfTurn")), -0.2);
    assert_close(value(key(SensorType::Wind, 0, "apparentSpeed")), 12.4 * 1852.0 / 3600.0);
    assert_close(value(key(SensorType::Engine, 1, "rpm")), 2200.0);
    assert_close(value(key(SensorType::Weather, 0, "barometricPressure")), 101_320.0);
    assert_close(value(key(SensorType::Battery, 1, "voltage")), 12.7);

    // RMC, GGA and GLL each wrote a latitude
    let history = store.history(&key(SensorType::Gps, 0, "latitude"), Duration::from_secs(60));
    assert_eq!(history.len(), 3);
    let sog = store.derived_stat(
        &key(SensorType::Gps, 0, "speedOverGround"),
        StatKind::Max,
        Duration::from_secs(60),
    );
    assert_close(sog.unwrap(), 22.4 * 1852.0 / 3600.0);
}

#[test]
fn corrupted_checksum_never_reaches_the_store() {
    let core = Bridgewatch::new(CoreConfig::default()).unwrap();
    let line = checksummed("IIMTW,18.5,C");
    let corrupted = line.replace("18.5", "19.5");

    assert_eq!(core.ingest_sentence(&corrupted, Timestamp::from_millis(1)), RouteOutcome::Rejected);
    assert!(core.store().is_empty());
    assert_eq!(core.router_stats().checksum_failures, 1);

    core.ingest_sentence(&line, Timestamp::from_millis(2));
    assert_close(
        core.store().read(&key(SensorType::Temperature, 0, "value")).unwrap().current_si_value,
        18.5,
    );
}
