//! TypeScript Generation Tests
//!
//! Validates that the types a display layer consumes can be exported to
//! TypeScript when the tauri feature is enabled.

#[cfg(feature = "tauri")]
#[test]
fn test_core_types_implement_specta_type() {
    use specta::Type;

    // If this compiles, all types are properly configured for TypeScript export.
    fn assert_type<T: Type>() {}

    // Store snapshots
    assert_type::<bridgewatch::MetricKey>();
    assert_type::<bridgewatch::MetricRecord>();
    assert_type::<bridgewatch::MetricUpdate>();
    assert_type::<bridgewatch::DisplayValue>();
    assert_type::<bridgewatch::EnrichedValue>();
    assert_type::<bridgewatch::History>();
    assert_type::<bridgewatch::UpdateRate>();

    // Alarms
    assert_type::<bridgewatch::AlarmState>();
    assert_type::<bridgewatch::AlarmEvent>();
    assert_type::<bridgewatch::ThresholdConfig>();

    // Connection
    assert_type::<bridgewatch::ConnectionStatus>();
    assert_type::<bridgewatch::Endpoint>();
    assert_type::<bridgewatch::RouterStats>();
    assert_type::<bridgewatch::transport::TransportStatsSnapshot>();
}

#[cfg(not(feature = "tauri"))]
#[test]
fn test_tauri_feature_disabled() {
    // Types still compile without specta::Type when the feature is off
    let _ = bridgewatch::UpdateRate::Native;
    let _ = bridgewatch::ConnectionStatus::default();
}
