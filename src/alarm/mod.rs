//! Threshold alarms with a hysteresis dead band.
//!
//! Each level (warning, critical) latches on its own. A latch is set when the
//! value reaches the threshold and released only once the value has moved
//! `hysteresis` past it in the clearing direction, so a value hovering inside
//! the band never toggles the level.
//!
//! | direction | enter      | clear                    |
//! |-----------|------------|--------------------------|
//! | `Above`   | `v >= t`   | `v < t` and `v <= t - h` |
//! | `Below`   | `v <= t`   | `v > t` and `v >= t + h` |
//!
//! [`evaluate`] is a pure function of the previous state, the value and the
//! configuration; there is no time component.
//!
//! ```rust
//! use bridgewatch::alarm::{evaluate, AlarmLevel, AlarmState, Direction, ThresholdConfig};
//!
//! let shallow = ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.5);
//! let mut state = AlarmState::default();
//! for depth in [6.0, 5.0, 4.8, 5.2, 4.9] {
//!     state = evaluate(&state, depth, &shallow);
//! }
//! assert_eq!(state.level, AlarmLevel::Warning);
//! assert_eq!(state.occurrence_id, 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{MetricKey, Timestamp};
use crate::{Result, TelemetryError};

/// Which side of the threshold is alarming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum Direction {
    Above,
    Below,
}

/// Alarm severity, ordered `Normal < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum AlarmLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

/// User-supplied thresholds for one metric, in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ThresholdConfig {
    pub critical: Option<f64>,
    pub warning: Option<f64>,
    pub direction: Direction,
    pub critical_hysteresis: f64,
    pub warning_hysteresis: f64,
    pub enabled: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::new(Direction::Above)
    }
}

impl ThresholdConfig {
    /// Enabled configuration with no levels set.
    pub fn new(direction: Direction) -> Self {
        Self {
            critical: None,
            warning: None,
            direction,
            critical_hysteresis: 0.0,
            warning_hysteresis: 0.0,
            enabled: true,
        }
    }

    pub fn with_warning(mut self, threshold: f64, hysteresis: f64) -> Self {
        self.warning = Some(threshold);
        self.warning_hysteresis = hysteresis;
        self
    }

    pub fn with_critical(mut self, threshold: f64, hysteresis: f64) -> Self {
        self.critical = Some(threshold);
        self.critical_hysteresis = hysteresis;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Reject non-finite values, negative hysteresis and inverted levels.
    pub fn validate(&self, key: &MetricKey) -> Result<()> {
        let invalid = |reason: String| Err(TelemetryError::threshold(key.to_string(), reason));

        for (name, threshold) in [("critical", self.critical), ("warning", self.warning)] {
            if threshold.is_some_and(|t| !t.is_finite()) {
                return invalid(format!("{name} threshold must be finite"));
            }
        }
        for (name, hysteresis) in
            [("critical", self.critical_hysteresis), ("warning", self.warning_hysteresis)]
        {
            if !hysteresis.is_finite() || hysteresis < 0.0 {
                return invalid(format!("{name} hysteresis must be finite and non-negative"));
            }
        }
        if let (Some(critical), Some(warning)) = (self.critical, self.warning) {
            let ordered = match self.direction {
                Direction::Above => critical >= warning,
                Direction::Below => critical <= warning,
            };
            if !ordered {
                return invalid(format!(
                    "critical {critical} must be beyond warning {warning} for {:?}",
                    self.direction
                ));
            }
        }
        Ok(())
    }
}

/// Alarm state for one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AlarmState {
    pub level: AlarmLevel,
    pub acknowledged: bool,

    /// Incremented on every escalation into a higher level
    pub occurrence_id: u64,

    warning_latched: bool,
    critical_latched: bool,
}

impl AlarmState {
    pub fn is_active(&self) -> bool {
        self.level != AlarmLevel::Normal
    }

    /// Mark the current occurrence as seen. Returns false when there is
    /// nothing to acknowledge. The level is unchanged.
    pub fn acknowledge(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.acknowledged = true;
        true
    }

    /// Back to `Normal`, keeping the occurrence counter monotonic.
    pub fn reset(&mut self) {
        *self = AlarmState { occurrence_id: self.occurrence_id, ..AlarmState::default() };
    }
}

/// Level or occurrence change published by the metric store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct AlarmEvent {
    pub key: MetricKey,
    pub previous: AlarmLevel,
    pub state: AlarmState,
    pub at: Timestamp,
}

fn latch(latched: bool, value: f64, threshold: Option<f64>, hysteresis: f64, direction: Direction) -> bool {
    let Some(t) = threshold else {
        return false;
    };
    // A latched level holds while the enter condition still holds
    match (direction, latched) {
        (Direction::Above, false) => value >= t,
        (Direction::Above, true) => value >= t || value > t - hysteresis,
        (Direction::Below, false) => value <= t,
        (Direction::Below, true) => value <= t || value < t + hysteresis,
    }
}

/// Next alarm state for `value`.
///
/// Non-finite values leave the state untouched. A disabled configuration
/// forces `Normal` and clears the acknowledgment.
pub fn evaluate(previous: &AlarmState, value: f64, config: &ThresholdConfig) -> AlarmState {
    if !value.is_finite() {
        return *previous;
    }

    let mut next = *previous;
    if !config.enabled {
        next.reset();
        return next;
    }

    next.critical_latched = latch(
        previous.critical_latched,
        value,
        config.critical,
        config.critical_hysteresis,
        config.direction,
    );
    next.warning_latched = latch(
        previous.warning_latched,
        value,
        config.warning,
        config.warning_hysteresis,
        config.direction,
    );

    next.level = if next.critical_latched {
        AlarmLevel::Critical
    } else if next.warning_latched {
        AlarmLevel::Warning
    } else {
        AlarmLevel::Normal
    };

    if next.level > previous.level {
        next.occurrence_id = previous.occurrence_id.wrapping_add(1);
        next.acknowledged = false;
    } else if next.level == AlarmLevel::Normal {
        next.acknowledged = false;
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorType;
    use proptest::prelude::*;

    fn run(config: &ThresholdConfig, values: &[f64]) -> Vec<AlarmState> {
        let mut state = AlarmState::default();
        values
            .iter()
            .map(|&v| {
                state = evaluate(&state, v, config);
                state
            })
            .collect()
    }

    fn levels(states: &[AlarmState]) -> Vec<AlarmLevel> {
        states.iter().map(|s| s.level).collect()
    }

    #[test]
    fn shallow_water_dead_band() {
        let config = ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.5);
        let states = run(&config, &[6.0, 5.0, 4.8, 5.2, 4.9, 5.5]);

        use AlarmLevel::*;
        assert_eq!(levels(&states), vec![Normal, Warning, Warning, Warning, Warning, Normal]);
        // Re-entering the band after 5.2 is the same occurrence
        assert_eq!(states[4].occurrence_id, 1);
    }

    #[test]
    fn zero_hysteresis_holds_at_threshold() {
        let config = ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.0);
        let states = run(&config, &[5.0, 5.0, 5.0, 5.0, 5.1]);

        use AlarmLevel::*;
        assert_eq!(levels(&states), vec![Warning, Warning, Warning, Warning, Normal]);
        assert!(states[..4].iter().all(|s| s.occurrence_id == 1));

        let config = ThresholdConfig::new(Direction::Above).with_critical(100.0, 0.0);
        let mut state = evaluate(&AlarmState::default(), 100.0, &config);
        assert!(state.acknowledge());
        for _ in 0..3 {
            state = evaluate(&state, 100.0, &config);
        }
        assert_eq!(state.level, Critical);
        assert_eq!(state.occurrence_id, 1);
        assert!(state.acknowledged);
    }

    #[test]
    fn above_direction_clears_below_band() {
        let config = ThresholdConfig::new(Direction::Above).with_warning(90.0, 2.0);
        let states = run(&config, &[85.0, 90.0, 88.5, 88.0, 91.0]);

        use AlarmLevel::*;
        assert_eq!(levels(&states), vec![Normal, Warning, Warning, Normal, Warning]);
        assert_eq!(states[4].occurrence_id, 2);
    }

    #[test]
    fn critical_takes_precedence_and_clears_independently() {
        let config = ThresholdConfig::new(Direction::Below)
            .with_warning(5.0, 0.5)
            .with_critical(3.0, 0.5);
        let states = run(&config, &[4.0, 2.9, 3.2, 3.6, 5.0, 5.6]);

        use AlarmLevel::*;
        assert_eq!(levels(&states), vec![Warning, Critical, Critical, Warning, Warning, Normal]);
        assert_eq!(states[0].occurrence_id, 1);
        assert_eq!(states[1].occurrence_id, 2);
        assert_eq!(states[3].occurrence_id, 2);
    }

    #[test]
    fn acknowledgment_survives_until_escalation() {
        let config = ThresholdConfig::new(Direction::Below)
            .with_warning(5.0, 0.5)
            .with_critical(3.0, 0.5);
        let mut state = evaluate(&AlarmState::default(), 4.0, &config);
        assert!(state.acknowledge());
        assert_eq!(state.level, AlarmLevel::Warning);

        state = evaluate(&state, 4.2, &config);
        assert!(state.acknowledged);

        state = evaluate(&state, 2.0, &config);
        assert_eq!(state.level, AlarmLevel::Critical);
        assert!(!state.acknowledged);

        assert!(state.acknowledge());
        state = evaluate(&state, 3.8, &config);
        assert_eq!(state.level, AlarmLevel::Warning);
        assert!(state.acknowledged, "de-escalation is not a new occurrence");
    }

    #[test]
    fn acknowledging_normal_is_a_no_op() {
        let mut state = AlarmState::default();
        assert!(!state.acknowledge());
        assert!(!state.acknowledged);
    }

    #[test]
    fn disabled_forces_normal_and_clears_acknowledgment() {
        let config = ThresholdConfig::new(Direction::Above).with_critical(100.0, 5.0);
        let mut state = evaluate(&AlarmState::default(), 120.0, &config);
        state.acknowledge();

        let disabled = config.with_enabled(false);
        state = evaluate(&state, 120.0, &disabled);
        assert_eq!(state.level, AlarmLevel::Normal);
        assert!(!state.acknowledged);
        assert_eq!(state.occurrence_id, 1);

        state = evaluate(&state, 120.0, &config);
        assert_eq!(state.level, AlarmLevel::Critical);
        assert_eq!(state.occurrence_id, 2);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let config = ThresholdConfig::new(Direction::Above).with_warning(10.0, 1.0);
        let state = evaluate(&AlarmState::default(), 12.0, &config);
        assert_eq!(evaluate(&state, f64::NAN, &config), state);
        assert_eq!(evaluate(&state, f64::NEG_INFINITY, &config), state);
    }

    #[test]
    fn validation() {
        let key = MetricKey::new(SensorType::Depth, 0, "depth");
        assert!(ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.5).validate(&key).is_ok());
        assert!(
            ThresholdConfig::new(Direction::Below)
                .with_warning(3.0, 0.5)
                .with_critical(5.0, 0.5)
                .validate(&key)
                .is_err()
        );
        assert!(ThresholdConfig::new(Direction::Above).with_warning(5.0, -1.0).validate(&key).is_err());
        assert!(ThresholdConfig::new(Direction::Above).with_warning(f64::NAN, 0.0).validate(&key).is_err());
    }

    #[test]
    fn yaml_defaults() {
        let config: ThresholdConfig =
            serde_yaml_ng::from_str("direction: below\nwarning: 5.0\nwarning_hysteresis: 0.5\n").unwrap();
        assert!(config.enabled);
        assert_eq!(config.critical, None);
        assert_eq!(config, ThresholdConfig::new(Direction::Below).with_warning(5.0, 0.5));
    }

    prop_compose! {
        fn arb_config()(
            direction in prop::sample::select(vec![Direction::Above, Direction::Below]),
            warning in -100.0f64..100.0,
            gap in 0.0f64..50.0,
            warning_h in 0.0f64..10.0,
            critical_h in 0.0f64..10.0,
        ) -> ThresholdConfig {
            let critical = match direction {
                Direction::Above => warning + gap,
                Direction::Below => warning - gap,
            };
            ThresholdConfig::new(direction)
                .with_warning(warning, warning_h)
                .with_critical(critical, critical_h)
        }
    }

    proptest! {
        #[test]
        fn prop_values_inside_band_never_toggle(
            config in arb_config(),
            offsets in prop::collection::vec(0.0f64..1.0, 1..40),
        ) {
            // Enter warning, then wander strictly inside its clearing band
            let threshold = config.warning.unwrap();
            let h = config.warning_hysteresis;
            prop_assume!(h > 0.01);
            let config = ThresholdConfig { critical: None, ..config };

            let mut state = evaluate(&AlarmState::default(), threshold, &config);
            prop_assert_eq!(state.level, AlarmLevel::Warning);
            for offset in offsets {
                let v = match config.direction {
                    Direction::Above => threshold - offset * h * 0.999,
                    Direction::Below => threshold + offset * h * 0.999,
                };
                state = evaluate(&state, v, &config);
                prop_assert_eq!(state.level, AlarmLevel::Warning);
                prop_assert_eq!(state.occurrence_id, 1);
            }
        }

        #[test]
        fn prop_occurrence_id_is_monotonic(
            config in arb_config(),
            values in prop::collection::vec(-200.0f64..200.0, 1..60),
        ) {
            let mut state = AlarmState::default();
            for v in values {
                let next = evaluate(&state, v, &config);
                prop_assert!(next.occurrence_id >= state.occurrence_id);
                if next.level > state.level {
                    prop_assert!(!next.acknowledged);
                    prop_assert_eq!(next.occurrence_id, state.occurrence_id + 1);
                }
                state = next;
            }
        }

        #[test]
        fn prop_evaluation_is_deterministic(
            config in arb_config(),
            values in prop::collection::vec(-200.0f64..200.0, 1..30),
        ) {
            let first = values.iter().fold(AlarmState::default(), |s, &v| evaluate(&s, v, &config));
            let second = values.iter().fold(AlarmState::default(), |s, &v| evaluate(&s, v, &config));
            prop_assert_eq!(first, second);
        }
    }
}
