//! Process-wide metric table.
//!
//! One slot per [`MetricKey`], each behind its own `parking_lot::RwLock`. The
//! `DashMap` is only touched to find or create a slot, so writers to unrelated
//! keys never serialize on a shared lock and a reader always sees one
//! consistent snapshot of a key.
//!
//! Every accepted [`MetricStore::write`] appends history, refreshes the cached
//! display value and re-evaluates the key's alarm before returning. History is
//! trimmed separately by [`MetricStore::prune_all`], normally driven by
//! [`MetricStore::spawn_pruner`].
//!
//! ```rust
//! use bridgewatch::store::{MetricStore, StatKind};
//! use bridgewatch::types::{MetricKey, SensorType, Timestamp};
//! use std::time::Duration;
//!
//! let store = MetricStore::default();
//! let depth = MetricKey::new(SensorType::Depth, 0, "depth");
//! store.write(depth.clone(), 4.0, Timestamp::from_millis(1_000));
//! store.write(depth.clone(), 6.0, Timestamp::from_millis(2_000));
//!
//! assert_eq!(store.read(&depth).unwrap().current_si_value, 6.0);
//! assert_eq!(store.derived_stat(&depth, StatKind::Avg, Duration::from_secs(60)), Some(5.0));
//! ```

mod history;
mod record;

pub use history::{History, HistoryBuffer, StatKind};
pub use record::{DisplayValue, MetricRecord, MetricUpdate};

use dashmap::DashMap;
use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::alarm::{self, AlarmEvent, AlarmState, ThresholdConfig};
use crate::enrich::{Enricher, UnitPreferences};
use crate::stream::ThrottleExt;
use crate::types::{MetricKey, Timestamp, UpdateRate};
use crate::{Result, TelemetryError};
use record::MetricSlot;

const ALARM_EVENT_CAPACITY: usize = 256;

/// History bounds and pruning cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained samples per key
    pub capacity: usize,
    /// Samples older than this are pruned
    pub window_secs: u64,
    pub prune_interval_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 600, window_secs: 3_600, prune_interval_ms: 1_000 }
    }
}

impl HistoryConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_millis(self.prune_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(TelemetryError::config("history capacity must be at least 1"));
        }
        if self.window_secs == 0 {
            return Err(TelemetryError::config("history window must be positive"));
        }
        if self.prune_interval_ms == 0 {
            return Err(TelemetryError::config("prune interval must be positive"));
        }
        Ok(())
    }
}

/// Canonical per-metric state shared by the router and every reader.
pub struct MetricStore {
    slots: DashMap<MetricKey, Arc<RwLock<MetricSlot>>>,
    enricher: Enricher,
    preferences: RwLock<UnitPreferences>,
    history: HistoryConfig,
    alarm_events: broadcast::Sender<AlarmEvent>,
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default(), Enricher::default(), UnitPreferences::default())
    }
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore")
            .field("keys", &self.slots.len())
            .field("history", &self.history)
            .finish()
    }
}

impl MetricStore {
    pub fn new(history: HistoryConfig, enricher: Enricher, preferences: UnitPreferences) -> Self {
        let (alarm_events, _) = broadcast::channel(ALARM_EVENT_CAPACITY);
        Self {
            slots: DashMap::new(),
            enricher,
            preferences: RwLock::new(preferences),
            history,
            alarm_events,
        }
    }

    pub fn history_config(&self) -> &HistoryConfig {
        &self.history
    }

    fn slot(&self, key: &MetricKey) -> Option<Arc<RwLock<MetricSlot>>> {
        self.slots.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_or_insert(&self, key: &MetricKey) -> Arc<RwLock<MetricSlot>> {
        if let Some(slot) = self.slot(key) {
            return slot;
        }
        let entry = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::new(MetricSlot::new(key.clone()))));
        Arc::clone(entry.value())
    }

    /// Record a sample in canonical units.
    ///
    /// Non-finite values are dropped. A sample older than the newest history
    /// entry still becomes the current value but is not appended. Returns
    /// whether the write was accepted.
    pub fn write(&self, key: MetricKey, si_value: f64, timestamp: Timestamp) -> bool {
        if !si_value.is_finite() {
            debug!(%key, si_value, "Dropping non-finite write");
            return false;
        }

        let slot = self.slot_or_insert(&key);
        let event = {
            let mut slot = slot.write();
            // Preferences are read under the slot lock
            let unit = self.preferences.read().unit_for(slot.category);
            let capacity = self.history.capacity;
            let record = slot.record.get_or_insert_with(|| MetricRecord {
                current_si_value: si_value,
                last_update: timestamp,
                history: HistoryBuffer::new(capacity),
            });
            if !record.history.push(timestamp, si_value) {
                trace!(%key, %timestamp, "Out-of-order sample kept out of history");
            }
            record.current_si_value = si_value;
            record.last_update = record.last_update.max(timestamp);

            let enriched = self.enricher.enrich(si_value, slot.category, unit);
            slot.display = Some(DisplayValue {
                enriched,
                mnemonic: slot.mnemonic.clone(),
                category: slot.category,
            });

            let threshold = slot.threshold;
            let event = threshold.and_then(|config| {
                let previous = slot.alarm;
                slot.alarm = alarm::evaluate(&previous, si_value, &config);
                alarm_changed(&previous, &slot.alarm).then(|| AlarmEvent {
                    key: key.clone(),
                    previous: previous.level,
                    state: slot.alarm,
                    at: timestamp,
                })
            });
            slot.publish();
            event
        };

        if let Some(event) = event {
            self.emit(event);
        }
        true
    }

    fn emit(&self, event: AlarmEvent) {
        info!(
            key = %event.key,
            from = ?event.previous,
            to = ?event.state.level,
            occurrence = event.state.occurrence_id,
            acknowledged = event.state.acknowledged,
            "Alarm state changed"
        );
        // No receivers is fine
        let _ = self.alarm_events.send(event);
    }

    /// Snapshot of a metric, `None` if it has never been written.
    pub fn read(&self, key: &MetricKey) -> Option<MetricRecord> {
        self.slot(key)?.read().record.clone()
    }

    /// Samples within `window` of the newest one.
    pub fn history(&self, key: &MetricKey, window: Duration) -> History {
        self.slot(key)
            .and_then(|slot| slot.read().record.as_ref().map(|r| r.history.window(window)))
            .unwrap_or_default()
    }

    /// Min, max or mean over `window`, computed from history on demand.
    pub fn derived_stat(&self, key: &MetricKey, kind: StatKind, window: Duration) -> Option<f64> {
        self.history(key, window).stat(kind)
    }

    /// Cached enriched value for a metric.
    pub fn display(&self, key: &MetricKey) -> Option<DisplayValue> {
        self.slot(key)?.read().display.clone()
    }

    /// Alarm state, `None` when the key has no threshold.
    pub fn alarm(&self, key: &MetricKey) -> Option<AlarmState> {
        self.slot(key)?.read().alarm_state()
    }

    /// Every key that has received a write.
    pub fn keys(&self) -> Vec<MetricKey> {
        let mut keys: Vec<MetricKey> = self
            .slots
            .iter()
            .filter(|entry| entry.value().read().record.is_some())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach or replace a threshold and evaluate it against the current value.
    pub fn set_threshold(&self, key: MetricKey, config: ThresholdConfig) -> Result<()> {
        config.validate(&key)?;
        if !crate::schema::is_alarmable(&key) {
            return Err(TelemetryError::threshold(key.to_string(), "field does not support alarms"));
        }

        let slot = self.slot_or_insert(&key);
        let event = {
            let mut slot = slot.write();
            slot.threshold = Some(config);
            let previous = slot.alarm;
            if let Some(value) = slot.record.as_ref().map(|r| r.current_si_value) {
                slot.alarm = alarm::evaluate(&previous, value, &config);
            } else if !config.enabled {
                slot.alarm.reset();
            }
            let at = slot.record.as_ref().map_or_else(Timestamp::now, |r| r.last_update);
            slot.publish();
            alarm_changed(&previous, &slot.alarm).then(|| AlarmEvent {
                key: key.clone(),
                previous: previous.level,
                state: slot.alarm,
                at,
            })
        };
        debug!(%key, ?config, "Threshold set");

        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    /// Remove a threshold; the alarm returns to `Normal`.
    pub fn clear_threshold(&self, key: &MetricKey) {
        let Some(slot) = self.slot(key) else {
            return;
        };
        let event = {
            let mut slot = slot.write();
            if slot.threshold.take().is_none() {
                return;
            }
            let previous = slot.alarm;
            slot.alarm.reset();
            slot.publish();
            alarm_changed(&previous, &slot.alarm).then(|| AlarmEvent {
                key: key.clone(),
                previous: previous.level,
                state: slot.alarm,
                at: Timestamp::now(),
            })
        };
        debug!(%key, "Threshold cleared");

        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Replace the whole threshold set: listed keys are (re)applied, every
    /// other key loses its threshold. Nothing changes if any entry is invalid.
    pub fn apply_thresholds<I>(&self, thresholds: I) -> Result<()>
    where
        I: IntoIterator<Item = (MetricKey, ThresholdConfig)>,
    {
        let thresholds: Vec<_> = thresholds.into_iter().collect();
        for (key, config) in &thresholds {
            config.validate(key)?;
            if !crate::schema::is_alarmable(key) {
                return Err(TelemetryError::threshold(
                    key.to_string(),
                    "field does not support alarms",
                ));
            }
        }

        let listed: HashSet<&MetricKey> = thresholds.iter().map(|(key, _)| key).collect();
        let stale: Vec<MetricKey> = self
            .slots
            .iter()
            .filter(|entry| !listed.contains(entry.key()) && entry.value().read().threshold.is_some())
            .map(|entry| entry.key().clone())
            .collect();
        for key in &stale {
            self.clear_threshold(key);
        }
        for (key, config) in thresholds {
            self.set_threshold(key, config)?;
        }
        Ok(())
    }

    /// Acknowledge the active alarm on a key. Returns false when nothing is
    /// active.
    pub fn acknowledge(&self, key: &MetricKey) -> bool {
        let Some(slot) = self.slot(key) else {
            return false;
        };
        let event = {
            let mut slot = slot.write();
            if slot.threshold.is_none() || slot.alarm.acknowledged || !slot.alarm.acknowledge() {
                return false;
            }
            slot.publish();
            AlarmEvent {
                key: key.clone(),
                previous: slot.alarm.level,
                state: slot.alarm,
                at: Timestamp::now(),
            }
        };
        self.emit(event);
        true
    }

    pub fn unit_preferences(&self) -> UnitPreferences {
        self.preferences.read().clone()
    }

    /// Swap unit preferences and re-enrich every stored value.
    pub fn set_unit_preferences(&self, preferences: UnitPreferences) -> Result<()> {
        preferences.validate()?;
        *self.preferences.write() = preferences.clone();

        let slots: Vec<_> = self.slots.iter().map(|entry| Arc::clone(entry.value())).collect();
        for slot in slots {
            let mut slot = slot.write();
            let Some(value) = slot.record.as_ref().map(|r| r.current_si_value) else {
                continue;
            };
            let unit = preferences.unit_for(slot.category);
            let enriched = self.enricher.enrich(value, slot.category, unit);
            slot.display = Some(DisplayValue {
                enriched,
                mnemonic: slot.mnemonic.clone(),
                category: slot.category,
            });
            slot.publish();
        }
        info!("Unit preferences updated");
        Ok(())
    }

    /// Watch the latest update for a key. The key need not exist yet; the
    /// channel holds `None` until the first write.
    pub fn subscribe(&self, key: &MetricKey) -> watch::Receiver<Option<Arc<MetricUpdate>>> {
        self.slot_or_insert(key).read().updates.subscribe()
    }

    /// Stream of updates for a key at the requested rate, latest value wins.
    pub fn updates(
        &self,
        key: &MetricKey,
        rate: UpdateRate,
    ) -> impl Stream<Item = Arc<MetricUpdate>> + Send + 'static {
        let updates = WatchStream::new(self.subscribe(key)).filter_map(|update| async move { update });
        match rate.throttle_interval() {
            None => updates.boxed(),
            Some(interval) => updates.throttle(interval).boxed(),
        }
    }

    /// Receiver for alarm level, occurrence and acknowledgment changes.
    pub fn alarm_events(&self) -> broadcast::Receiver<AlarmEvent> {
        self.alarm_events.subscribe()
    }

    /// Trim every key's history to the configured window and capacity.
    /// Returns the number of samples removed.
    pub fn prune_all(&self, now: Timestamp) -> usize {
        let window = self.history.window();
        let slots: Vec<_> = self.slots.iter().map(|entry| Arc::clone(entry.value())).collect();
        let removed: usize = slots
            .iter()
            .filter_map(|slot| slot.write().record.as_mut().map(|r| r.history.prune(now, window)))
            .sum();
        if removed > 0 {
            trace!(removed, "Pruned history");
        }
        removed
    }

    /// Prune on a fixed interval until `cancel` fires.
    pub fn spawn_pruner(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let period = self.history.prune_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("History pruner stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.prune_all(Timestamp::now());
                    }
                }
            }
        })
    }
}

fn alarm_changed(previous: &AlarmState, next: &AlarmState) -> bool {
    previous.level != next.level
        || previous.occurrence_id != next.occurrence_id
        || previous.acknowledged != next.acknowledged
}
