//! Per-key stored state and the snapshots handed to readers

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use super::history::HistoryBuffer;
use crate::alarm::{AlarmState, ThresholdConfig};
use crate::enrich::{EnrichedValue, UnitCategory};
use crate::types::{MetricKey, Timestamp};

/// Current value and bounded history of one metric, canonical units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct MetricRecord {
    pub current_si_value: f64,
    pub last_update: Timestamp,
    pub history: HistoryBuffer,
}

/// Enriched value plus the schema's label for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct DisplayValue {
    #[serde(flatten)]
    pub enriched: EnrichedValue,
    pub mnemonic: String,
    pub category: UnitCategory,
}

/// Published to per-key subscribers after every accepted write and every
/// alarm change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct MetricUpdate {
    pub key: MetricKey,
    pub si_value: f64,
    pub timestamp: Timestamp,
    pub display: DisplayValue,
    /// `None` when no threshold is configured
    pub alarm: Option<AlarmState>,
}

/// Everything the store keeps for one key, behind that key's lock.
#[derive(Debug)]
pub(super) struct MetricSlot {
    pub key: MetricKey,
    pub category: UnitCategory,
    pub mnemonic: String,
    pub record: Option<MetricRecord>,
    pub display: Option<DisplayValue>,
    pub threshold: Option<ThresholdConfig>,
    pub alarm: AlarmState,
    pub updates: watch::Sender<Option<Arc<MetricUpdate>>>,
}

impl MetricSlot {
    pub fn new(key: MetricKey) -> Self {
        let category = crate::schema::category_of(&key);
        let mnemonic = crate::schema::mnemonic_of(&key);
        let (updates, _) = watch::channel(None);
        Self {
            key,
            category,
            mnemonic,
            record: None,
            display: None,
            threshold: None,
            alarm: AlarmState::default(),
            updates,
        }
    }

    pub fn alarm_state(&self) -> Option<AlarmState> {
        self.threshold.map(|_| self.alarm)
    }

    /// Push the current snapshot to subscribers; a slot that has never been
    /// written has nothing to publish.
    pub fn publish(&self) {
        let (Some(record), Some(display)) = (&self.record, &self.display) else {
            return;
        };
        let update = MetricUpdate {
            key: self.key.clone(),
            si_value: record.current_si_value,
            timestamp: record.last_update,
            display: display.clone(),
            alarm: self.alarm_state(),
        };
        self.updates.send_replace(Some(Arc::new(update)));
    }
}
