//! Bounded, time-ordered sample history

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::types::Timestamp;

/// Which statistic [`History::stat`] computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum StatKind {
    Min,
    Max,
    Avg,
}

/// Ring of `(timestamp, value)` samples in strictly increasing time order.
///
/// Writes only append; trimming to the time window and entry cap happens in
/// [`HistoryBuffer::prune`]. Between prunes the buffer may hold up to twice
/// its capacity before the oldest sample is dropped on write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct HistoryBuffer {
    entries: VecDeque<(Timestamp, f64)>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a sample. A sample older than the newest entry is rejected and
    /// one with the same timestamp replaces it. Returns whether the history
    /// changed.
    pub fn push(&mut self, timestamp: Timestamp, value: f64) -> bool {
        match self.entries.back_mut() {
            Some((newest, _)) if *newest > timestamp => return false,
            Some((newest, last)) if *newest == timestamp => {
                *last = value;
                return true;
            }
            _ => {}
        }
        if self.entries.len() >= self.capacity.saturating_mul(2) {
            self.entries.pop_front();
        }
        self.entries.push_back((timestamp, value));
        true
    }

    /// Drop samples older than `now - window` and beyond the entry cap,
    /// always keeping the newest. Returns how many were removed.
    pub fn prune(&mut self, now: Timestamp, window: Duration) -> usize {
        let before = self.entries.len();
        let cutoff = now.saturating_sub(window);
        while self.entries.len() > 1 && self.entries.front().is_some_and(|(ts, _)| *ts < cutoff) {
            self.entries.pop_front();
        }
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn newest(&self) -> Option<(Timestamp, f64)> {
        self.entries.back().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Timestamp, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Snapshot of the samples no older than `window` before the newest one.
    pub fn window(&self, window: Duration) -> History {
        let Some((newest, _)) = self.newest() else {
            return History::default();
        };
        let cutoff = newest.saturating_sub(window);
        let start = self.entries.partition_point(|(ts, _)| *ts < cutoff);
        History { samples: self.entries.range(start..).copied().collect() }
    }
}

/// A finite, re-iterable slice of history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct History {
    samples: Vec<(Timestamp, f64)>,
}

impl History {
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Timestamp, f64)> + ExactSizeIterator + '_ {
        self.samples.iter().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Minimum, maximum or mean of the samples; `None` when empty.
    pub fn stat(&self, kind: StatKind) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let values = self.values();
        Some(match kind {
            StatKind::Min => values.fold(f64::INFINITY, f64::min),
            StatKind::Max => values.fold(f64::NEG_INFINITY, f64::max),
            StatKind::Avg => values.sum::<f64>() / self.samples.len() as f64,
        })
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = (Timestamp, f64);
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, (Timestamp, f64)>>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter().copied()
    }
}
