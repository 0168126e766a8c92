//! Unit conversion and display formatting.
//!
//! [`Enricher::enrich`] is a pure function of `(si_value, category, unit)`.
//! It holds no state beyond the injected [`UnitRegistry`]; caching enriched
//! values is the metric store's job.
//!
//! ```rust
//! use bridgewatch::enrich::{Enricher, Unit, UnitCategory};
//!
//! let enricher = Enricher::default();
//! let depth = enricher.enrich(3.2, UnitCategory::Depth, Unit::Foot);
//! assert_eq!(depth.formatted_value_with_unit, "10.5 ft");
//! ```

mod format;
mod units;

pub use units::{Conversion, Unit, UnitCategory, UnitRegistry};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{Result, TelemetryError};

/// A value ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct EnrichedValue {
    /// Value converted into `unit`
    pub value: f64,
    pub unit: Unit,
    /// Value text without unit, e.g. `10.5`
    pub formatted_value: String,
    /// Value text with unit, e.g. `10.5 ft`
    pub formatted_value_with_unit: String,
}

/// Converts canonical values into user-facing units.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    registry: Arc<UnitRegistry>,
}

impl Enricher {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Convert and format `si_value`.
    ///
    /// A unit that does not belong to `category`, or that the registry does
    /// not know, falls back to the category's canonical unit.
    pub fn enrich(&self, si_value: f64, category: UnitCategory, unit: Unit) -> EnrichedValue {
        let (unit, conversion) = match self.lookup(category, unit) {
            Some(found) => found,
            None => {
                debug!(?category, ?unit, "Unit not applicable, using canonical unit");
                let base = category.base_unit();
                let conversion =
                    self.registry.conversion(base).copied().unwrap_or(Conversion::scale(1.0, 2));
                (base, conversion)
            }
        };

        let value = conversion.apply(si_value);
        let formatted_value = match category {
            UnitCategory::Latitude => format::coordinate(value, true, unit, conversion.decimals),
            UnitCategory::Longitude => format::coordinate(value, false, unit, conversion.decimals),
            _ => format::fixed(value, conversion.decimals),
        };
        let formatted_value_with_unit = format::with_symbol(&formatted_value, unit);

        EnrichedValue { value, unit, formatted_value, formatted_value_with_unit }
    }

    fn lookup(&self, category: UnitCategory, unit: Unit) -> Option<(Unit, Conversion)> {
        if !category.accepts(unit) {
            return None;
        }
        self.registry.conversion(unit).map(|conversion| (unit, *conversion))
    }
}

/// The user's chosen display unit per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitPreferences {
    units: HashMap<UnitCategory, Unit>,
}

impl UnitPreferences {
    /// Preferred unit for a category, or the category default.
    pub fn unit_for(&self, category: UnitCategory) -> Unit {
        self.units.get(&category).copied().unwrap_or_else(|| category.default_unit())
    }

    /// Choose a unit for a category.
    pub fn set(&mut self, category: UnitCategory, unit: Unit) -> Result<()> {
        if !category.accepts(unit) {
            return Err(TelemetryError::config(format!(
                "unit {unit:?} does not apply to {category:?}"
            )));
        }
        self.units.insert(category, unit);
        Ok(())
    }

    pub fn with(mut self, category: UnitCategory, unit: Unit) -> Result<Self> {
        self.set(category, unit)?;
        Ok(self)
    }

    /// Check every stored choice applies to its category.
    pub fn validate(&self) -> Result<()> {
        for (category, unit) in &self.units {
            if !category.accepts(*unit) {
                return Err(TelemetryError::config(format!(
                    "unit {unit:?} does not apply to {category:?}"
                )));
            }
        }
        Ok(())
    }
}
