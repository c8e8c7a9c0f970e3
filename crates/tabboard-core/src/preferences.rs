//! User preferences stored alongside cached data.
//!
//! Preferences are written by settings collaborators and only read by the
//! cache store. Category strings are normalized on every write and every
//! read, so "Nature" from a settings screen and "nature" from a stored pool
//! compare equal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::KeyValueStore;

pub const CATEGORY_KEY: &str = "backgroundImageCategory";
pub const TEMPERATURE_UNIT_KEY: &str = "temperatureUnit";

/// Category used when none has been chosen
pub const DEFAULT_CATEGORY: &str = "nature";

/// Categories offered by the settings screen.
pub const CATEGORIES: [&str; 8] = [
    "nature",
    "travel",
    "architecture",
    "technology",
    "food",
    "art",
    "animals",
    "space",
];

/// Canonical form of a category: trimmed and lower-cased.
/// Blank input falls back to the default category.
pub fn normalize_category(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

/// Whether `raw` names one of the offered categories once normalized.
pub fn is_builtin_category(raw: &str) -> bool {
    CATEGORIES.contains(&normalize_category(raw).as_str())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TemperatureUnit {
    #[default]
    Imperial,
    Metric,
}

impl TemperatureUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            TemperatureUnit::Imperial => "imperial",
            TemperatureUnit::Metric => "metric",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Imperial => "°F",
            TemperatureUnit::Metric => "°C",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "imperial" | "f" | "fahrenheit" => Ok(TemperatureUnit::Imperial),
            "metric" | "c" | "celsius" => Ok(TemperatureUnit::Metric),
            other => Err(format!("unknown temperature unit: {}", other)),
        }
    }
}

/// Typed access to preference keys in durable storage.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The configured background category, read fresh on every call.
    pub fn background_category(&self) -> String {
        match self.store.get_item(CATEGORY_KEY) {
            Ok(Some(raw)) => normalize_category(&raw),
            Ok(None) => DEFAULT_CATEGORY.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to read background category, using default");
                DEFAULT_CATEGORY.to_string()
            }
        }
    }

    /// Store a new category. Returns true when the effective category changed,
    /// in which case the caller should drop the image pool.
    pub fn set_background_category(&self, raw: &str) -> bool {
        let category = normalize_category(raw);
        let changed = self.background_category() != category;
        if let Err(e) = self.store.set_item(CATEGORY_KEY, &category) {
            warn!(error = %e, category = %category, "Failed to save background category");
            return false;
        }
        debug!(category = %category, changed, "Saved background category");
        changed
    }

    pub fn temperature_unit(&self) -> TemperatureUnit {
        match self.store.get_item(TEMPERATURE_UNIT_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_default(),
            Ok(None) => TemperatureUnit::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read temperature unit, using default");
                TemperatureUnit::default()
            }
        }
    }

    /// Store a temperature unit. Returns true when it changed.
    pub fn set_temperature_unit(&self, unit: TemperatureUnit) -> bool {
        let changed = self.temperature_unit() != unit;
        if let Err(e) = self.store.set_item(TEMPERATURE_UNIT_KEY, unit.as_str()) {
            warn!(error = %e, unit = %unit, "Failed to save temperature unit");
            return false;
        }
        changed
    }
}
