//! Weather models.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// Current conditions as rendered on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct WeatherSnapshot {
    /// Short condition group, e.g. "Clear" or "Clouds"
    pub condition: String,
    pub description: String,
    pub temperature: f64,
    pub city: String,
}

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}
