//! Background image models.

use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// A background image candidate and its photographer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct ImageEntry {
    pub url: String,
    pub author: String,
}

impl ImageEntry {
    pub fn new(url: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            author: author.into(),
        }
    }

    /// Attribution line shown under the dashboard.
    pub fn credit(&self) -> String {
        format!("By: {}", self.author)
    }
}

/// The last fetched batch of images for one category.
///
/// Only valid while the configured category equals `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct ImagePool {
    pub images: Vec<ImageEntry>,
    pub category: String,
}

impl ImagePool {
    pub fn matches(&self, category: &str) -> bool {
        self.category == category
    }
}
