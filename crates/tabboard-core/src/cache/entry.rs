use chrono::Utc;
use serde::{Deserialize, Serialize};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// Wrapper stored around every cached value.
///
/// `timestamp` is milliseconds since the Unix epoch, taken when the entry is
/// written. Validity is decided by the session, not by age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}
