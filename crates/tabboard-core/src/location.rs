//! Last known position for weather lookups.
//!
//! Unlike the session-scoped caches, a stored position expires after a fixed
//! wall-clock interval. An expired position is still offered as a fallback
//! when acquiring a new one fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::models::Coordinates;
use crate::storage::KeyValueStore;

pub const LOCATION_KEY: &str = "weatherLocation";
pub const LOCATION_TIME_KEY: &str = "weatherLocationTime";

/// A stored position is reused for 30 minutes.
const LOCATION_TTL_MINUTES: i64 = 30;
const LOCATION_TTL_MS: i64 = LOCATION_TTL_MINUTES * 60 * 1000;

#[derive(Clone)]
pub struct LocationCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocationCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored position if it is younger than the TTL.
    pub fn fresh_location(&self) -> Option<Coordinates> {
        self.fresh_location_at(Utc::now().timestamp_millis())
    }

    fn fresh_location_at(&self, now_ms: i64) -> Option<Coordinates> {
        let stored_at: i64 = self
            .store
            .get_item(LOCATION_TIME_KEY)
            .ok()
            .flatten()?
            .trim()
            .parse()
            .ok()?;

        // A stamp from the future counts as expired
        let age_ms = now_ms.saturating_sub(stored_at);
        if (0..LOCATION_TTL_MS).contains(&age_ms) {
            self.any_location()
        } else {
            debug!(age_ms, "Stored location expired");
            None
        }
    }

    /// The stored position regardless of age.
    pub fn any_location(&self) -> Option<Coordinates> {
        let raw = match self.store.get_item(LOCATION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored location");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(coords) => Some(coords),
            Err(e) => {
                warn!(error = %e, "Discarding undecodable stored location");
                None
            }
        }
    }

    /// Remember a freshly acquired position.
    pub fn store_location(&self, coords: Coordinates) {
        self.store_location_at(coords, Utc::now().timestamp_millis())
    }

    fn store_location_at(&self, coords: Coordinates, now_ms: i64) {
        let contents = match serde_json::to_string(&coords) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to encode location");
                return;
            }
        };
        if let Err(e) = self.store.set_item(LOCATION_KEY, &contents) {
            warn!(error = %e, "Failed to store location");
            return;
        }
        if let Err(e) = self.store.set_item(LOCATION_TIME_KEY, &now_ms.to_string()) {
            warn!(error = %e, "Failed to store location time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    const HERE: Coordinates = Coordinates {
        lat: 40.71,
        lon: -74.0,
    };

    fn locations() -> (Arc<MemoryStore>, LocationCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = LocationCache::new(store.clone());
        (store, cache)
    }

    #[test]
    fn test_empty() {
        let (_, cache) = locations();
        assert_eq!(cache.fresh_location(), None);
        assert_eq!(cache.any_location(), None);
    }

    #[test]
    fn test_fresh_within_ttl() {
        let (_, cache) = locations();
        cache.store_location_at(HERE, 1_000_000);

        assert_eq!(cache.fresh_location_at(1_000_000), Some(HERE));
        assert_eq!(cache.fresh_location_at(1_000_000 + LOCATION_TTL_MS - 1), Some(HERE));
    }

    #[test]
    fn test_expired_only_available_as_fallback() {
        let (_, cache) = locations();
        cache.store_location_at(HERE, 1_000_000);

        assert_eq!(cache.fresh_location_at(1_000_000 + LOCATION_TTL_MS), None);
        assert_eq!(cache.any_location(), Some(HERE));
    }

    #[test]
    fn test_corrupt_time_is_not_fresh() {
        let (store, cache) = locations();
        cache.store_location_at(HERE, 1_000_000);

        store.set_item(LOCATION_TIME_KEY, &i64::MIN.to_string()).unwrap();
        assert_eq!(cache.fresh_location(), None);

        store.set_item(LOCATION_TIME_KEY, &i64::MAX.to_string()).unwrap();
        assert_eq!(cache.fresh_location(), None);

        // Stamped in the future
        store.set_item(LOCATION_TIME_KEY, "2000000").unwrap();
        assert_eq!(cache.fresh_location_at(1_000_000), None);
        assert_eq!(cache.any_location(), Some(HERE));
    }

    #[test]
    fn test_missing_time_is_not_fresh() {
        let (store, cache) = locations();
        store
            .set_item(LOCATION_KEY, r#"{"lat":1.0,"lon":2.0}"#)
            .unwrap();
        assert_eq!(cache.fresh_location(), None);
        assert_eq!(cache.any_location(), Some(Coordinates { lat: 1.0, lon: 2.0 }));
    }

    #[test]
    fn test_store_location_uses_wall_clock() {
        let (_, cache) = locations();
        cache.store_location(HERE);
        assert_eq!(cache.fresh_location(), Some(HERE));
    }
}
