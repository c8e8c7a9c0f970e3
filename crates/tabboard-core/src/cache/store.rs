use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::CacheEntry;
use crate::models::{ImageEntry, ImagePool, WeatherSnapshot};
use crate::preferences::{normalize_category, Preferences};
use crate::storage::KeyValueStore;

pub const WEATHER_KEY: &str = "cachedWeather";
pub const ADVICE_KEY: &str = "cachedAdvice";
pub const FACTS_KEY: &str = "cachedFacts";
pub const IMAGES_KEY: &str = "cachedImages";
pub const IMAGE_INDEX_KEY: &str = "currentImageIndex";

/// Every key owned by the cache store. The category preference is not one of
/// them.
const OWNED_KEYS: [&str; 5] = [WEATHER_KEY, ADVICE_KEY, FACTS_KEY, IMAGES_KEY, IMAGE_INDEX_KEY];

/// Typed cache over durable key-value storage.
///
/// Every failure is logged and reported as a miss; nothing here returns an
/// error. The store does not know about sessions: callers decide whether a
/// present entry is still honoured.
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    prefs: Preferences,
    /// Serializes the read-advance-write of the rotation index
    rotation: Mutex<()>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            prefs: Preferences::new(store.clone()),
            store,
            rotation: Mutex::new(()),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    /// Read and decode an entry. Absent, unreadable or undecodable values are
    /// all `None`.
    pub fn get_cache<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Wrap `data` with the current time and write it.
    pub fn set_cache<T: Serialize>(&self, key: &str, data: &T) {
        let entry = CacheEntry::new(data);
        let contents = match serde_json::to_string(&entry) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match self.store.set_item(key, &contents) {
            Ok(()) => debug!(key, bytes = contents.len(), "Cache written"),
            Err(e) => warn!(key, error = %e, "Cache write failed"),
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove_item(key) {
            warn!(key, error = %e, "Cache remove failed");
        }
    }

    // ===== Weather =====

    pub fn get_cached_weather(&self) -> Option<WeatherSnapshot> {
        self.get_cache(WEATHER_KEY).map(|entry| entry.data)
    }

    pub fn set_cached_weather(&self, weather: &WeatherSnapshot) {
        self.set_cache(WEATHER_KEY, weather)
    }

    /// Forget the weather snapshot, e.g. after the temperature unit changes.
    pub fn clear_cached_weather(&self) {
        self.remove(WEATHER_KEY)
    }

    // ===== Advice =====

    pub fn get_cached_advice(&self) -> Option<String> {
        self.get_cache(ADVICE_KEY).map(|entry| entry.data)
    }

    pub fn set_cached_advice(&self, advice: &str) {
        self.set_cache(ADVICE_KEY, &advice)
    }

    // ===== Facts =====

    pub fn get_cached_facts(&self) -> Option<String> {
        self.get_cache(FACTS_KEY).map(|entry| entry.data)
    }

    pub fn set_cached_facts(&self, facts: &str) {
        self.set_cache(FACTS_KEY, &facts)
    }

    // ===== Image pool =====

    /// The stored pool, if it was fetched for the category configured now.
    pub fn get_cached_images(&self) -> Option<Vec<ImageEntry>> {
        let entry: CacheEntry<ImagePool> = self.get_cache(IMAGES_KEY)?;
        let current = self.prefs.background_category();
        if entry.data.matches(&current) {
            Some(entry.data.images)
        } else {
            debug!(
                stored = %entry.data.category,
                current = %current,
                "Image pool belongs to another category"
            );
            None
        }
    }

    /// Replace the pool wholesale and restart rotation.
    pub fn set_cached_images(&self, images: &[ImageEntry], category: &str) {
        let _guard = self.rotation.lock().unwrap_or_else(|e| e.into_inner());
        let pool = ImagePool {
            images: images.to_vec(),
            category: normalize_category(category),
        };
        self.set_cache(IMAGES_KEY, &pool);
        self.remove(IMAGE_INDEX_KEY);
    }

    /// Advance the rotation and return the image at the new position.
    ///
    /// The first call after a pool is stored returns its second image; the
    /// first image is expected to be shown straight from the fetched batch.
    /// Without a usable pool this returns `None` and writes nothing.
    pub fn get_next_image(&self) -> Option<ImageEntry> {
        let _guard = self.rotation.lock().unwrap_or_else(|e| e.into_inner());

        let mut images = self.get_cached_images()?;
        if images.is_empty() {
            return None;
        }

        // Stored index may be out of range for this pool
        let current = self.rotation_index() % images.len();
        let next = (current + 1) % images.len();
        if let Err(e) = self.store.set_item(IMAGE_INDEX_KEY, &next.to_string()) {
            warn!(error = %e, index = next, "Failed to persist image rotation index");
        }
        debug!(index = next, pool_size = images.len(), "Rotated background image");

        Some(images.swap_remove(next))
    }

    /// Last served offset into the pool; absent or unparseable reads as 0.
    pub fn rotation_index(&self) -> usize {
        match self.store.get_item(IMAGE_INDEX_KEY) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Failed to read image rotation index");
                0
            }
        }
    }

    /// Drop the pool and its rotation index. The category is left alone.
    pub fn clear_image_cache(&self) {
        let _guard = self.rotation.lock().unwrap_or_else(|e| e.into_inner());
        self.remove(IMAGES_KEY);
        self.remove(IMAGE_INDEX_KEY);
    }

    /// Drop every cached domain.
    pub fn clear_all(&self) {
        let _guard = self.rotation.lock().unwrap_or_else(|e| e.into_inner());
        for key in OWNED_KEYS {
            self.remove(key);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::preferences::CATEGORY_KEY;
    use crate::storage::MemoryStore;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (Arc<MemoryStore>, CacheStore) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(store.clone());
        (store, cache)
    }

    fn pool() -> Vec<ImageEntry> {
        vec![ImageEntry::new("a", "A"), ImageEntry::new("b", "B")]
    }

    /// Store that fails every call and counts writes.
    #[derive(Default)]
    struct BrokenStore {
        writes: AtomicUsize,
    }

    impl KeyValueStore for BrokenStore {
        fn get_item(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Poisoned)
        }

        fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                size: value.len(),
                limit: 0,
            })
        }

        fn remove_item(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let (_, cache) = cache();
        let value = json!({"test": "data", "nested": [1, 2, 3]});

        cache.set_cache("testKey", &value);
        let entry: CacheEntry<serde_json::Value> = cache.get_cache("testKey").unwrap();

        assert_eq!(entry.data, value);
        assert!(entry.timestamp <= Utc::now().timestamp_millis());
    }

    #[test]
    fn test_unknown_key_is_none() {
        let (_, cache) = cache();
        assert!(cache.get_cache::<String>("nonExistent").is_none());
    }

    #[test]
    fn test_repeated_get_is_stable() {
        let (_, cache) = cache();
        cache.set_cache("k", &"v");

        let first: Option<CacheEntry<String>> = cache.get_cache("k");
        let second: Option<CacheEntry<String>> = cache.get_cache("k");
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let (store, cache) = cache();
        store.set_item(ADVICE_KEY, "{not json").unwrap();
        assert_eq!(cache.get_cached_advice(), None);

        // Foreign shape: valid JSON but not an entry
        store.set_item(FACTS_KEY, r#"{"fact": "x"}"#).unwrap();
        assert_eq!(cache.get_cached_facts(), None);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let broken = Arc::new(BrokenStore::default());
        let cache = CacheStore::new(broken.clone());

        cache.set_cached_advice("advice");
        assert_eq!(broken.writes.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_cached_advice(), None);
        assert_eq!(cache.get_next_image(), None);
        cache.clear_image_cache();
        cache.clear_all();
    }

    #[test]
    fn test_quota_exceeded_write_keeps_previous_value() {
        let store = Arc::new(MemoryStore::with_quota(128));
        let cache = CacheStore::new(store.clone());

        cache.set_cached_advice("short");
        cache.set_cached_advice(&"long ".repeat(100));
        assert_eq!(cache.get_cached_advice().as_deref(), Some("short"));
    }

    #[test]
    fn test_weather_cache() {
        let (_, cache) = cache();
        assert!(cache.get_cached_weather().is_none());

        let weather = WeatherSnapshot {
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            temperature: 72.0,
            city: "Test City".to_string(),
        };
        cache.set_cached_weather(&weather);
        assert_eq!(cache.get_cached_weather(), Some(weather));

        cache.clear_cached_weather();
        assert!(cache.get_cached_weather().is_none());
    }

    #[test]
    fn test_advice_and_facts_are_independent() {
        let (_, cache) = cache();
        cache.set_cached_advice("Stay hydrated.");
        assert_eq!(cache.get_cached_advice().as_deref(), Some("Stay hydrated."));
        assert_eq!(cache.get_cached_facts(), None);

        cache.set_cached_facts("Octopuses have three hearts.");
        assert_eq!(
            cache.get_cached_facts().as_deref(),
            Some("Octopuses have three hearts.")
        );
    }

    #[test]
    fn test_image_pool_rotation() {
        let (store, cache) = cache();
        store.set_item(CATEGORY_KEY, "nature").unwrap();
        cache.set_cached_images(&pool(), "nature");

        assert_eq!(cache.get_cached_images(), Some(pool()));
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("b", "B")));
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("a", "A")));
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("b", "B")));
    }

    #[test]
    fn test_default_category_matches_nature_pool() {
        let (_, cache) = cache();
        cache.set_cached_images(&pool(), "nature");
        assert_eq!(cache.get_cached_images(), Some(pool()));
    }

    #[test]
    fn test_category_change_invalidates_pool() {
        let (store, cache) = cache();
        store.set_item(CATEGORY_KEY, "nature").unwrap();
        cache.set_cached_images(&pool(), "nature");

        store.set_item(CATEGORY_KEY, "travel").unwrap();
        assert_eq!(cache.get_cached_images(), None);
        let before = store.len();
        assert_eq!(cache.get_next_image(), None);
        assert_eq!(store.len(), before);
        assert!(!store.contains_key(IMAGE_INDEX_KEY));

        // Pool itself was not deleted
        assert!(store.contains_key(IMAGES_KEY));
    }

    #[test]
    fn test_category_case_is_normalized() {
        let (store, cache) = cache();
        store.set_item(CATEGORY_KEY, "Nature").unwrap();
        cache.set_cached_images(&pool(), "NATURE");
        assert_eq!(cache.get_cached_images(), Some(pool()));
    }

    #[test]
    fn test_next_image_without_pool_writes_nothing() {
        let (store, cache) = cache();
        assert_eq!(cache.get_next_image(), None);
        assert!(store.is_empty());

        cache.set_cached_images(&[], "nature");
        let before = store.len();
        assert_eq!(cache.get_next_image(), None);
        assert_eq!(store.len(), before);
        assert!(!store.contains_key(IMAGE_INDEX_KEY));
    }

    #[test]
    fn test_single_image_pool() {
        let (_, cache) = cache();
        cache.set_cached_images(&[ImageEntry::new("only", "O")], "nature");
        for _ in 0..3 {
            assert_eq!(cache.get_next_image(), Some(ImageEntry::new("only", "O")));
            assert_eq!(cache.rotation_index(), 0);
        }
    }

    #[test]
    fn test_unparseable_index_reads_as_zero() {
        let (store, cache) = cache();
        cache.set_cached_images(&pool(), "nature");
        store.set_item(IMAGE_INDEX_KEY, "garbage").unwrap();
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("b", "B")));
    }

    #[test]
    fn test_out_of_range_index_wraps() {
        let (store, cache) = cache();
        cache.set_cached_images(&pool(), "nature");

        store.set_item(IMAGE_INDEX_KEY, &usize::MAX.to_string()).unwrap();
        // usize::MAX is odd: reads as 1, advances to 0
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("a", "A")));
        assert_eq!(cache.rotation_index(), 0);

        store.set_item(IMAGE_INDEX_KEY, "7").unwrap();
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("a", "A")));
    }

    #[test]
    fn test_replacing_pool_resets_rotation() {
        let (_, cache) = cache();
        let large: Vec<ImageEntry> = (0..5)
            .map(|i| ImageEntry::new(format!("u{}", i), format!("A{}", i)))
            .collect();
        cache.set_cached_images(&large, "nature");
        for _ in 0..4 {
            cache.get_next_image();
        }
        assert_eq!(cache.rotation_index(), 4);

        cache.set_cached_images(&pool(), "nature");
        assert_eq!(cache.rotation_index(), 0);
        assert_eq!(cache.get_next_image(), Some(ImageEntry::new("b", "B")));
    }

    #[test]
    fn test_clear_image_cache() {
        let (store, cache) = cache();
        store.set_item(CATEGORY_KEY, "space").unwrap();
        cache.set_cached_images(&pool(), "space");
        cache.get_next_image();

        cache.clear_image_cache();
        assert_eq!(cache.get_cached_images(), None);
        assert_eq!(store.get_item(IMAGE_INDEX_KEY).unwrap(), None);
        assert_eq!(store.get_item(CATEGORY_KEY).unwrap().as_deref(), Some("space"));
    }

    #[test]
    fn test_clear_all_keeps_preferences() {
        let (store, cache) = cache();
        store.set_item(CATEGORY_KEY, "art").unwrap();
        cache.set_cached_advice("a");
        cache.set_cached_facts("f");
        cache.set_cached_images(&pool(), "art");
        cache.get_next_image();

        cache.clear_all();
        for key in OWNED_KEYS {
            assert!(!store.contains_key(key), "{} should be cleared", key);
        }
        assert!(store.contains_key(CATEGORY_KEY));
    }

    #[test]
    fn test_concurrent_rotation_visits_each_index() {
        let (_, cache) = cache();
        let images: Vec<ImageEntry> = (0..4)
            .map(|i| ImageEntry::new(format!("u{}", i), "A"))
            .collect();
        cache.set_cached_images(&images, "nature");
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_next_image().unwrap())
            })
            .collect();
        let mut served: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().url)
            .collect();
        served.sort();

        // 8 advances over 4 images: each image exactly twice, index back at 0
        assert_eq!(served, vec!["u0", "u0", "u1", "u1", "u2", "u2", "u3", "u3"]);
        assert_eq!(cache.rotation_index(), 0);
    }
}
