//! Per-domain loaders for one dashboard activation.
//!
//! Every loader follows the same order: consult the cache (honoured only when
//! the session was already seen), fetch on a miss, write the result back,
//! then hand the value to the caller for rendering. When a fetch fails the
//! loader serves whatever is cached from an earlier session, then a built-in
//! fallback.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::cache::CacheStore;
use crate::location::LocationCache;
use crate::models::{Coordinates, ImageEntry, WeatherSnapshot};
use crate::session::{SessionTracker, WasNew};

pub const FALLBACK_ADVICE: &str = "Stay positive and keep moving forward!";
pub const FALLBACK_FACT: &str =
    "Did you know? The human brain contains approximately 86 billion neurons!";
pub const FALLBACK_IMAGE_URL: &str = "https://images.unsplash.com/photo-1560008511-11c63416e52d?crop=entropy&cs=tinysrgb&fit=max&fm=jpg&q=80&w=1080";
pub const FALLBACK_IMAGE_AUTHOR: &str = "Dodi Achmad";

/// Images requested per background fetch
pub const DEFAULT_IMAGE_BATCH_SIZE: usize = 10;

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Cached during the current session
    Cache,
    /// Freshly fetched
    Network,
    /// Cached by an earlier session, served because the fetch failed
    Stale,
    /// Built-in default
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Loaded<T> {
    fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }
}

/// Everything rendered on one new tab.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub weather: Loaded<Option<WeatherSnapshot>>,
    pub advice: Loaded<String>,
    pub fact: Loaded<String>,
    pub background: Loaded<ImageEntry>,
}

pub fn fallback_image() -> ImageEntry {
    ImageEntry::new(FALLBACK_IMAGE_URL, FALLBACK_IMAGE_AUTHOR)
}

/// Loader context for a single activation.
pub struct Dashboard {
    cache: Arc<CacheStore>,
    locations: LocationCache,
    session: WasNew,
    image_batch_size: usize,
}

impl Dashboard {
    /// Check the session once for this activation and build the loaders.
    pub fn new(cache: Arc<CacheStore>, session: &SessionTracker, locations: LocationCache) -> Self {
        let session = session.check_and_mark_session();
        info!(new_session = session.is_new(), "Dashboard activation");
        Self {
            cache,
            locations,
            session,
            image_batch_size: DEFAULT_IMAGE_BATCH_SIZE,
        }
    }

    pub fn with_image_batch_size(mut self, size: usize) -> Self {
        self.image_batch_size = size.max(1);
        self
    }

    pub fn is_new_session(&self) -> bool {
        self.session.is_new()
    }

    /// Cached value, but only within an already-seen session.
    fn session_hit<T>(&self, cached: impl FnOnce() -> Option<T>) -> Option<T> {
        if self.session.is_new() {
            None
        } else {
            cached()
        }
    }

    /// Shared flow for the text domains.
    async fn load_text<F, Fut>(
        &self,
        domain: &'static str,
        fetch: F,
        get: impl Fn(&CacheStore) -> Option<String>,
        set: impl FnOnce(&CacheStore, &str),
        fallback: &str,
    ) -> Loaded<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(text) = self.session_hit(|| get(&*self.cache)) {
            debug!(domain, "Cache hit");
            return Loaded::new(text, Source::Cache);
        }

        match fetch().await {
            Ok(text) => {
                set(&*self.cache, text.as_str());
                Loaded::new(text, Source::Network)
            }
            Err(e) => {
                warn!(domain, error = %e, "Fetch failed");
                match get(&*self.cache) {
                    Some(text) => Loaded::new(text, Source::Stale),
                    None => Loaded::new(fallback.to_string(), Source::Fallback),
                }
            }
        }
    }

    pub async fn load_advice<F, Fut>(&self, fetch: F) -> Loaded<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        self.load_text(
            "advice",
            fetch,
            CacheStore::get_cached_advice,
            CacheStore::set_cached_advice,
            FALLBACK_ADVICE,
        )
        .await
    }

    pub async fn load_facts<F, Fut>(&self, fetch: F) -> Loaded<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        self.load_text(
            "facts",
            fetch,
            CacheStore::get_cached_facts,
            CacheStore::set_cached_facts,
            FALLBACK_FACT,
        )
        .await
    }

    /// Resolve a position: a fresh stored one, a newly acquired one, or an
    /// expired stored one when acquisition fails.
    async fn resolve_location<L, LFut>(&self, locate: L) -> Option<Coordinates>
    where
        L: FnOnce() -> LFut,
        LFut: Future<Output = Result<Coordinates>>,
    {
        if let Some(coords) = self.locations.fresh_location() {
            return Some(coords);
        }
        match locate().await {
            Ok(coords) => {
                self.locations.store_location(coords);
                Some(coords)
            }
            Err(e) => {
                warn!(error = %e, "Could not acquire location, trying stored one");
                self.locations.any_location()
            }
        }
    }

    /// Weather for the current position. `None` means "weather unavailable".
    pub async fn load_weather<L, LFut, F, Fut>(
        &self,
        locate: L,
        fetch: F,
    ) -> Loaded<Option<WeatherSnapshot>>
    where
        L: FnOnce() -> LFut,
        LFut: Future<Output = Result<Coordinates>>,
        F: FnOnce(Coordinates) -> Fut,
        Fut: Future<Output = Result<WeatherSnapshot>>,
    {
        if let Some(weather) = self.session_hit(|| self.cache.get_cached_weather()) {
            debug!(domain = "weather", "Cache hit");
            return Loaded::new(Some(weather), Source::Cache);
        }

        let fetched = match self.resolve_location(locate).await {
            Some(coords) => fetch(coords).await,
            None => Err(anyhow!("no location available")),
        };

        match fetched {
            Ok(weather) => {
                self.cache.set_cached_weather(&weather);
                Loaded::new(Some(weather), Source::Network)
            }
            Err(e) => {
                warn!(domain = "weather", error = %e, "Fetch failed");
                match self.cache.get_cached_weather() {
                    Some(weather) => Loaded::new(Some(weather), Source::Stale),
                    None => Loaded::new(None, Source::Fallback),
                }
            }
        }
    }

    /// Background image for this activation.
    ///
    /// Within a session the stored pool rotates; otherwise a new batch is
    /// fetched for the configured category and its first image is shown.
    pub async fn load_background<F, Fut>(&self, fetch_batch: F) -> Loaded<ImageEntry>
    where
        F: FnOnce(String, usize) -> Fut,
        Fut: Future<Output = Result<Vec<ImageEntry>>>,
    {
        if let Some(image) = self.session_hit(|| self.cache.get_next_image()) {
            debug!(domain = "background", "Rotating cached pool");
            return Loaded::new(image, Source::Cache);
        }

        let category = self.cache.preferences().background_category();
        match fetch_batch(category.clone(), self.image_batch_size).await {
            Ok(images) if !images.is_empty() => {
                self.cache.set_cached_images(&images, &category);
                let first = images.into_iter().next().unwrap_or_else(fallback_image);
                Loaded::new(first, Source::Network)
            }
            Ok(_) => {
                warn!(category = %category, "Image fetch returned no photos");
                self.stale_or_default_image()
            }
            Err(e) => {
                warn!(category = %category, error = %e, "Image fetch failed");
                self.stale_or_default_image()
            }
        }
    }

    fn stale_or_default_image(&self) -> Loaded<ImageEntry> {
        match self.cache.get_next_image() {
            Some(image) => Loaded::new(image, Source::Stale),
            None => Loaded::new(fallback_image(), Source::Fallback),
        }
    }

    /// Run every loader concurrently against the real services.
    pub async fn load_all<L, LFut>(&self, api: &ApiClient, locate: L) -> DashboardView
    where
        L: FnOnce() -> LFut,
        LFut: Future<Output = Result<Coordinates>>,
    {
        let unit = self.cache.preferences().temperature_unit();

        let (weather, advice, fact, background) = futures::join!(
            self.load_weather(locate, move |c| api.fetch_weather(c.lat, c.lon, unit)),
            self.load_advice(move || api.fetch_advice()),
            self.load_facts(move || api.fetch_fact()),
            self.load_background(move |category, count| async move {
                api.fetch_images(&category, count).await
            }),
        );

        DashboardView {
            weather,
            advice,
            fact,
            background,
        }
    }
}
