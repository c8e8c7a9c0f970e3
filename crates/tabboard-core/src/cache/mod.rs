//! Client-side caching for dashboard content.
//!
//! This module provides the `CacheStore` for storing and retrieving dashboard
//! data in durable key-value storage. Entries carry a write timestamp but no
//! expiry: whether a present entry is honoured depends on the session (see
//! [`crate::session`]).
//!
//! Cached domains:
//! - Weather snapshot
//! - Advice and fact strings
//! - Background image pool plus its rotation index

pub mod entry;
pub mod store;

pub use entry::CacheEntry;
pub use store::{
    CacheStore, ADVICE_KEY, FACTS_KEY, IMAGES_KEY, IMAGE_INDEX_KEY, WEATHER_KEY,
};
