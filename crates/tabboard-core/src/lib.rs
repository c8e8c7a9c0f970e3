//! tabboard core - caching and session lifecycle for a new-tab dashboard.
//!
//! Each piece of remote content (weather, advice, facts, background images)
//! is served from the cache while the browsing session that fetched it is
//! still alive, and fetched again once a new session starts. Background
//! images are fetched in batches per category and rotated round-robin.
//!
//! Storage is injected: a durable [`storage::KeyValueStore`] backs the
//! [`cache::CacheStore`], and a separate ephemeral one backs the
//! [`session::SessionTracker`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod location;
pub mod models;
pub mod preferences;
pub mod session;
pub mod storage;

pub use cache::{CacheEntry, CacheStore};
pub use error::StorageError;
pub use loader::{Dashboard, DashboardView, Loaded, Source};
pub use session::{SessionTracker, WasNew};
