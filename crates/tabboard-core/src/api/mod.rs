//! Clients for the remote services feeding the dashboard.
//!
//! - OpenWeather current conditions
//! - Advice Slip quotes
//! - API Ninjas facts
//! - Unsplash background photos

mod client;
mod error;

pub use client::{ApiClient, ApiKeys};
pub use error::ApiError;
