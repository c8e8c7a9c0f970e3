//! Data models for dashboard content.
//!
//! - `WeatherSnapshot`, `Coordinates`: current conditions and where they were taken
//! - `ImageEntry`, `ImagePool`: background image candidates for one category

pub mod image;
pub mod weather;

pub use image::{ImageEntry, ImagePool};
pub use weather::{Coordinates, WeatherSnapshot};
