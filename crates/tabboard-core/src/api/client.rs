//! HTTP client for the dashboard's remote data sources.
//!
//! Responses are mapped into the domain models from [`crate::models`]; the
//! raw response shapes stay private to this module.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::ApiError;
use crate::models::{ImageEntry, WeatherSnapshot};
use crate::preferences::TemperatureUnit;

// ============================================================================
// Constants
// ============================================================================

const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const ADVICE_URL: &str = "https://api.adviceslip.com/advice";
const FACTS_URL: &str = "https://api.api-ninjas.com/v1/facts";
const UNSPLASH_RANDOM_URL: &str = "https://api.unsplash.com/photos/random";

/// A new tab should render quickly; give up on slow services.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Unsplash caps `count` on the random endpoint at 30.
const MAX_IMAGE_BATCH: usize = 30;

const MAX_RATE_LIMIT_RETRIES: u32 = 2;
const INITIAL_BACKOFF_MS: u64 = 500;

/// Keys for the services that require one. Advice needs none.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openweather: Option<String>,
    pub api_ninjas: Option<String>,
    pub unsplash: Option<String>,
}

// ===== Raw response shapes =====

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    weather: Vec<WeatherCondition>,
    main: WeatherMain,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct AdviceResponse {
    slip: AdviceSlip,
}

#[derive(Debug, Deserialize)]
struct AdviceSlip {
    advice: String,
}

#[derive(Debug, Deserialize)]
struct FactItem {
    fact: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
    user: UnsplashUser,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: String,
}

/// Client for all dashboard services.
/// Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    keys: ApiKeys,
}

impl ApiClient {
    pub fn new(keys: ApiKeys) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, keys })
    }

    fn key(value: &Option<String>, service: &'static str) -> Result<String> {
        value
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::MissingApiKey(service).into())
    }

    /// GET `url` and decode the body, backing off on rate limiting.
    ///
    /// The body is read as text first: some services label JSON as text/html.
    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: header::HeaderMap,
    ) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(url)
                .query(query)
                .headers(headers.clone())
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            let status = response.status();
            if status.as_u16() == 429 {
                retries += 1;
                if retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited.into());
                }
                warn!(url, retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response
                .text()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;
            if !status.is_success() {
                return Err(ApiError::from_status(status, &body).into());
            }

            debug!(url, bytes = body.len(), "Fetched");
            return serde_json::from_str(&body)
                .with_context(|| format!("Failed to parse JSON response from {}", url));
        }
    }

    // ===== Data Fetching Methods =====

    /// Current conditions at a position.
    pub async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        unit: TemperatureUnit,
    ) -> Result<WeatherSnapshot> {
        let appid = Self::key(&self.keys.openweather, "OpenWeather")?;
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", unit.as_str().to_string()),
            ("appid", appid),
        ];
        let response: WeatherResponse = self
            .get(WEATHER_URL, &query, header::HeaderMap::new())
            .await?;
        weather_snapshot(response)
    }

    /// A random piece of advice.
    pub async fn fetch_advice(&self) -> Result<String> {
        let response: AdviceResponse = self
            .get(ADVICE_URL, &[], header::HeaderMap::new())
            .await?;
        Ok(response.slip.advice)
    }

    /// A random fact.
    pub async fn fetch_fact(&self) -> Result<String> {
        let key = Self::key(&self.keys.api_ninjas, "API Ninjas")?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-Api-Key",
            header::HeaderValue::from_str(&key).context("API Ninjas key is not a valid header")?,
        );
        let facts: Vec<FactItem> = self.get(FACTS_URL, &[], headers).await?;
        first_fact(facts)
    }

    /// A batch of landscape photos for a category.
    pub async fn fetch_images(&self, category: &str, count: usize) -> Result<Vec<ImageEntry>> {
        let client_id = Self::key(&self.keys.unsplash, "Unsplash")?;
        let count = count.clamp(1, MAX_IMAGE_BATCH);
        let query = [
            ("query", category.to_string()),
            ("orientation", "landscape".to_string()),
            ("count", count.to_string()),
            ("client_id", client_id),
        ];
        let photos: Vec<UnsplashPhoto> = self
            .get(UNSPLASH_RANDOM_URL, &query, header::HeaderMap::new())
            .await?;
        Ok(photos.into_iter().map(image_entry).collect())
    }
}

fn weather_snapshot(response: WeatherResponse) -> Result<WeatherSnapshot> {
    let condition = response
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::InvalidResponse("weather response has no conditions".into()))?;
    Ok(WeatherSnapshot {
        condition: condition.main,
        description: condition.description,
        temperature: response.main.temp,
        city: response.name,
    })
}

fn first_fact(facts: Vec<FactItem>) -> Result<String> {
    facts
        .into_iter()
        .next()
        .map(|f| f.fact)
        .ok_or_else(|| ApiError::InvalidResponse("facts response was empty".into()).into())
}

fn image_entry(photo: UnsplashPhoto) -> ImageEntry {
    ImageEntry {
        url: photo.urls.regular,
        author: photo.user.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weather_response() {
        let json = r#"{"coord":{"lon":-74.0,"lat":40.7},"weather":[{"id":800,"main":"Clear","description":"clear sky","icon":"01d"}],"main":{"temp":71.6,"feels_like":70.2,"humidity":40},"name":"Test City","cod":200}"#;
        let response: WeatherResponse =
            serde_json::from_str(json).expect("Failed to parse weather test JSON");
        let snapshot = weather_snapshot(response).unwrap();

        assert_eq!(snapshot.condition, "Clear");
        assert_eq!(snapshot.description, "clear sky");
        assert_eq!(snapshot.city, "Test City");
        assert!((snapshot.temperature - 71.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weather_without_conditions_is_invalid() {
        let json = r#"{"weather":[],"main":{"temp":1.0},"name":"Nowhere"}"#;
        let response: WeatherResponse = serde_json::from_str(json).unwrap();
        assert!(weather_snapshot(response).is_err());
    }

    #[test]
    fn test_parse_advice_response() {
        let json = r#"{"slip": { "id": 41, "advice": "Don't drink bleach."}}"#;
        let response: AdviceResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.slip.advice, "Don't drink bleach.");
    }

    #[test]
    fn test_parse_facts_response() {
        let json = r#"[{"fact": "Honey never spoils."}, {"fact": "Second"}]"#;
        let facts: Vec<FactItem> = serde_json::from_str(json).unwrap();
        assert_eq!(first_fact(facts).unwrap(), "Honey never spoils.");
        assert!(first_fact(Vec::new()).is_err());
    }

    #[test]
    fn test_parse_unsplash_batch() {
        let json = r#"[
            {"id":"a1","urls":{"raw":"r","full":"f","regular":"https://images.unsplash.com/a1?ixid=x"},"user":{"name":"Ann Adams","username":"ann"}},
            {"id":"b2","urls":{"regular":"https://images.unsplash.com/b2?ixid=y"},"user":{"name":"Bo Brown"}}
        ]"#;
        let photos: Vec<UnsplashPhoto> = serde_json::from_str(json).unwrap();
        let images: Vec<ImageEntry> = photos.into_iter().map(image_entry).collect();

        assert_eq!(
            images,
            vec![
                ImageEntry::new("https://images.unsplash.com/a1?ixid=x", "Ann Adams"),
                ImageEntry::new("https://images.unsplash.com/b2?ixid=y", "Bo Brown"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_keys_fail_before_any_request() {
        let client = ApiClient::new(ApiKeys::default()).unwrap();

        let err = client.fetch_fact().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::MissingApiKey("API Ninjas"))
        ));

        let err = client.fetch_images("nature", 5).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::MissingApiKey("Unsplash"))
        ));

        let err = client
            .fetch_weather(0.0, 0.0, TemperatureUnit::Imperial)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::MissingApiKey("OpenWeather"))
        ));
    }
}
