// ABOUTME: USDA FoodData Central API client for nutritional data retrieval
// ABOUTME: Implements food search, detail retrieval, caching, rate limiting and normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! USDA `FoodData` Central API Client
//!
//! Search and detail lookups against `FoodData` Central, normalized into
//! [`NormalizedFood`]. The API is free and only needs an API key.
//!
//! # Features
//! - Food search with page size
//! - Detail retrieval by FDC id
//! - 24-hour bounded caching to minimize API calls
//! - Rate limiting (30 requests per minute)
//!
//! # API Reference
//! USDA `FoodData` Central API: <https://fdc.nal.usda.gov/api-guide.html>

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use fitai_core::errors::AppError;
use fitai_core::models::{FoodSource, NormalizedFood};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::config::UsdaConfig;

const SERVICE: &str = "USDA API";

/// Energy (kcal)
const NUTRIENT_ENERGY: u32 = 1008;
/// Energy, Atwater general factors
const NUTRIENT_ENERGY_ATWATER_GENERAL: u32 = 2047;
/// Energy, Atwater specific factors
const NUTRIENT_ENERGY_ATWATER_SPECIFIC: u32 = 2048;
const NUTRIENT_PROTEIN: u32 = 1003;
const NUTRIENT_FAT: u32 = 1004;
const NUTRIENT_CARBS: u32 = 1005;

/// USDA API client configuration
#[derive(Debug, Clone)]
pub struct UsdaClientConfig {
    /// USDA API key (free from <https://fdc.nal.usda.gov/api-key-signup.html>)
    pub api_key: String,
    /// Base URL for USDA API (default: <https://api.nal.usda.gov/fdc/v1>)
    pub base_url: String,
    /// Cache TTL in seconds (default: 86400 = 24 hours)
    pub cache_ttl_secs: u64,
    /// Rate limit per minute (default: 30)
    pub rate_limit_per_minute: u32,
    /// Entries kept per cache before the soonest-expiring is evicted (default: 1000)
    pub max_cache_entries: usize,
}

impl Default for UsdaClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
            cache_ttl_secs: 86_400,
            rate_limit_per_minute: 30,
            max_cache_entries: 1000,
        }
    }
}

impl UsdaClientConfig {
    /// Build from server settings; `None` when no API key is configured
    #[must_use]
    pub fn from_settings(settings: &UsdaConfig) -> Option<Self> {
        settings.api_key.as_ref().map(|key| Self {
            api_key: key.clone(),
            base_url: settings.base_url.clone(),
            ..Self::default()
        })
    }
}

/// Search response envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<UsdaFood>,
}

/// Food as returned by both `/foods/search` and `/food/{id}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaFood {
    fdc_id: u64,
    #[serde(default)]
    description: String,
    brand_owner: Option<String>,
    brand_name: Option<String>,
    serving_size: Option<f64>,
    serving_size_unit: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<UsdaNutrient>,
}

/// Search results carry `nutrientId`/`value`; details nest `nutrient.id` with `amount`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsdaNutrient {
    nutrient_id: Option<u32>,
    value: Option<f64>,
    nutrient: Option<NutrientInfo>,
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NutrientInfo {
    id: u32,
}

impl UsdaNutrient {
    fn id(&self) -> Option<u32> {
        self.nutrient_id.or_else(|| self.nutrient.as_ref().map(|n| n.id))
    }

    fn amount(&self) -> f64 {
        self.value.or(self.amount).unwrap_or(0.0)
    }
}

impl UsdaFood {
    fn nutrient(&self, id: u32) -> Option<f64> {
        self.food_nutrients
            .iter()
            .find(|n| n.id() == Some(id))
            .map(UsdaNutrient::amount)
    }

    fn normalize(&self) -> NormalizedFood {
        let calories = self
            .nutrient(NUTRIENT_ENERGY)
            .or_else(|| self.nutrient(NUTRIENT_ENERGY_ATWATER_GENERAL))
            .or_else(|| self.nutrient(NUTRIENT_ENERGY_ATWATER_SPECIFIC))
            .unwrap_or(0.0);

        NormalizedFood {
            source: FoodSource::Usda,
            external_id: self.fdc_id.to_string(),
            name: self.description.clone(),
            brand: self.brand_owner.clone().or_else(|| self.brand_name.clone()),
            serving_size: self.serving_size,
            serving_unit: self.serving_size_unit.clone(),
            calories,
            protein: self.nutrient(NUTRIENT_PROTEIN).unwrap_or(0.0),
            carbs: self.nutrient(NUTRIENT_CARBS).unwrap_or(0.0),
            fats: self.nutrient(NUTRIENT_FAT).unwrap_or(0.0),
        }
    }
}

/// Cache entry with expiration
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

/// Insert into a TTL cache, dropping expired entries first and then the
/// soonest-expiring ones until there is room under `max_entries`
fn insert_bounded<K: Eq + Hash + Clone, T>(
    cache: &mut HashMap<K, CacheEntry<T>>,
    key: K,
    entry: CacheEntry<T>,
    max_entries: usize,
) {
    let now = Instant::now();
    cache.retain(|_, e| e.expires_at > now);
    while !cache.contains_key(&key) && cache.len() >= max_entries.max(1) {
        let Some(oldest) = cache
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, _)| k.clone())
        else {
            break;
        };
        cache.remove(&oldest);
    }
    cache.insert(key, entry);
}

/// Sliding-window limiter for outbound requests
#[derive(Debug)]
struct RateLimiter {
    requests: Vec<Instant>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    const fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Vec::new(),
            limit,
            window,
        }
    }

    fn can_request(&mut self) -> bool {
        let now = Instant::now();
        self.requests
            .retain(|&t| now.duration_since(t) < self.window);
        self.requests.len() < self.limit as usize
    }

    fn record_request(&mut self) {
        self.requests.push(Instant::now());
    }

    async fn wait_if_needed(&mut self) {
        while !self.can_request() {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// USDA `FoodData` Central API Client
pub struct UsdaClient {
    config: UsdaClientConfig,
    http_client: reqwest::Client,
    search_cache: RwLock<HashMap<String, CacheEntry<Vec<NormalizedFood>>>>,
    details_cache: RwLock<HashMap<u64, CacheEntry<NormalizedFood>>>,
    rate_limiter: Mutex<RateLimiter>,
}

impl UsdaClient {
    /// Create a new USDA API client
    #[must_use]
    pub fn new(config: UsdaClientConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_per_minute, Duration::from_secs(60));

        Self {
            config,
            http_client: reqwest::Client::new(),
            search_cache: RwLock::new(HashMap::new()),
            details_cache: RwLock::new(HashMap::new()),
            rate_limiter: Mutex::new(rate_limiter),
        }
    }

    fn cache_expiry(&self) -> Instant {
        Instant::now() + Duration::from_secs(self.config.cache_ttl_secs)
    }

    async fn throttle(&self) {
        let mut limiter = self.rate_limiter.lock().await;
        limiter.wait_if_needed().await;
        limiter.record_request();
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, AppError> {
        self.throttle().await;

        let response = self
            .http_client
            .get(url)
            .query(query)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(AppError::not_found("USDA food"));
        }
        if !status.is_success() {
            return Err(AppError::external_service(
                SERVICE,
                format!(
                    "HTTP {status}: {}",
                    response.text().await.unwrap_or_default()
                ),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("JSON parse error: {e}")))
    }

    /// Search for foods by query string
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty, the page size is outside
    /// 1..=200, or the API request fails
    #[instrument(skip(self))]
    pub async fn search_foods(
        &self,
        query: &str,
        page_size: u32,
    ) -> Result<Vec<NormalizedFood>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        if page_size == 0 || page_size > 200 {
            return Err(AppError::invalid_input(
                "Page size must be between 1 and 200",
            ));
        }

        let cache_key = format!("{query}:{page_size}");
        {
            let cache = self.search_cache.read().await;
            if let Some(entry) = cache.get(&cache_key) {
                if Instant::now() < entry.expires_at {
                    debug!("USDA search cache hit");
                    return Ok(entry.data.clone());
                }
            }
        }

        let url = format!("{}/foods/search", self.config.base_url);
        let response: SearchResponse = self
            .get_json(&url, &[("query", query), ("pageSize", &page_size.to_string())])
            .await?;

        let foods: Vec<NormalizedFood> = response.foods.iter().map(UsdaFood::normalize).collect();

        insert_bounded(
            &mut *self.search_cache.write().await,
            cache_key,
            CacheEntry {
                data: foods.clone(),
                expires_at: self.cache_expiry(),
            },
            self.config.max_cache_entries,
        );

        Ok(foods)
    }

    /// Get one food by FDC id
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` for unknown ids, or an external service error
    #[instrument(skip(self))]
    pub async fn get_food(&self, fdc_id: u64) -> Result<NormalizedFood, AppError> {
        {
            let cache = self.details_cache.read().await;
            if let Some(entry) = cache.get(&fdc_id) {
                if Instant::now() < entry.expires_at {
                    return Ok(entry.data.clone());
                }
            }
        }

        let url = format!("{}/food/{fdc_id}", self.config.base_url);
        let food: UsdaFood = self.get_json(&url, &[]).await?;
        let normalized = food.normalize();

        insert_bounded(
            &mut *self.details_cache.write().await,
            fdc_id,
            CacheEntry {
                data: normalized.clone(),
                expires_at: self.cache_expiry(),
            },
            self.config.max_cache_entries,
        );

        Ok(normalized)
    }

    /// Drop every cached search and detail
    pub async fn clear_caches(&self) {
        self.search_cache.write().await.clear();
        self.details_cache.write().await.clear();
    }

    /// Cache sizes as `(search, details)`
    pub async fn cache_stats(&self) -> (usize, usize) {
        let search_count = self.search_cache.read().await.len();
        let details_count = self.details_cache.read().await.len();
        (search_count, details_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client(base_url: &str) -> UsdaClient {
        UsdaClient::new(UsdaClientConfig {
            api_key: "test-key".to_owned(),
            base_url: base_url.to_owned(),
            ..UsdaClientConfig::default()
        })
    }

    #[test]
    fn test_energy_falls_back_to_atwater() {
        let food: UsdaFood = serde_json::from_str(
            r#"{"fdcId":1,"description":"Oats","foodNutrients":[
                {"nutrientId":2047,"value":389.0},
                {"nutrientId":1003,"value":16.9},
                {"nutrientId":1005,"value":66.3},
                {"nutrientId":1004,"value":6.9}]}"#,
        )
        .unwrap();
        let normalized = food.normalize();
        assert!((normalized.calories - 389.0).abs() < f64::EPSILON);
        assert!((normalized.protein - 16.9).abs() < f64::EPSILON);
        assert_eq!(normalized.source, FoodSource::Usda);
    }

    #[test]
    fn test_detail_shape_uses_nested_nutrient_ids() {
        let food: UsdaFood = serde_json::from_str(
            r#"{"fdcId":171477,"description":"Chicken breast","servingSize":100,"servingSizeUnit":"g",
                "foodNutrients":[{"nutrient":{"id":1008},"amount":165.0},
                                 {"nutrient":{"id":1003},"amount":31.02}]}"#,
        )
        .unwrap();
        let normalized = food.normalize();
        assert_eq!(normalized.external_id, "171477");
        assert!((normalized.calories - 165.0).abs() < f64::EPSILON);
        assert_eq!(normalized.serving_unit.as_deref(), Some("g"));
        assert!(normalized.fats.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_search_is_cached() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/foods/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "apple".into()),
                Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"foods":[{"fdcId":171688,"description":"Apples, raw","brandOwner":null,
                    "foodNutrients":[{"nutrientId":1008,"value":52}]}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let usda = client(&server.url());
        let first = usda.search_foods("apple", 20).await.unwrap();
        let second = usda.search_foods("apple", 20).await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first[0].name, "Apples, raw");
        assert_eq!(usda.cache_stats().await, (1, 0));
    }

    #[test]
    fn test_bounded_insert_prunes_expired_then_oldest() {
        let now = Instant::now();
        let entry = |secs: u64| CacheEntry {
            data: (),
            expires_at: now + Duration::from_secs(secs),
        };
        let mut cache = HashMap::new();
        cache.insert("stale", CacheEntry { data: (), expires_at: now });
        cache.insert("soon", entry(10));
        cache.insert("later", entry(100));

        insert_bounded(&mut cache, "new", entry(1000), 2);
        let mut keys: Vec<_> = cache.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["later", "new"]);

        // Refreshing an existing key never evicts another entry
        insert_bounded(&mut cache, "later", entry(2000), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key("new"));
    }

    #[tokio::test]
    async fn test_expired_searches_do_not_accumulate() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/foods/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"foods":[]}"#)
            .expect(3)
            .create_async()
            .await;

        let usda = UsdaClient::new(UsdaClientConfig {
            api_key: "test-key".to_owned(),
            base_url: server.url(),
            cache_ttl_secs: 0,
            ..UsdaClientConfig::default()
        });
        for query in ["apple", "banana", "cherry"] {
            usda.search_foods(query, 5).await.unwrap();
        }
        assert_eq!(usda.cache_stats().await, (1, 0));

        usda.clear_caches().await;
        assert_eq!(usda.cache_stats().await, (0, 0));
    }

    #[tokio::test]
    async fn test_unknown_food_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/food/999")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server.url()).get_food(999).await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[tokio::test]
    async fn test_rejects_bad_page_size() {
        let usda = client("http://127.0.0.1:9");
        assert!(usda.search_foods("apple", 0).await.is_err());
        assert!(usda.search_foods("", 10).await.is_err());
    }
}
