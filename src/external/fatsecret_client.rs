// ABOUTME: FatSecret Platform API client using OAuth2 client credentials
// ABOUTME: Food search, detail, barcode and autocomplete lookups normalized to the shared food schema
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `FatSecret` Platform API Client
//!
//! Tokens come from the client-credentials grant and are cached until 30
//! seconds before they expire. `FatSecret` encodes numbers as strings and
//! collapses one-element lists into a bare object, so the response types
//! here accept both shapes.

use std::time::{Duration, Instant};

use fitai_core::errors::AppError;
use fitai_core::models::{lenient_number, FoodSource, NormalizedFood};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::FatSecretConfig;

const SERVICE: &str = "FatSecret";

/// Seconds shaved off the advertised token lifetime
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 30;

/// `FatSecret` credentials and endpoints
#[derive(Debug, Clone)]
pub struct FatSecretClientConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// REST base URL
    pub base_url: String,
    /// Token endpoint
    pub token_url: String,
}

impl FatSecretClientConfig {
    /// Build from server settings; `None` unless both credentials are set
    #[must_use]
    pub fn from_settings(settings: &FatSecretConfig) -> Option<Self> {
        match (&settings.client_id, &settings.client_secret) {
            (Some(id), Some(secret)) => Some(Self {
                client_id: id.clone(),
                client_secret: secret.clone(),
                base_url: settings.base_url.trim_end_matches('/').to_owned(),
                token_url: settings.token_url.clone(),
            }),
            _ => None,
        }
    }
}

/// Either a single value or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Value,
}

#[derive(Debug, Deserialize)]
struct FatSecretFood {
    food_id: Value,
    #[serde(default)]
    food_name: String,
    brand_name: Option<String>,
    servings: Option<Servings>,
}

#[derive(Debug, Deserialize)]
struct Servings {
    serving: Option<OneOrMany<Serving>>,
}

#[derive(Debug, Deserialize)]
struct Serving {
    metric_serving_amount: Option<Value>,
    metric_serving_unit: Option<String>,
    calories: Option<Value>,
    protein: Option<Value>,
    carbohydrate: Option<Value>,
    fat: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    foods_search: Option<SearchBody>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    food: Option<OneOrMany<FatSecretFood>>,
}

#[derive(Debug, Deserialize)]
struct FoodEnvelope {
    food: Option<FatSecretFood>,
}

#[derive(Debug, Deserialize)]
struct BarcodeEnvelope {
    food_id: Option<BarcodeValue>,
}

#[derive(Debug, Deserialize)]
struct BarcodeValue {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct AutocompleteEnvelope {
    suggestions: Option<Suggestions>,
}

#[derive(Debug, Deserialize)]
struct Suggestions {
    suggestion: Option<OneOrMany<String>>,
}

/// Render an id that may arrive as a number or a string
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

impl FatSecretFood {
    fn normalize(self) -> NormalizedFood {
        let serving = self
            .servings
            .and_then(|s| s.serving)
            .and_then(|s| s.into_vec().into_iter().next());

        let (serving_size, serving_unit, calories, protein, carbs, fats) = serving.map_or(
            (None, None, 0.0, 0.0, 0.0, 0.0),
            |s| {
                let amount = s
                    .metric_serving_amount
                    .as_ref()
                    .map(|v| lenient_number(Some(v)))
                    .filter(|v| *v > 0.0);
                (
                    amount,
                    s.metric_serving_unit,
                    lenient_number(s.calories.as_ref()),
                    lenient_number(s.protein.as_ref()),
                    lenient_number(s.carbohydrate.as_ref()),
                    lenient_number(s.fat.as_ref()),
                )
            },
        );

        NormalizedFood {
            source: FoodSource::Fatsecret,
            external_id: id_string(&self.food_id),
            name: self.food_name,
            brand: self.brand_name.filter(|b| !b.is_empty()),
            serving_size,
            serving_unit,
            calories,
            protein,
            carbs,
            fats,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// `FatSecret` Platform API client
pub struct FatSecretClient {
    config: FatSecretClientConfig,
    http_client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl FatSecretClient {
    /// Create a new client
    #[must_use]
    pub fn new(config: FatSecretClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Return a cached token or fetch a new one
    async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting FatSecret access token");
        let response = self
            .http_client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "basic")])
            .send()
            .await
            .map_err(|e| {
                AppError::external_service(SERVICE, format!("Token request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "FatSecret token request rejected");
            return Err(AppError::external_service(
                SERVICE,
                format!("Token request failed: {body}"),
            ));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("Invalid token response: {e}"))
        })?;
        let access_token = payload
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::external_service(SERVICE, "Token response missing access_token")
            })?;

        let expires_in = lenient_number(Some(&payload.expires_in)).max(0.0) as u64;
        let lifetime = expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(access_token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, AppError> {
        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(format!("{}{path}", self.config.base_url))
            .bearer_auth(token)
            .query(&[("format", "json")])
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("Request failed: {e}")))?;

        let status = response.status();
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

    /// Search foods
    ///
    /// # Errors
    ///
    /// Returns an error if the query is empty or the API call fails
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        page: u32,
    ) -> Result<Vec<NormalizedFood>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::invalid_input("Search query cannot be empty"));
        }
        let envelope: SearchEnvelope = self
            .get(
                "/foods/search/v3",
                &[
                    ("search_expression", query),
                    ("max_results", &max_results.to_string()),
                    ("page_number", &page.to_string()),
                ],
            )
            .await?;

        Ok(envelope
            .foods_search
            .and_then(|s| s.results)
            .and_then(|r| r.food)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(FatSecretFood::normalize)
            .collect())
    }

    /// Fetch one food by id
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the response has no food
    #[instrument(skip(self))]
    pub async fn get_food(&self, food_id: &str) -> Result<NormalizedFood, AppError> {
        let envelope: FoodEnvelope = self.get("/food/v5", &[("food_id", food_id)]).await?;
        envelope
            .food
            .map(FatSecretFood::normalize)
            .ok_or_else(|| AppError::not_found("FatSecret food"))
    }

    /// Resolve a barcode to a food
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` when the barcode is unknown
    #[instrument(skip(self))]
    pub async fn find_by_barcode(&self, barcode: &str) -> Result<NormalizedFood, AppError> {
        let envelope: BarcodeEnvelope = self
            .get("/food/barcode/v3", &[("barcode", barcode)])
            .await?;
        let food_id = envelope
            .food_id
            .map(|f| id_string(&f.value))
            .filter(|id| !id.is_empty() && id != "0")
            .ok_or_else(|| AppError::not_found("Food for barcode"))?;

        self.get_food(&food_id).await
    }

    /// Name suggestions for a partial expression
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails
    #[instrument(skip(self))]
    pub async fn autocomplete(&self, expression: &str) -> Result<Vec<String>, AppError> {
        let envelope: AutocompleteEnvelope = self
            .get("/foods/autocomplete/v2", &[("expression", expression)])
            .await?;
        Ok(envelope
            .suggestions
            .and_then(|s| s.suggestion)
            .map(OneOrMany::into_vec)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn client(server: &ServerGuard) -> FatSecretClient {
        FatSecretClient::new(FatSecretClientConfig {
            client_id: "id".to_owned(),
            client_secret: "secret".to_owned(),
            base_url: server.url(),
            token_url: format!("{}/connect/token", server.url()),
        })
    }

    async fn mock_token(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/connect/token")
            .match_header("authorization", "Basic aWQ6c2VjcmV0")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
                Matcher::UrlEncoded("scope".into(), "basic".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":86400,"token_type":"Bearer"}"#)
            .expect(hits)
            .create_async()
            .await
    }

    #[test]
    fn test_single_serving_object_and_string_numbers() {
        let food: FatSecretFood = serde_json::from_str(
            r#"{"food_id":"33691","food_name":"Greek Yogurt","brand_name":"Fage",
                "servings":{"serving":{"metric_serving_amount":"170.000","metric_serving_unit":"g",
                "calories":"100","protein":"18.00","carbohydrate":"6.00","fat":"0"}}}"#,
        )
        .unwrap();
        let normalized = food.normalize();
        assert_eq!(normalized.source, FoodSource::Fatsecret);
        assert_eq!(normalized.external_id, "33691");
        assert_eq!(normalized.serving_size, Some(170.0));
        assert!((normalized.protein - 18.0).abs() < f64::EPSILON);
        assert_eq!(normalized.brand.as_deref(), Some("Fage"));
    }

    #[test]
    fn test_first_of_many_servings_wins() {
        let food: FatSecretFood = serde_json::from_str(
            r#"{"food_id":1,"food_name":"Rice","servings":{"serving":[
                {"calories":"206","protein":"4.3","carbohydrate":"45","fat":"0.4"},
                {"calories":"999"}]}}"#,
        )
        .unwrap();
        let normalized = food.normalize();
        assert!((normalized.calories - 206.0).abs() < f64::EPSILON);
        assert_eq!(normalized.external_id, "1");
        assert!(normalized.serving_size.is_none());
    }

    #[tokio::test]
    async fn test_token_is_cached_between_calls() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 1).await;
        let _mock = server
            .mock("GET", "/foods/autocomplete/v2")
            .match_header("authorization", "Bearer tok")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("expression".into(), "chick".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"suggestions":{"suggestion":["chicken","chickpeas"]}}"#)
            .expect(2)
            .create_async()
            .await;

        let fatsecret = client(&server);
        let first = fatsecret.autocomplete("chick").await.unwrap();
        let second = fatsecret.autocomplete("chick").await.unwrap();

        token.assert_async().await;
        assert_eq!(first, vec!["chicken", "chickpeas"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_barcode_resolves_food_id_then_fetches_food() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _mock = server
            .mock("GET", "/food/barcode/v3")
            .match_query(Matcher::UrlEncoded("barcode".into(), "0041570054161".into()))
            .with_status(200)
            .with_body(r#"{"food_id":{"value":"4384"}}"#)
            .create_async()
            .await;
        let _mock = server
            .mock("GET", "/food/v5")
            .match_query(Matcher::UrlEncoded("food_id".into(), "4384".into()))
            .with_status(200)
            .with_body(
                r#"{"food":{"food_id":"4384","food_name":"Almond Milk","servings":{"serving":{"calories":"30","protein":"1","carbohydrate":"1","fat":"2.5"}}}}"#,
            )
            .create_async()
            .await;

        let food = client(&server)
            .find_by_barcode("0041570054161")
            .await
            .unwrap();
        assert_eq!(food.name, "Almond Milk");
        assert!((food.fats - 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_unknown_barcode_is_not_found() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _mock = server
            .mock("GET", "/food/barcode/v3")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"food_id":{"value":"0"}}"#)
            .create_async()
            .await;

        let err = client(&server).find_by_barcode("123").await.unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
