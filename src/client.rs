use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use crate::config::AppConfig;
use crate::document::kind;
use crate::errors::{AppError, AppResult};
use crate::geo;

const EMBEDDED: &str = "_embedded";
const EVENTS: &str = "events";
const API_KEY_PARAM: &str = "apikey";

/// Provider query parameters, minus the credential which stays with the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub geo_point: String,
    pub keyword: String,
    pub radius: u32,
}

impl EventQuery {
    /// An absent keyword means "no keyword restriction" and is sent as an empty value.
    pub fn new(lat: f64, lon: f64, keyword: Option<&str>, radius: u32, precision: usize) -> Self {
        Self {
            geo_point: geo::encode(lat, lon, precision),
            keyword: keyword.unwrap_or_default().to_string(),
            radius,
        }
    }
}

#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Raw provider event objects, in provider ranking order.
    async fn fetch_events(&self, query: &EventQuery) -> AppResult<Vec<Value>>;
}

#[derive(Clone)]
pub struct EventSearchClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
}

impl EventSearchClient {
    /// Returns `None` when no API key is configured.
    pub fn maybe_new(config: &AppConfig) -> AppResult<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let base_url = Url::parse(config.api_base_url.trim()).map_err(|err| {
            AppError::Config(format!("invalid event API base URL: {err}"))
        })?;
        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Some(Self {
            http,
            base_url,
            api_key,
        }))
    }

    pub fn query_url(&self, query: &EventQuery) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair(API_KEY_PARAM, self.api_key.expose_secret())
            .append_pair("geoPoint", &query.geo_point)
            .append_pair("keyword", &query.keyword)
            .append_pair("radius", &query.radius.to_string());
        url
    }
}

#[async_trait]
impl EventFeed for EventSearchClient {
    async fn fetch_events(&self, query: &EventQuery) -> AppResult<Vec<Value>> {
        let url = self.query_url(query);
        debug!(url = %redacted(&url), "requesting provider events");

        let response = self.http.get(url).send().await.map_err(without_url)?;
        let status = response.status();
        debug!(%status, "provider responded");

        let body = response
            .error_for_status()
            .map_err(without_url)?
            .bytes()
            .await
            .map_err(without_url)?;
        let envelope: Value = serde_json::from_slice(&body)?;
        extract_events(envelope)
    }
}

/// Pulls `_embedded.events` out of a provider envelope.
///
/// A missing or null `_embedded`, or a missing or null `events` beneath it, means zero
/// results. Keys that are present with the wrong type are envelope errors.
pub fn extract_events(envelope: Value) -> AppResult<Vec<Value>> {
    let mut envelope = match envelope {
        Value::Object(map) => map,
        other => {
            return Err(AppError::Parse(format!(
                "expected top-level object, found {}",
                kind(&other)
            )))
        }
    };

    let mut embedded = match envelope.remove(EMBEDDED) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(AppError::Parse(format!(
                "expected `{EMBEDDED}` object, found {}",
                kind(&other)
            )))
        }
    };

    let events = match embedded.remove(EVENTS) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(events)) => events,
        Some(other) => {
            return Err(AppError::Parse(format!(
                "expected `{EVENTS}` array, found {}",
                kind(&other)
            )))
        }
    };

    if let Some((index, event)) = events.iter().enumerate().find(|(_, e)| !e.is_object()) {
        return Err(AppError::Parse(format!(
            "event {index} is {} rather than an object",
            kind(event)
        )));
    }

    Ok(events)
}

/// reqwest errors carry the request URL, credential included.
fn without_url(err: reqwest::Error) -> AppError {
    AppError::Http(err.without_url())
}

fn redacted(url: &Url) -> Url {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == API_KEY_PARAM {
                "<redacted>".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    let mut safe = url.clone();
    safe.query_pairs_mut().clear().extend_pairs(pairs);
    safe
}
