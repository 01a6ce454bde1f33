use std::time::Duration;
use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://app.ticketmaster.com/discovery/v2/events.json";
pub const DEFAULT_SEARCH_RADIUS: u32 = 50;
pub const DEFAULT_GEOHASH_PRECISION: usize = 8;
pub const MAX_GEOHASH_PRECISION: usize = 12;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: Option<SecretString>,
    pub search_radius: u32,
    pub geohash_precision: usize,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub database_file_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub api_base_url: String,
    pub search_radius: u32,
    pub geohash_precision: usize,
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub database_file_name: String,
    pub has_api_key: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            search_radius: DEFAULT_SEARCH_RADIUS,
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            user_agent: default_user_agent(),
            database_file_name: "event-discovery.db".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        let defaults = Self::default();
        Self {
            api_base_url: parse_string("EVENT_API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_key: parse_string("EVENT_API_KEY").map(SecretString::from),
            search_radius: parse_u32("EVENT_SEARCH_RADIUS", defaults.search_radius),
            geohash_precision: parse_usize("GEOHASH_PRECISION", defaults.geohash_precision)
                .clamp(1, MAX_GEOHASH_PRECISION),
            request_timeout_ms: parse_u64("EVENT_API_TIMEOUT_MS", defaults.request_timeout_ms)
                .max(1),
            user_agent: parse_string("EVENT_API_USER_AGENT").unwrap_or(defaults.user_agent),
            database_file_name: parse_string("DATABASE_FILE_NAME")
                .unwrap_or(defaults.database_file_name),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            api_base_url: self.api_base_url.clone(),
            search_radius: self.search_radius,
            geohash_precision: self.geohash_precision,
            request_timeout_ms: self.request_timeout_ms,
            user_agent: self.user_agent.clone(),
            database_file_name: self.database_file_name.clone(),
            has_api_key: self.api_key.is_some(),
        }
    }
}

fn default_user_agent() -> String {
    format!("event-discovery/{}", env!("CARGO_PKG_VERSION"))
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
