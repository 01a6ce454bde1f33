use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{EventFeed, EventQuery, EventSearchClient};
use crate::config::{AppConfig, DEFAULT_GEOHASH_PRECISION, DEFAULT_SEARCH_RADIUS};
use crate::errors::{AppError, AppResult};
use crate::item::Item;
use crate::normalizer;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub lat: f64,
    pub lon: f64,
    pub keyword: Option<String>,
}

impl SearchRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            keyword: None,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }
}

/// Result of one search call.
///
/// `Completed` with an empty list means the provider had no matches; failures and
/// cancellation are reported separately rather than collapsing into an empty list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Completed { items: Vec<Item> },
    Failed { reason: String },
    Cancelled,
}

impl SearchOutcome {
    pub fn items(&self) -> &[Item] {
        match self {
            SearchOutcome::Completed { items } => items,
            _ => &[],
        }
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            SearchOutcome::Completed { items } => items,
            _ => Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SearchOutcome::Failed { .. })
    }
}

/// Owner side of a cancellation pair; dropping it does not cancel.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelSignal) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelSignal { receiver })
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the paired handle cancels. Pends forever if the handle is dropped
    /// without cancelling.
    pub async fn cancelled(&mut self) {
        let handle_dropped = self.receiver.wait_for(|cancelled| *cancelled).await.is_err();
        if handle_dropped {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Clone)]
pub struct SearchService {
    feed: Arc<dyn EventFeed>,
    radius: u32,
    precision: usize,
}

impl SearchService {
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = EventSearchClient::maybe_new(config)?.ok_or_else(|| {
            AppError::Config("EVENT_API_KEY must be set to search for events".into())
        })?;
        Ok(Self {
            feed: Arc::new(client),
            radius: config.search_radius,
            precision: config.geohash_precision,
        })
    }

    pub fn with_feed(feed: Arc<dyn EventFeed>) -> Self {
        Self {
            feed,
            radius: DEFAULT_SEARCH_RADIUS,
            precision: DEFAULT_GEOHASH_PRECISION,
        }
    }

    pub fn radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision.max(1);
        self
    }

    /// Lenient entry point: any failure is logged and reported as an empty list.
    pub async fn search(&self, lat: f64, lon: f64, keyword: Option<&str>) -> Vec<Item> {
        let request = SearchRequest {
            lat,
            lon,
            keyword: keyword.map(str::to_string),
        };
        self.search_outcome(&request, None).await.into_items()
    }

    pub async fn search_outcome(
        &self,
        request: &SearchRequest,
        cancel: Option<CancelSignal>,
    ) -> SearchOutcome {
        let result = match cancel {
            Some(mut signal) => {
                if signal.is_cancelled() {
                    Err(AppError::Cancelled)
                } else {
                    tokio::select! {
                        result = self.fetch(request) => result,
                        _ = signal.cancelled() => Err(AppError::Cancelled),
                    }
                }
            }
            None => self.fetch(request).await,
        };

        match result {
            Ok(items) => {
                info!(count = items.len(), "event search completed");
                SearchOutcome::Completed { items }
            }
            Err(AppError::Cancelled) => {
                debug!("event search cancelled before completion");
                SearchOutcome::Cancelled
            }
            Err(err) => {
                warn!(?err, "event search failed; returning no results");
                SearchOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn fetch(&self, request: &SearchRequest) -> AppResult<Vec<Item>> {
        let query = EventQuery::new(
            request.lat,
            request.lon,
            request.keyword.as_deref(),
            self.radius,
            self.precision,
        );
        debug!(geo_point = %query.geo_point, keyword = %query.keyword, radius = query.radius, "searching events");
        let events = self.feed.fetch_events(&query).await?;
        Ok(events.iter().map(normalizer::normalize).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;

    #[derive(Default)]
    struct StubFeed {
        events: Vec<Value>,
        fail: bool,
        delay: Option<Duration>,
        seen: Mutex<Vec<EventQuery>>,
    }

    #[async_trait]
    impl EventFeed for StubFeed {
        async fn fetch_events(&self, query: &EventQuery) -> AppResult<Vec<Value>> {
            self.seen.lock().push(query.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AppError::Parse("unexpected shape".into()));
            }
            Ok(self.events.clone())
        }
    }

    fn events(ids: &[&str]) -> Vec<Value> {
        ids.iter().map(|id| json!({ "id": id, "name": format!("Event {id}") })).collect()
    }

    #[tokio::test]
    async fn returns_items_in_provider_order() {
        let feed = Arc::new(StubFeed {
            events: events(&["3", "1", "2"]),
            ..StubFeed::default()
        });
        let service = SearchService::with_feed(feed.clone());

        let items = service.search(29.68, -95.29, Some("jazz")).await;
        let ids: Vec<_> = items.iter().map(Item::item_id).collect();
        assert_eq!(ids, ["3", "1", "2"]);

        let seen = feed.seen.lock();
        assert_eq!(seen[0].keyword, "jazz");
        assert_eq!(seen[0].radius, 50);
        assert_eq!(seen[0].geo_point.len(), 8);
    }

    #[tokio::test]
    async fn applies_configured_radius_and_precision() {
        let feed = Arc::new(StubFeed::default());
        let service = SearchService::with_feed(feed.clone()).radius(10).precision(5);
        let outcome = service
            .search_outcome(&SearchRequest::new(42.6, -5.6), None)
            .await;
        assert_eq!(outcome, SearchOutcome::Completed { items: Vec::new() });

        let seen = feed.seen.lock();
        assert_eq!(seen[0].geo_point, "ezs42");
        assert_eq!(seen[0].radius, 10);
        assert_eq!(seen[0].keyword, "");
    }

    #[tokio::test]
    async fn failures_are_absorbed_by_lenient_search() {
        let service = SearchService::with_feed(Arc::new(StubFeed {
            events: events(&["1"]),
            fail: true,
            ..StubFeed::default()
        }));

        assert!(service.search(0.0, 0.0, None).await.is_empty());

        let outcome = service
            .search_outcome(&SearchRequest::new(0.0, 0.0), None)
            .await;
        assert!(outcome.is_failure());
        assert!(outcome.items().is_empty());
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_wait() {
        let service = SearchService::with_feed(Arc::new(StubFeed {
            events: events(&["1"]),
            delay: Some(Duration::from_secs(30)),
            ..StubFeed::default()
        }));
        let (handle, signal) = CancelHandle::new();

        let request = SearchRequest::new(1.0, 1.0).with_keyword("late");
        let search = service.search_outcome(&request, Some(signal));
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (outcome, _) = tokio::join!(search, canceller);

        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert!(outcome.into_items().is_empty());
    }

    #[tokio::test]
    async fn already_cancelled_signal_skips_the_feed() {
        let feed = Arc::new(StubFeed::default());
        let service = SearchService::with_feed(feed.clone());
        let (handle, signal) = CancelHandle::new();
        handle.cancel();
        assert!(signal.is_cancelled());

        let outcome = service
            .search_outcome(&SearchRequest::new(1.0, 1.0), Some(signal))
            .await;
        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert!(feed.seen.lock().is_empty());
    }

    #[test]
    fn requires_api_key_to_build_from_config() {
        let err = SearchService::from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert!(SearchService::from_config(&AppConfig::default().with_api_key("k")).is_ok());
    }
}
