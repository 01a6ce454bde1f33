mod client;
mod config;
mod db;
mod document;
mod errors;
pub mod geo;
mod item;
pub mod normalizer;
mod service;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use client::{extract_events, EventFeed, EventQuery, EventSearchClient};
pub use config::{AppConfig, PublicAppConfig};
pub use db::{bootstrap, DatabaseContext, ItemStore};
pub use document::DocumentExt;
pub use errors::{AppError, AppResult};
pub use item::{Item, ItemParams};
pub use service::{CancelHandle, CancelSignal, SearchOutcome, SearchRequest, SearchService};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,event_discovery=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init();
    });
}
