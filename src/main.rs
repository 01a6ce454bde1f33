use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use event_discovery::{
    bootstrap, init_tracing, AppConfig, CancelHandle, ItemStore, SearchOutcome, SearchRequest,
    SearchService,
};
use tracing::{debug, info, warn};

const USAGE: &str = "usage: event-discovery <lat> <lon> [keyword...] [--save]";

struct CliArgs {
    request: SearchRequest,
    save: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut save = false;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--save" => save = true,
            "-h" | "--help" => bail!(USAGE),
            _ => positional.push(arg),
        }
    }

    if positional.len() < 2 {
        bail!(USAGE);
    }
    let lat: f64 = positional[0]
        .parse()
        .with_context(|| format!("invalid latitude `{}`", positional[0]))?;
    let lon: f64 = positional[1]
        .parse()
        .with_context(|| format!("invalid longitude `{}`", positional[1]))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("coordinates out of range: {lat}, {lon}");
    }

    let mut request = SearchRequest::new(lat, lon);
    let keyword = positional[2..].join(" ");
    if !keyword.is_empty() {
        request = request.with_keyword(keyword);
    }
    Ok(CliArgs { request, save })
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = parse_args(env::args().skip(1))?;
    let config = AppConfig::from_env();
    debug!(config = %serde_json::to_string(&config.public_profile())?, "configuration loaded");
    let service = SearchService::from_config(&config).context("event search is not configured")?;

    let (handle, signal) = CancelHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let items = match service.search_outcome(&args.request, Some(signal)).await {
        SearchOutcome::Completed { items } => items,
        SearchOutcome::Cancelled => {
            warn!("search cancelled");
            return Ok(());
        }
        SearchOutcome::Failed { reason } => bail!("event search failed: {reason}"),
    };

    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }

    if args.save {
        let data_dir = env::var("EVENT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let ctx = bootstrap(&data_dir, &config.database_file_name)
            .with_context(|| format!("failed to open item store in {}", data_dir.display()))?;
        let saved = ItemStore::new(ctx.connection).save_items(&items)?;
        info!(saved, path = %ctx.path.display(), "search results persisted");
    }

    Ok(())
}
