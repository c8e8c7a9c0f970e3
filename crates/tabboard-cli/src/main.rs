//! tabboard - render the new-tab dashboard in a terminal.
//!
//! Each run is one new-tab activation. Content fetched earlier in the same
//! session is served from the cache; `--new-session` ends the session first.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tabboard_core::api::ApiClient;
use tabboard_core::config::Config;
use tabboard_core::location::LocationCache;
use tabboard_core::preferences::{is_builtin_category, TemperatureUnit};
use tabboard_core::storage::{FileStore, KeyValueStore};
use tabboard_core::{CacheStore, Dashboard, DashboardView, Loaded, SessionTracker, Source};

#[derive(Parser, Debug)]
#[command(name = "tabboard")]
#[command(about = "A new-tab dashboard: weather, advice, a fact and a background photo")]
#[command(version)]
struct Args {
    /// Path to config file (default: $XDG_CONFIG_HOME/tabboard/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start a new browsing session, ignoring content cached by the last one
    #[arg(short, long)]
    new_session: bool,

    /// Background category (nature, travel, architecture, technology, food, art, animals, space)
    #[arg(long)]
    category: Option<String>,

    /// Temperature unit: imperial or metric
    #[arg(long)]
    units: Option<TemperatureUnit>,

    /// Drop the cached background images before loading
    #[arg(long)]
    clear_images: bool,

    /// Drop every cached domain before loading
    #[arg(long)]
    clear_cache: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn source_tag(source: Source) -> &'static str {
    match source {
        Source::Cache => "cached",
        Source::Network => "fresh",
        Source::Stale => "stale",
        Source::Fallback => "default",
    }
}

fn print_line<T>(label: &str, loaded: &Loaded<T>, text: &str) {
    println!("{:<10} {} [{}]", label, text, source_tag(loaded.source));
}

fn print_view(view: &DashboardView, unit: TemperatureUnit) {
    let weather = match &view.weather.value {
        Some(w) => format!(
            "{}{} {} - {}",
            w.temperature.round() as i64,
            unit.symbol(),
            w.city,
            w.description
        ),
        None => "Weather unavailable".to_string(),
    };
    print_line("Weather", &view.weather, &weather);
    print_line("Advice", &view.advice, &format!("\"{}\"", view.advice.value));
    print_line("Fact", &view.fact, &view.fact.value);
    print_line("Background", &view.background, &view.background.value.url);
    println!("{:<10} {}", "", view.background.value.credit());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _log_guard = init_tracing(args.log_file.as_ref())?;
    info!("tabboard starting");

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let cache_dir = config.cache_dir()?;
    let durable = FileStore::open(Config::profile_dir(&cache_dir))
        .context("Failed to open profile storage")?;
    let ephemeral = FileStore::open(Config::session_dir(&cache_dir))
        .context("Failed to open session storage")?;
    if args.new_session {
        ephemeral.clear().context("Failed to end previous session")?;
    }

    let durable: Arc<dyn KeyValueStore> = Arc::new(durable);
    let cache = Arc::new(CacheStore::new(durable.clone()));
    let tracker = SessionTracker::new(Arc::new(ephemeral));

    if args.clear_cache {
        cache.clear_all();
    } else if args.clear_images {
        cache.clear_image_cache();
    }

    if let Some(category) = &args.category {
        if !is_builtin_category(category) {
            eprintln!("Note: '{}' is not a built-in category", category);
        }
        if cache.preferences().set_background_category(category) {
            cache.clear_image_cache();
        }
    }

    if let Some(unit) = args.units {
        if cache.preferences().set_temperature_unit(unit) {
            // Cached temperatures are in the old unit
            cache.clear_cached_weather();
        }
    }

    let api = ApiClient::new(config.api_keys())?;
    let dashboard = Dashboard::new(cache.clone(), &tracker, LocationCache::new(durable))
        .with_image_batch_size(config.image_batch_size);
    if let Some(started) = tracker.started_at() {
        info!(%started, new_session = dashboard.is_new_session(), "Session");
    }
    if dashboard.is_new_session() {
        println!("New session - fetching fresh content");
    }

    let fixed_location = config.location;
    let view = dashboard
        .load_all(&api, move || async move {
            fixed_location.ok_or_else(|| anyhow!("No location configured"))
        })
        .await;

    print_view(&view, cache.preferences().temperature_unit());

    info!("tabboard done");
    Ok(())
}
