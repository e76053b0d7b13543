use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{delete, get, post, put};
use axum::Router;
use once_cell::sync::Lazy;
use search_autocomplete::cache::memory::MemoryCache;
use search_autocomplete::cache::remote::{RemoteCache, RemoteCacheConfig};
use search_autocomplete::cache::SuggestionCache;
use search_autocomplete::metrics::{Metrics, START_TIME};
use search_autocomplete::pipeline::types::PipelineConfig;
use search_autocomplete::pipeline::DataPipeline;
use search_autocomplete::service::engine::{AutocompleteService, ServiceConfig};
use search_autocomplete::service::handlers::{
    handle_add_suggestion, handle_autocomplete_get, handle_autocomplete_post,
    handle_batch_add_suggestions, handle_delete_suggestion, handle_health, handle_stats,
    handle_update_frequency, AdminKey, RequestTimeout,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|level| level.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(log_level).init();

    // Pin the process start instant before anything else reads it.
    Lazy::force(&START_TIME);

    tracing::info!("Starting search autocomplete service");
    let config = load_config();

    // 1. Shared metrics registry:
    let metrics = Arc::new(Metrics::new());

    // 2. Cache variant:
    let cache: Option<Arc<dyn SuggestionCache>> = if !config.cache_enabled {
        tracing::info!("Result cache disabled");
        None
    } else if config.remote_cache_enabled {
        tracing::info!(
            "Using remote cache at {}:{}",
            config.remote_cache_host,
            config.remote_cache_port
        );
        Some(RemoteCache::new(
            RemoteCacheConfig {
                host: config.remote_cache_host.clone(),
                port: config.remote_cache_port,
                credential: config.remote_cache_credential.clone(),
                db: config.remote_cache_db,
                ttl: config.cache_ttl,
            },
            metrics.clone(),
        ) as Arc<dyn SuggestionCache>)
    } else {
        tracing::info!("Using in-memory cache");
        Some(MemoryCache::new(config.cache_ttl, metrics.clone()) as Arc<dyn SuggestionCache>)
    };

    // 3. Query service:
    let service = AutocompleteService::new(
        ServiceConfig {
            max_suggestions: config.max_suggestions,
            enable_fuzzy: config.enable_fuzzy,
            fuzzy_threshold: config.fuzzy_threshold,
            personalization: config.personalization,
        },
        cache,
        metrics.clone(),
    );
    service.load_sample_data();

    // 4. Ingestion pipeline:
    let pipeline = DataPipeline::new(
        service.clone(),
        PipelineConfig {
            batch_size: config.pipeline_batch_size,
            flush_interval: config.pipeline_flush_interval,
            queue_capacity: config.pipeline_queue_capacity,
            min_term_frequency: config.pipeline_min_term_frequency,
        },
        metrics.clone(),
    );
    pipeline.start();

    let seeder = pipeline.clone();
    tokio::spawn(async move {
        seeder.load_historical_data();
    });

    // 5. HTTP router:
    let app = Router::new()
        .route(
            "/api/v1/autocomplete",
            get(handle_autocomplete_get).post(handle_autocomplete_post),
        )
        .route("/api/v1/admin/suggestions", post(handle_add_suggestion))
        .route(
            "/api/v1/admin/suggestions/batch",
            post(handle_batch_add_suggestions),
        )
        .route(
            "/api/v1/admin/suggestions/:term/frequency",
            put(handle_update_frequency),
        )
        .route(
            "/api/v1/admin/suggestions/:term",
            delete(handle_delete_suggestion),
        )
        .route("/api/v1/stats", get(handle_stats))
        .route("/api/v1/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(Extension(service.clone()))
        .layer(Extension(pipeline.clone()))
        .layer(Extension(metrics.clone()))
        .layer(Extension(AdminKey(config.api_key.clone())))
        .layer(Extension(RequestTimeout(config.request_timeout)));

    // 6. Periodic stats reporter:
    let reporter_service = service.clone();
    let reporter_pipeline = pipeline.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let stats = reporter_pipeline.stats();
            tracing::info!(
                "Service stats: {} indexed terms, {} queued events, {} pending updates",
                reporter_service.index_size(),
                stats.queue_length,
                stats.pending_updates
            );
        }
    });

    // 7. Serve until interrupted, then drain the pipeline:
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    print_startup_info(&config, addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutting down, draining pipeline");
    pipeline.stop().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Application configuration, loaded from environment variables.
struct Config {
    port: u16,
    api_key: Option<String>,
    max_body_bytes: usize,
    request_timeout: Duration,
    max_suggestions: usize,
    enable_fuzzy: bool,
    fuzzy_threshold: usize,
    personalization: bool,
    cache_enabled: bool,
    cache_ttl: Duration,
    remote_cache_enabled: bool,
    remote_cache_host: String,
    remote_cache_port: u16,
    remote_cache_credential: Option<String>,
    remote_cache_db: u32,
    pipeline_batch_size: usize,
    pipeline_flush_interval: Duration,
    pipeline_queue_capacity: usize,
    pipeline_min_term_frequency: u64,
}

fn load_config() -> Config {
    Config {
        port: get_env_parsed("PORT", 8080),
        api_key: std::env::var("API_KEY").ok().filter(|key| !key.is_empty()),
        max_body_bytes: get_env_parsed("MAX_BODY_BYTES", 2 * 1024 * 1024),
        request_timeout: get_env_duration_secs("REQUEST_TIMEOUT_SECONDS", 5),
        max_suggestions: get_env_parsed("MAX_SUGGESTIONS", 10),
        enable_fuzzy: get_env_bool("ENABLE_FUZZY", true),
        fuzzy_threshold: get_env_parsed("FUZZY_THRESHOLD", 2),
        personalization: get_env_bool("PERSONALIZED_REC", false),
        cache_enabled: get_env_bool("CACHE_ENABLED", true),
        cache_ttl: get_env_duration_secs("CACHE_TTL_SECONDS", 300),
        remote_cache_enabled: get_env_bool("REMOTE_CACHE_ENABLED", false),
        remote_cache_host: get_env_string("REMOTE_CACHE_HOST", "localhost"),
        remote_cache_port: get_env_parsed("REMOTE_CACHE_PORT", 7700),
        remote_cache_credential: std::env::var("REMOTE_CACHE_CREDENTIAL").ok(),
        remote_cache_db: get_env_parsed("REMOTE_CACHE_DB", 0),
        pipeline_batch_size: get_env_parsed("PIPELINE_BATCH_SIZE", 100),
        pipeline_flush_interval: get_env_duration_secs("PIPELINE_FLUSH_INTERVAL_SECONDS", 30),
        pipeline_queue_capacity: get_env_parsed("PIPELINE_QUEUE_SIZE", 10_000),
        pipeline_min_term_frequency: get_env_parsed("PIPELINE_MIN_TERM_FREQUENCY", 1),
    }
}

fn get_env_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn get_env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<bool>().ok())
        .unwrap_or(default)
}

fn get_env_duration_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(get_env_parsed(key, default_secs))
}

fn print_startup_info(config: &Config, addr: SocketAddr) {
    tracing::info!(
        port = config.port,
        cache_enabled = config.cache_enabled,
        remote_cache_enabled = config.remote_cache_enabled,
        fuzzy_enabled = config.enable_fuzzy,
        api_key_set = config.api_key.is_some(),
        "Configuration loaded"
    );
    tracing::info!("HTTP server listening on {}", addr);
    tracing::info!(
        "Try: curl 'http://localhost:{}/api/v1/autocomplete?q=app&limit=5'",
        config.port
    );
    tracing::info!("Press Ctrl+C to shutdown");
}
