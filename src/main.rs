use axum::Router;
use runlog_rs::{config, routes, state};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runlog_rs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();
    let port = config.port;
    let max_file_size = config.max_file_size;
    let cache_ttl = config.cache_ttl;
    let endpoint = config.activities_endpoint();
    let state = state::AppState::new(config);

    let eviction_state = state.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            eviction_state.evict_expired(cache_ttl);
        }
    });

    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::batches::router())
        .merge(routes::views::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("runlog-rs listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Read files: POST http://{}/api/batches", addr);
    tracing::info!("Open route view: POST http://{}/api/views", addr);
    tracing::info!("Uploading runs to {}", endpoint);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
