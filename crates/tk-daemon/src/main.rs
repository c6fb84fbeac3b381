//! tk-daemon entry point.
//!
//! Thin: sets up tracing, loads config and secrets, builds the clients and
//! the shared state, wires middleware, and starts the HTTP server. Route
//! handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use tk_bus::{BroadcastBus, Fanout, Publisher};
use tk_config::{report_unused_keys, resolve_secrets, KeeperConfig, LoadedConfig, ProcessRole, UnusedKeyPolicy};
use tk_daemon::{routes, state};
use tk_db::{PgHandStore, PgOutboxPublisher};
use tk_gateway::{HttpEscrowGateway, HttpGameOracle};
use tk_reconcile::Reconciler;
use tk_stream::HandStreamReactor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env.local if present (dev convenience).
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (cfg, config_hash) = load_config()?;
    let secrets = resolve_secrets(&cfg, ProcessRole::Daemon)?;

    let pool = tk_db::connect(&secrets.database_url, cfg.db.max_connections).await?;
    let db_status = tk_db::status(&pool).await?;
    if !db_status.has_hands_table || !db_status.has_outbox_table {
        anyhow::bail!("database schema missing; run `tk db migrate` first");
    }

    let gateway = Arc::new(HttpEscrowGateway::new(&cfg.gateway, secrets.gateway_api_key.clone())?);
    let oracle = Arc::new(HttpGameOracle::new(&cfg.oracle, secrets.oracle_api_key.clone())?);

    let bus = BroadcastBus::new(cfg.bus.capacity);
    let sinks: Vec<Arc<dyn Publisher>> = vec![
        Arc::new(PgOutboxPublisher::new(pool.clone())),
        Arc::new(bus.clone()),
    ];
    let publisher: Arc<dyn Publisher> = Arc::new(Fanout::new(sinks));

    let reconciler = Reconciler::new(
        gateway.clone(),
        gateway,
        Arc::new(PgHandStore::new(pool)),
        publisher.clone(),
        cfg.reconcile.thresholds,
    );
    let reactor = HandStreamReactor::new(oracle, publisher);

    let shared = Arc::new(state::AppState::new(bus.clone(), reconciler, reactor, config_hash));

    state::spawn_heartbeat(bus, Duration::from_secs(1));
    state::spawn_scan_tick(
        Arc::clone(&shared),
        Duration::from_secs(cfg.reconcile.scan_interval_secs.max(1)),
    );

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = bind_addr_from_env()
        .or_else(|| cfg.daemon.bind_addr.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    info!("tk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `TK_CONFIG` holds a comma-separated list of YAML layers. Unset means
/// built-in defaults. `TK_GATEWAY_URL` / `TK_ORACLE_URL` override the base URLs.
fn load_config() -> anyhow::Result<(KeeperConfig, Option<String>)> {
    let (mut cfg, hash) = match std::env::var("TK_CONFIG") {
        Ok(paths) if !paths.trim().is_empty() => {
            let paths: Vec<&str> = paths.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
            let loaded: LoadedConfig = tk_config::load_layered_yaml(&paths)?;
            let report = report_unused_keys(ProcessRole::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)?;
            for ptr in &report.unused_keys {
                tracing::warn!(pointer = %ptr, "unused config key");
            }
            info!(config_hash = %loaded.config_hash, "config loaded");
            (loaded.keeper()?, Some(loaded.config_hash))
        }
        _ => (KeeperConfig::default(), None),
    };

    if let Ok(url) = std::env::var("TK_GATEWAY_URL") {
        cfg.gateway.base_url = url;
    }
    if let Ok(url) = std::env::var("TK_ORACLE_URL") {
        cfg.oracle.base_url = url;
    }
    Ok((cfg, hash))
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("TK_DAEMON_ADDR").ok()?.parse().ok()
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
