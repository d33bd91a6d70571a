//! Streaming TTS prefetch accelerator entry point.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use tts_accelerator_balancer::spawn_health_checker;
use tts_accelerator_cache::spawn_sweeper;
use tts_accelerator_config::{load_settings, Settings};
use tts_accelerator_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("TTS_ACCEL_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing(&settings);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting tts-accelerator");

    let metrics_handle = init_metrics();
    tracing::info!("initialized Prometheus metrics at /metrics");

    let host = settings.host.clone();
    let port = settings.port;

    let state = AppState::new(settings).map_err(|e| {
        tracing::error!(error = %e, "failed to initialize application state");
        e
    })?;

    let sweeper = spawn_sweeper(state.cache.clone());

    let health_checker = state.health_check_interval().map(|interval| {
        tracing::info!(?interval, "starting endpoint health-check loop");
        spawn_health_checker(state.balancer.clone(), interval)
    });

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop().await;
    if let Some(health_checker) = health_checker {
        health_checker.stop().await;
    }
    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}

fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tts_accelerator={},tower_http=debug", settings.log_level.to_lowercase()).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = tracing_subscriber::fmt::layer().json().boxed();
    subscriber.with(fmt_layer).init();
}
