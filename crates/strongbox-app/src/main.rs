use std::{sync::Arc, time::Duration};

use salvo::conn::TcpListener;
use salvo::logging::Logger;
use salvo::{Listener, Router};
use strongbox_app::app::api::routes;
use strongbox_app::config::ConfigHandler;
use strongbox_app::state::{AppState, StateHandler};
use strongbox_core::config::load_config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Strongbox file vault");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let state = Arc::new(AppState::from_settings(&config).await?);

    if let Some(admin) = &config.auth.bootstrap_admin
        && let Some(user) = state
            .authenticator
            .bootstrap_admin(&admin.username, &admin.password)
            .await?
    {
        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap administrator created");
    }

    spawn_session_purge(
        Arc::clone(&state),
        Duration::from_secs(config.auth.session_purge_interval_seconds.max(1)),
    );

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(Logger::new())
        .hoop(StateHandler { state })
        .hoop(ConfigHandler {
            settings: Arc::new(config),
        })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    let server = salvo::Server::new(acceptor);
    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received, draining connections");
        handle.stop_graceful(None);
    });

    server.serve(router).await;

    Ok(())
}

/// Deletes expired sessions on a fixed interval for the life of the process.
fn spawn_session_purge(state: Arc<AppState>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match state.authenticator.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "Session purge failed"),
            }
        }
    });
}
