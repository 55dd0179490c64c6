mod backend;
mod error;
mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use promptgate_common::AppConfig;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::backend::HttpBackend;
use crate::service::Gateway;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    // Parse command-line args for config path
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/promptgate.yaml".to_string());

    info!(config_path = %config_path, "starting prompt gateway");

    let config = AppConfig::load(&config_path)?;
    let listen_addr = config.server.listen.clone();
    let admin = config.server.admin.clone();
    let backend = Arc::new(HttpBackend::from_config(&config.backend)?);

    let state = promptgate_admin::new_shared_state(config)?;
    if let Some(ref limiter) = state.rate_limiter {
        limiter.start_cleanup_task()?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    if admin.enabled {
        let admin_state = state.clone();
        let admin_shutdown = wait_for(shutdown_rx.clone());
        tokio::spawn(async move {
            if let Err(e) =
                promptgate_admin::run_admin_server(admin_state, &admin.listen, admin_shutdown).await
            {
                error!(error = %e, "admin API server error");
            }
        });
    }

    let app = service::build_router(Gateway::new(state, backend));
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "prompt gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(wait_for(shutdown_rx))
    .await?;

    info!("prompt gateway stopped");
    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}
