//! sysbeacon_agent entry point: wires the sampler, the broadcaster and the
//! `/metrics` WebSocket route together.

use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sysbeacon_agent::{
    app,
    broadcast::{spawn_broadcaster, Broadcaster, BROADCAST_INTERVAL},
    config::AgentConfig,
    host::SysinfoProvider,
    pm2::Pm2,
    registry::ConnectionRegistry,
    snapshot::SnapshotBuilder,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AgentConfig::parse();
    debug!(?config, "using configuration");

    let mut builder = SnapshotBuilder::new(Box::new(SysinfoProvider::new()), &config.disk_path);
    if !config.no_pm2 {
        builder = builder.with_process_manager(Arc::new(Pm2::new(
            config.pm2_bin.clone(),
            config.pm2_timeout(),
        )));
    }

    let registry = Arc::new(ConnectionRegistry::new());
    let state = AppState::new(registry.clone());

    let broadcaster = Arc::new(Broadcaster::new(registry, builder, config.write_timeout()));
    let sampler = spawn_broadcaster(broadcaster, BROADCAST_INTERVAL, state.shutdown.child_token());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("sysbeacon_agent listening on ws://{}/metrics", listener.local_addr()?);

    axum::serve(
        listener,
        app(state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
    .await?;

    sampler.await?;
    state.tasks.close();
    debug!("waiting for {} subscriber watchers", state.tasks.len());
    state.tasks.wait().await;
    info!("sysbeacon_agent stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            #[cfg(debug_assertions)]
            let default_level = format!("{}=debug", env!("CARGO_CRATE_NAME"));
            #[cfg(not(debug_assertions))]
            let default_level = format!("{}=info", env!("CARGO_CRATE_NAME"));
            default_level.into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let _cancel_on_exit = shutdown.drop_guard();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
