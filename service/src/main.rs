mod consts;
mod error;
mod handlers;
mod router;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use redpacket_client::consts::{DEFAULT_AGENT_RPC_URL, DEFAULT_REGISTRY_RPC_URL};
use redpacket_client::{
    ConnectionManager, HttpRegistryRpc, HttpSigningAgent, LedgerGateway, ListSynchronizer,
};

use crate::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let registry_url =
        std::env::var("REGISTRY_RPC_URL").unwrap_or_else(|_| DEFAULT_REGISTRY_RPC_URL.into());
    let agent_url = std::env::var("AGENT_RPC_URL").unwrap_or_else(|_| DEFAULT_AGENT_RPC_URL.into());
    let host = std::env::var("HOST").unwrap_or_else(|_| consts::DEFAULT_HOST.into());
    let port = std::env::var("PORT").unwrap_or_else(|_| consts::DEFAULT_PORT.into());
    let bind_addr = format!("{host}:{port}");

    tracing::info!("Registry endpoint: {registry_url}");
    tracing::info!("Agent endpoint: {agent_url}");
    tracing::info!("Listening on {bind_addr}");

    let agent =
        Arc::new(HttpSigningAgent::new(agent_url).expect("HTTP client for the signing agent"));
    agent.spawn_poller();
    let registry =
        Arc::new(HttpRegistryRpc::new(registry_url).expect("HTTP client for the registry"));

    let connection = Arc::new(ConnectionManager::new(agent.clone(), registry.clone()));
    let gateway = Arc::new(LedgerGateway::new(connection.clone(), agent, registry));
    let lists = Arc::new(ListSynchronizer::new(gateway.clone()));

    let app = router::build_router(AppState {
        connection,
        gateway,
        lists,
        window: consts::DEFAULT_WINDOW,
    });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Ctrl+C received, shutting down"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down"),
    }
}
