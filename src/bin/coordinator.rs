//! Coordinator binary: the public HTTP front door (`/auth/signup`,
//! `/auth/login`, `/files/upload`, `/files`) plus the 2PC driver that talks
//! gRPC to the participants.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use twopc_core::config::CoordinatorConfig;
use twopc_core::http::{build_router, AppState};
use twopc_core::registry::ParticipantRegistry;
use twopc_core::Coordinator;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = CoordinatorConfig::from_env();
    info!(node_id = %config.node_id, http_port = config.http_port, "starting coordinator");

    let registry = ParticipantRegistry::new(config.participants.clone());
    let coordinator = Arc::new(Coordinator::new(registry, config.vote_timeout));

    let state = AppState {
        coordinator,
        http: reqwest::Client::new(),
        secret_key: config.secret_key.clone(),
        metadata_http_addr: config.metadata_http_addr.clone(),
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind http port");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}
