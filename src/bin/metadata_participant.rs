//! Metadata-participant binary: runs the gRPC `TwoPhaseCommit` service and
//! the internal HTTP API (`/users`, `/files`) side by side in one process,
//! matching the original reference's metadata service running both a gRPC
//! server and a Flask app together.

use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;
use twopc_core::config::{worker_concurrency, MetadataConfig};
use twopc_core::pb::two_phase_commit_server::TwoPhaseCommitServer;
use twopc_core::participant::metadata::http_router;
use twopc_core::MetadataParticipant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = MetadataConfig::from_env();
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(node_id = %config.node_id, %grpc_addr, %http_addr, "starting metadata participant");

    let participant = Arc::new(MetadataParticipant::new(config.node_id.clone()));

    let grpc_participant = Arc::clone(&participant);
    let grpc_server = async move {
        Server::builder()
            .concurrency_limit_per_connection(worker_concurrency())
            .add_service(TwoPhaseCommitServer::from_arc(grpc_participant))
            .serve(grpc_addr)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    };

    let http_server = async move {
        let app = http_router(participant);
        let listener = tokio::net::TcpListener::bind(http_addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    };

    tokio::try_join!(grpc_server, http_server)?;
    Ok(())
}
