//! Storage-participant binary: a bare gRPC server, no HTTP surface.

use std::net::SocketAddr;
use tonic::transport::Server;
use tracing::info;
use twopc_core::config::{worker_concurrency, StorageConfig};
use twopc_core::pb::two_phase_commit_server::TwoPhaseCommitServer;
use twopc_core::StorageParticipant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = StorageConfig::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
    info!(node_id = %config.node_id, %addr, storage_dir = ?config.storage_dir, "starting storage participant");

    let participant = StorageParticipant::new(config);
    participant.ensure_dirs().await?;

    Server::builder()
        .concurrency_limit_per_connection(worker_concurrency())
        .add_service(TwoPhaseCommitServer::new(participant))
        .serve(addr)
        .await?;

    Ok(())
}
