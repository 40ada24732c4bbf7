//! Tracks the coordinator's view of participant nodes and their gRPC
//! channels.
//!
//! Shaped after this teacher repo's node-address bookkeeping: a plain id to
//! address mapping handed to the coordinator at startup, plus lazily
//! established, cached connections rather than dialing a fresh channel per
//! RPC.

use crate::config::ParticipantEndpoint;
use crate::pb::two_phase_commit_client::TwoPhaseCommitClient;
use dashmap::DashMap;
use tonic::transport::Channel;

/// The coordinator's address book, built once at startup from
/// `COORDINATOR_PARTICIPANTS` (or the default topology).
#[derive(Debug)]
pub struct ParticipantRegistry {
    endpoints: Vec<ParticipantEndpoint>,
    channels: DashMap<String, Channel>,
}

impl ParticipantRegistry {
    pub fn new(endpoints: Vec<ParticipantEndpoint>) -> Self {
        ParticipantRegistry {
            endpoints,
            channels: DashMap::new(),
        }
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.node_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    fn endpoint_for(&self, node_id: &str) -> Option<&ParticipantEndpoint> {
        self.endpoints.iter().find(|e| e.node_id == node_id)
    }

    /// Returns a connected client for `node_id`, reusing a cached channel
    /// when one already exists. Connection is lazy: nothing is dialed until
    /// the first RPC for a node is attempted.
    pub async fn client_for(
        &self,
        node_id: &str,
    ) -> Result<TwoPhaseCommitClient<Channel>, String> {
        if let Some(channel) = self.channels.get(node_id) {
            return Ok(TwoPhaseCommitClient::new(channel.clone()));
        }

        let endpoint = self
            .endpoint_for(node_id)
            .ok_or_else(|| format!("unknown participant node_id {node_id}"))?;

        let channel = Channel::from_shared(endpoint.grpc_uri())
            .map_err(|e| format!("invalid endpoint for {node_id}: {e}"))?
            .connect()
            .await
            .map_err(|e| format!("failed to connect to participant {node_id}: {e}"))?;

        self.channels.insert(node_id.to_string(), channel.clone());
        Ok(TwoPhaseCommitClient::new(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(node_id: &str, port: u16) -> ParticipantEndpoint {
        ParticipantEndpoint {
            node_id: node_id.to_string(),
            host: "localhost".to_string(),
            port,
        }
    }

    #[test]
    fn node_ids_reflects_construction_order() {
        let registry = ParticipantRegistry::new(vec![endpoint("2", 1), endpoint("3", 2)]);
        assert_eq!(registry.node_ids(), vec!["2".to_string(), "3".to_string()]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn client_for_unknown_node_errors_without_dialing() {
        let registry = ParticipantRegistry::new(vec![endpoint("2", 1)]);
        let result = registry.client_for("99").await;
        assert!(result.is_err());
    }
}
