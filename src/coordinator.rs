//! Two-phase commit coordinator.
//!
//! Drives the voting phase and decision phase for one file upload across
//! every registered participant, the same shape as this teacher repo's
//! `TwoPhaseCommitCoordinator` (`distributed_2pc.rs`) generalized from an
//! in-process state machine to real RPCs over `tonic`.

use crate::pb::{DecisionMsg as PbDecisionMsg, VoteRequestMsg};
use crate::protocol::{Decision, FileMetadata, TxnId, Vote, VoteResponse};
use crate::registry::ParticipantRegistry;
use std::time::Duration;
use tracing::{info, warn};

pub struct Coordinator {
    registry: ParticipantRegistry,
    vote_timeout: Duration,
}

impl Coordinator {
    pub fn new(registry: ParticipantRegistry, vote_timeout: Duration) -> Self {
        Coordinator {
            registry,
            vote_timeout,
        }
    }

    /// Runs one full 2PC round for an upload: voting phase, decision rule,
    /// decision phase. Returns whether the transaction globally committed.
    pub async fn execute_upload(&self, filename: String, file_data: Vec<u8>, user: String) -> bool {
        let txn_id = TxnId::new();
        let metadata = FileMetadata {
            filename: filename.clone(),
            size: file_data.len() as u64,
            user,
        };

        info!(%txn_id, %filename, "starting upload transaction");

        let votes = self.voting_phase(&txn_id, &filename, &file_data, &metadata).await;

        let all_commit = !votes.is_empty() && votes.iter().all(|v| v.vote.is_commit());
        let decision = if all_commit {
            Decision::GlobalCommit
        } else {
            Decision::GlobalAbort
        };

        if !all_commit {
            for v in &votes {
                if let Vote::Abort(reason) = &v.vote {
                    warn!(%txn_id, node_id = %v.node_id, %reason, "participant voted abort");
                }
            }
        }

        self.decision_phase(&txn_id, decision).await;

        info!(%txn_id, committed = all_commit, "transaction finished");
        all_commit
    }

    /// Fans a `VoteRequest` out to every participant concurrently, treating
    /// a timeout, transport error, or explicit abort vote the same way: a
    /// vote to abort. A participant that never answers can't veto-by-
    /// silence block the others from finishing this phase.
    async fn voting_phase(
        &self,
        txn_id: &TxnId,
        filename: &str,
        file_data: &[u8],
        metadata: &FileMetadata,
    ) -> Vec<VoteResponse> {
        let node_ids = self.registry.node_ids();
        let mut handles = Vec::with_capacity(node_ids.len());

        for node_id in node_ids {
            let request = VoteRequestMsg {
                transaction_id: txn_id.as_str().to_string(),
                operation: "upload".to_string(),
                filename: filename.to_string(),
                file_data: file_data.to_vec(),
                metadata: Some(metadata.into()),
            };
            let timeout = self.vote_timeout;
            let registry = &self.registry;
            let node_id_for_task = node_id.clone();

            handles.push(async move {
                let call = async {
                    let mut client = registry.client_for(&node_id_for_task).await?;
                    client
                        .vote_request(request)
                        .await
                        .map(|resp| resp.into_inner())
                        .map_err(|e| format!("rpc error: {e}"))
                };

                match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(wire)) => VoteResponse::try_from(wire).unwrap_or_else(|e| VoteResponse {
                        txn_id: txn_id.clone(),
                        vote: Vote::Abort(e),
                        node_id: node_id_for_task.clone(),
                    }),
                    Ok(Err(e)) => VoteResponse {
                        txn_id: txn_id.clone(),
                        vote: Vote::Abort(e),
                        node_id: node_id_for_task.clone(),
                    },
                    Err(_) => VoteResponse {
                        txn_id: txn_id.clone(),
                        vote: Vote::Abort("vote request timed out".to_string()),
                        node_id: node_id_for_task.clone(),
                    },
                }
            });
        }

        futures::future::join_all(handles).await
    }

    /// Broadcasts the final decision to every participant. A participant
    /// that fails to ack is logged and otherwise ignored — recovering a
    /// stuck participant durably is explicitly out of scope here.
    async fn decision_phase(&self, txn_id: &TxnId, decision: Decision) {
        let node_ids = self.registry.node_ids();
        let mut handles = Vec::with_capacity(node_ids.len());

        for node_id in node_ids {
            let msg = PbDecisionMsg {
                transaction_id: txn_id.as_str().to_string(),
                decision: decision as i32,
            };
            let registry = &self.registry;
            let node_id_for_task = node_id.clone();

            handles.push(async move {
                let mut client = match registry.client_for(&node_id_for_task).await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(node_id = %node_id_for_task, error = %e, "could not reach participant for decision");
                        return;
                    }
                };
                match client.global_decision(msg).await {
                    Ok(resp) if resp.into_inner().success => {}
                    Ok(_) => warn!(node_id = %node_id_for_task, "participant ack'd decision with success=false"),
                    Err(e) => warn!(node_id = %node_id_for_task, error = %e, "decision rpc failed"),
                }
            });
        }

        futures::future::join_all(handles).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_commit_requires_at_least_one_vote() {
        let votes: Vec<VoteResponse> = vec![];
        let all_commit = !votes.is_empty() && votes.iter().all(|v| v.vote.is_commit());
        assert!(!all_commit);
    }

    #[test]
    fn single_abort_vote_blocks_global_commit() {
        let votes = vec![
            VoteResponse { txn_id: "a".into(), vote: Vote::Commit, node_id: "2".into() },
            VoteResponse { txn_id: "a".into(), vote: Vote::Abort("disk full".into()), node_id: "3".into() },
        ];
        let all_commit = !votes.is_empty() && votes.iter().all(|v| v.vote.is_commit());
        assert!(!all_commit);
    }

    #[test]
    fn unanimous_commit_votes_commit_globally() {
        let votes = vec![
            VoteResponse { txn_id: "a".into(), vote: Vote::Commit, node_id: "2".into() },
            VoteResponse { txn_id: "a".into(), vote: Vote::Commit, node_id: "3".into() },
        ];
        let all_commit = !votes.is_empty() && votes.iter().all(|v| v.vote.is_commit());
        assert!(all_commit);
    }
}
