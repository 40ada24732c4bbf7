//! Storage participant: stages uploaded bytes to a temp file during the
//! voting phase, then renames into place or unlinks on decision.
//!
//! Grounded on the original reference's `storage/app.py` `StorageParticipant`
//! (`TEMP_PATH`/`STORAGE_PATH`, `{txn_id}_{filename}` temp naming) and on
//! this teacher repo's `DashMap`-guarded state pattern used elsewhere for
//! concurrent maps.

use crate::config::StorageConfig;
use crate::pb::two_phase_commit_server::TwoPhaseCommit;
use crate::pb::{DecisionAck, DecisionMsg, Vote, VoteRequestMsg, VoteResponseMsg};
use dashmap::DashMap;
use std::path::PathBuf;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

struct Prepared {
    temp_path: PathBuf,
    final_path: PathBuf,
}

pub struct StorageParticipant {
    node_id: String,
    storage_dir: PathBuf,
    temp_dir: PathBuf,
    prepared: DashMap<String, Prepared>,
}

impl StorageParticipant {
    pub fn new(config: StorageConfig) -> Self {
        StorageParticipant {
            node_id: config.node_id,
            storage_dir: config.storage_dir,
            temp_dir: config.temp_dir,
            prepared: DashMap::new(),
        }
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        tokio::fs::create_dir_all(&self.temp_dir).await
    }
}

#[tonic::async_trait]
impl TwoPhaseCommit for StorageParticipant {
    async fn vote_request(
        &self,
        request: Request<VoteRequestMsg>,
    ) -> Result<Response<VoteResponseMsg>, Status> {
        let msg = request.into_inner();
        let txn_id = msg.transaction_id;

        if msg.filename.is_empty() {
            return Ok(Response::new(VoteResponseMsg {
                transaction_id: txn_id,
                vote: Vote::Abort as i32,
                node_id: self.node_id.clone(),
                reason: "empty filename".to_string(),
            }));
        }

        let temp_path = self.temp_dir.join(format!("{}_{}", txn_id, msg.filename));
        let final_path = self.storage_dir.join(&msg.filename);

        match tokio::fs::write(&temp_path, &msg.file_data).await {
            Ok(()) => {
                self.prepared.insert(
                    txn_id.clone(),
                    Prepared {
                        temp_path,
                        final_path,
                    },
                );
                info!(node_id = %self.node_id, %txn_id, filename = %msg.filename, "prepared");
                Ok(Response::new(VoteResponseMsg {
                    transaction_id: txn_id,
                    vote: Vote::Commit as i32,
                    node_id: self.node_id.clone(),
                    reason: String::new(),
                }))
            }
            Err(e) => {
                warn!(node_id = %self.node_id, %txn_id, error = %e, "failed to stage file");
                Ok(Response::new(VoteResponseMsg {
                    transaction_id: txn_id,
                    vote: Vote::Abort as i32,
                    node_id: self.node_id.clone(),
                    reason: format!("failed to stage file: {e}"),
                }))
            }
        }
    }

    async fn global_decision(
        &self,
        request: Request<DecisionMsg>,
    ) -> Result<Response<DecisionAck>, Status> {
        let msg = request.into_inner();
        let txn_id = msg.transaction_id;

        let Some((_, prepared)) = self.prepared.remove(&txn_id) else {
            return Ok(Response::new(DecisionAck {
                transaction_id: txn_id,
                node_id: self.node_id.clone(),
                success: false,
            }));
        };

        let is_commit = msg.decision == crate::pb::Decision::GlobalCommit as i32;

        if is_commit {
            if prepared.final_path.exists() {
                warn!(node_id = %self.node_id, %txn_id, path = ?prepared.final_path, "refusing to overwrite existing file");
                let _ = tokio::fs::remove_file(&prepared.temp_path).await;
                return Ok(Response::new(DecisionAck {
                    transaction_id: txn_id,
                    node_id: self.node_id.clone(),
                    success: false,
                }));
            }
            match tokio::fs::rename(&prepared.temp_path, &prepared.final_path).await {
                Ok(()) => {
                    info!(node_id = %self.node_id, %txn_id, "committed");
                    Ok(Response::new(DecisionAck {
                        transaction_id: txn_id,
                        node_id: self.node_id.clone(),
                        success: true,
                    }))
                }
                Err(e) => {
                    warn!(node_id = %self.node_id, %txn_id, error = %e, "commit rename failed");
                    self.prepared.insert(txn_id.clone(), prepared);
                    Ok(Response::new(DecisionAck {
                        transaction_id: txn_id,
                        node_id: self.node_id.clone(),
                        success: false,
                    }))
                }
            }
        } else {
            let _ = tokio::fs::remove_file(&prepared.temp_path).await;
            info!(node_id = %self.node_id, %txn_id, "aborted");
            Ok(Response::new(DecisionAck {
                transaction_id: txn_id,
                node_id: self.node_id.clone(),
                success: true,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> StorageConfig {
        StorageConfig {
            node_id: "2".to_string(),
            grpc_port: 0,
            storage_dir: dir.join("store"),
            temp_dir: dir.join("temp"),
        }
    }

    #[tokio::test]
    async fn vote_commit_then_decision_commit_renames_file() {
        let dir = tempfile::tempdir().unwrap();
        let participant = StorageParticipant::new(test_config(dir.path()));
        participant.ensure_dirs().await.unwrap();

        let vote = participant
            .vote_request(Request::new(VoteRequestMsg {
                transaction_id: "abcd1234".to_string(),
                operation: "upload".to_string(),
                filename: "hello.txt".to_string(),
                file_data: b"hi".to_vec(),
                metadata: None,
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(vote.vote, Vote::Commit as i32);

        let ack = participant
            .global_decision(Request::new(DecisionMsg {
                transaction_id: "abcd1234".to_string(),
                decision: crate::pb::Decision::GlobalCommit as i32,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(ack.success);
        assert!(dir.path().join("store/hello.txt").exists());
    }

    #[tokio::test]
    async fn decision_abort_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let participant = StorageParticipant::new(test_config(dir.path()));
        participant.ensure_dirs().await.unwrap();

        participant
            .vote_request(Request::new(VoteRequestMsg {
                transaction_id: "deadbeef".to_string(),
                operation: "upload".to_string(),
                filename: "x.bin".to_string(),
                file_data: vec![1, 2, 3],
                metadata: None,
            }))
            .await
            .unwrap();

        let ack = participant
            .global_decision(Request::new(DecisionMsg {
                transaction_id: "deadbeef".to_string(),
                decision: crate::pb::Decision::GlobalAbort as i32,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(ack.success);
        assert!(!dir.path().join("temp/deadbeef_x.bin").exists());
        assert!(!dir.path().join("store/x.bin").exists());
    }

    #[tokio::test]
    async fn decision_for_unknown_txn_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let participant = StorageParticipant::new(test_config(dir.path()));
        participant.ensure_dirs().await.unwrap();

        let ack = participant
            .global_decision(Request::new(DecisionMsg {
                transaction_id: "00000000".to_string(),
                decision: crate::pb::Decision::GlobalCommit as i32,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(!ack.success);
    }
}
