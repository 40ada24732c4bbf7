//! Metadata participant: votes on and commits file metadata, and exposes the
//! small internal HTTP API the coordinator uses for signup/login/listing.
//!
//! The gRPC half mirrors the original reference's `metadata/app.py`
//! `MetadataParticipant` (in-memory `FILES`/`USERS` dicts); the HTTP half
//! reproduces its Flask routes (`/users` POST, `/users/<username>` GET,
//! `/files` GET) since the coordinator's auth and listing endpoints have
//! nowhere else to go for that data.

use crate::pb::two_phase_commit_server::TwoPhaseCommit;
use crate::pb::{DecisionAck, DecisionMsg, Vote, VoteRequestMsg, VoteResponseMsg};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Debug, Clone)]
struct PreparedFile {
    filename: String,
    size: u64,
    user: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommittedFile {
    pub filename: String,
    pub size: u64,
    pub user: String,
    pub path: String,
    pub version: u32,
}

pub struct MetadataParticipant {
    node_id: String,
    prepared: DashMap<String, PreparedFile>,
    committed: DashMap<String, CommittedFile>,
    users: DashMap<String, String>,
}

impl MetadataParticipant {
    pub fn new(node_id: String) -> Self {
        MetadataParticipant {
            node_id,
            prepared: DashMap::new(),
            committed: DashMap::new(),
            users: DashMap::new(),
        }
    }
}

#[tonic::async_trait]
impl TwoPhaseCommit for MetadataParticipant {
    async fn vote_request(
        &self,
        request: Request<VoteRequestMsg>,
    ) -> Result<Response<VoteResponseMsg>, Status> {
        let msg = request.into_inner();
        let txn_id = msg.transaction_id;
        let metadata = msg.metadata;

        let reason = if msg.filename.is_empty() {
            Some("empty filename".to_string())
        } else if self.committed.contains_key(&msg.filename) {
            Some(format!("{} already committed", msg.filename))
        } else if metadata.as_ref().map(|m| m.size).unwrap_or(0) == 0 {
            Some("zero-byte file".to_string())
        } else {
            None
        };

        if let Some(reason) = reason {
            return Ok(Response::new(VoteResponseMsg {
                transaction_id: txn_id,
                vote: Vote::Abort as i32,
                node_id: self.node_id.clone(),
                reason,
            }));
        }

        let metadata = metadata.expect("size check above guarantees metadata is present");
        self.prepared.insert(
            txn_id.clone(),
            PreparedFile {
                filename: msg.filename,
                size: metadata.size,
                user: metadata.user,
            },
        );

        Ok(Response::new(VoteResponseMsg {
            transaction_id: txn_id,
            vote: Vote::Commit as i32,
            node_id: self.node_id.clone(),
            reason: String::new(),
        }))
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

        if !is_commit {
            return Ok(Response::new(DecisionAck {
                transaction_id: txn_id,
                node_id: self.node_id.clone(),
                success: true,
            }));
        }

        if self.committed.contains_key(&prepared.filename) {
            return Ok(Response::new(DecisionAck {
                transaction_id: txn_id,
                node_id: self.node_id.clone(),
                success: false,
            }));
        }

        let filename = prepared.filename.clone();
        self.committed.insert(
            filename.clone(),
            CommittedFile {
                path: format!("/storage/{}", filename),
                filename: prepared.filename,
                size: prepared.size,
                user: prepared.user,
                version: 1,
            },
        );
        info!(node_id = %self.node_id, %txn_id, %filename, "committed metadata");

        Ok(Response::new(DecisionAck {
            transaction_id: txn_id,
            node_id: self.node_id.clone(),
            success: true,
        }))
    }
}

// ---- internal HTTP API, consumed by the coordinator ----

#[derive(Debug, Deserialize)]
struct SignupRequest {
    username: String,
    password: String,
}

async fn create_user(
    State(participant): State<Arc<MetadataParticipant>>,
    Json(body): Json<SignupRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if body.username.is_empty() || body.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "username and password are required" })),
        );
    }
    if participant.users.contains_key(&body.username) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "user already exists" })),
        );
    }
    participant.users.insert(body.username.clone(), body.password);
    (StatusCode::CREATED, Json(json!({ "username": body.username })))
}

async fn get_user(
    State(participant): State<Arc<MetadataParticipant>>,
    Path(username): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match participant.users.get(&username) {
        Some(password_hash) => (
            StatusCode::OK,
            Json(json!({ "username": username, "password": password_hash.value() })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "user not found" })),
        ),
    }
}

async fn list_files(
    State(participant): State<Arc<MetadataParticipant>>,
) -> Json<Vec<CommittedFile>> {
    Json(participant.committed.iter().map(|e| e.value().clone()).collect())
}

pub fn http_router(participant: Arc<MetadataParticipant>) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:username", get(get_user))
        .route("/files", get(list_files))
        .with_state(participant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote_request(txn_id: &str, filename: &str, size: u64) -> VoteRequestMsg {
        VoteRequestMsg {
            transaction_id: txn_id.to_string(),
            operation: "upload".to_string(),
            filename: filename.to_string(),
            file_data: vec![],
            metadata: Some(crate::pb::FileMetadata {
                filename: filename.to_string(),
                size,
                user: "alice".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn zero_byte_file_is_rejected_at_vote() {
        let participant = MetadataParticipant::new("4".to_string());
        let resp = participant
            .vote_request(Request::new(vote_request("t1", "a.txt", 0)))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(resp.vote, Vote::Abort as i32);
    }

    #[tokio::test]
    async fn commit_then_duplicate_filename_is_rejected() {
        let participant = MetadataParticipant::new("4".to_string());

        participant
            .vote_request(Request::new(vote_request("t1", "a.txt", 10)))
            .await
            .unwrap();
        let ack1 = participant
            .global_decision(Request::new(DecisionMsg {
                transaction_id: "t1".to_string(),
                decision: crate::pb::Decision::GlobalCommit as i32,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(ack1.success);

        let vote2 = participant
            .vote_request(Request::new(vote_request("t2", "a.txt", 20)))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(vote2.vote, Vote::Abort as i32);
    }

    #[tokio::test]
    async fn committed_path_is_storage_prefixed_with_version_one() {
        let participant = MetadataParticipant::new("4".to_string());
        participant
            .vote_request(Request::new(vote_request("t1", "report.pdf", 99)))
            .await
            .unwrap();
        participant
            .global_decision(Request::new(DecisionMsg {
                transaction_id: "t1".to_string(),
                decision: crate::pb::Decision::GlobalCommit as i32,
            }))
            .await
            .unwrap();

        let file = participant.committed.get("report.pdf").unwrap();
        assert_eq!(file.path, "/storage/report.pdf");
        assert_eq!(file.version, 1);
    }
}
