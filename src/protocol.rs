//! Domain-level message types for the two-phase commit protocol.
//!
//! These mirror `proto/twopc.proto` one-to-one but stay independent of the
//! generated `prost` types so the core coordinator/participant logic never
//! has to reason about wire representations (`Vote`/`Decision` here are
//! proper Rust enums, not C-style `i32` wire values). `From`/`TryFrom`
//! impls at the bottom of this file do the translation at the RPC
//! boundary.

use crate::pb;
use std::fmt;

/// Opaque per-transaction identifier. Eight hex characters, generated from a
/// v4 UUID truncated the same way the original Python reference truncates
/// `str(uuid.uuid4())[:8]` — collisions are accepted at this scale, the id
/// only needs to be unique among in-flight transactions at one coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxnId(String);

impl TxnId {
    pub fn new() -> Self {
        let full = uuid::Uuid::new_v4().simple().to_string();
        TxnId(full[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TxnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TxnId {
    fn from(s: String) -> Self {
        TxnId(s)
    }
}

impl From<&str> for TxnId {
    fn from(s: &str) -> Self {
        TxnId(s.to_string())
    }
}

/// Immutable file metadata assembled by the coordinator for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub size: u64,
    pub user: String,
}

/// A participant's vote, carrying the abort reason inline rather than as a
/// separate optional field — there is no such thing as a commit vote with a
/// reason, so the type shouldn't be able to represent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Vote {
    Commit,
    Abort(String),
}

impl Vote {
    pub fn is_commit(&self) -> bool {
        matches!(self, Vote::Commit)
    }
}

/// The coordinator's global decision for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    GlobalCommit,
    GlobalAbort,
}

#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub txn_id: TxnId,
    pub operation: String,
    pub filename: String,
    pub file_data: Vec<u8>,
    pub metadata: FileMetadata,
}

#[derive(Debug, Clone)]
pub struct VoteResponse {
    pub txn_id: TxnId,
    pub vote: Vote,
    pub node_id: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionMsg {
    pub decision: Decision,
}

#[derive(Debug, Clone)]
pub struct DecisionAck {
    pub node_id: String,
    pub success: bool,
}

// ---- wire conversions ----

impl From<&FileMetadata> for pb::FileMetadata {
    fn from(m: &FileMetadata) -> Self {
        pb::FileMetadata {
            filename: m.filename.clone(),
            size: m.size,
            user: m.user.clone(),
        }
    }
}

impl From<pb::FileMetadata> for FileMetadata {
    fn from(m: pb::FileMetadata) -> Self {
        FileMetadata {
            filename: m.filename,
            size: m.size,
            user: m.user,
        }
    }
}

impl From<&VoteRequest> for pb::VoteRequestMsg {
    fn from(r: &VoteRequest) -> Self {
        pb::VoteRequestMsg {
            transaction_id: r.txn_id.as_str().to_string(),
            operation: r.operation.clone(),
            filename: r.filename.clone(),
            file_data: r.file_data.clone(),
            metadata: Some((&r.metadata).into()),
        }
    }
}

impl TryFrom<pb::VoteRequestMsg> for VoteRequest {
    type Error = String;

    fn try_from(m: pb::VoteRequestMsg) -> Result<Self, Self::Error> {
        let metadata = m
            .metadata
            .ok_or_else(|| "vote request missing metadata".to_string())?;
        Ok(VoteRequest {
            txn_id: m.transaction_id.into(),
            operation: m.operation,
            filename: m.filename,
            file_data: m.file_data,
            metadata: metadata.into(),
        })
    }
}

impl From<VoteResponse> for pb::VoteResponseMsg {
    fn from(r: VoteResponse) -> Self {
        let (vote, reason) = match r.vote {
            Vote::Commit => (pb::Vote::Commit, String::new()),
            Vote::Abort(reason) => (pb::Vote::Abort, reason),
        };
        pb::VoteResponseMsg {
            transaction_id: r.txn_id.as_str().to_string(),
            vote: vote as i32,
            node_id: r.node_id,
            reason,
        }
    }
}

impl TryFrom<pb::VoteResponseMsg> for VoteResponse {
    type Error = String;

    fn try_from(m: pb::VoteResponseMsg) -> Result<Self, Self::Error> {
        let vote = match pb::Vote::try_from(m.vote) {
            Ok(pb::Vote::Commit) => Vote::Commit,
            Ok(pb::Vote::Abort) => Vote::Abort(m.reason),
            Err(_) => return Err(format!("unrecognized vote tag {}", m.vote)),
        };
        Ok(VoteResponse {
            txn_id: m.transaction_id.into(),
            vote,
            node_id: m.node_id,
        })
    }
}

impl From<Decision> for pb::Decision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::GlobalCommit => pb::Decision::GlobalCommit,
            Decision::GlobalAbort => pb::Decision::GlobalAbort,
        }
    }
}

impl TryFrom<i32> for Decision {
    type Error = String;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match pb::Decision::try_from(tag) {
            Ok(pb::Decision::GlobalCommit) => Ok(Decision::GlobalCommit),
            Ok(pb::Decision::GlobalAbort) => Ok(Decision::GlobalAbort),
            Err(_) => Err(format!("unrecognized decision tag {tag}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txn_id_is_eight_hex_chars() {
        let id = TxnId::new();
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn txn_ids_are_distinct() {
        assert_ne!(TxnId::new(), TxnId::new());
    }

    #[test]
    fn vote_response_roundtrips_through_wire_types() {
        let resp = VoteResponse {
            txn_id: "abcd1234".into(),
            vote: Vote::Abort("bad filename".to_string()),
            node_id: "2".to_string(),
        };
        let wire: pb::VoteResponseMsg = resp.clone().into();
        let back = VoteResponse::try_from(wire).unwrap();
        assert_eq!(back.txn_id, resp.txn_id);
        assert_eq!(back.vote, resp.vote);
    }

    #[test]
    fn vote_request_roundtrips_through_wire_types() {
        let req = VoteRequest {
            txn_id: "abcd1234".into(),
            operation: "upload".to_string(),
            filename: "a.txt".to_string(),
            file_data: vec![1, 2, 3],
            metadata: FileMetadata {
                filename: "a.txt".to_string(),
                size: 3,
                user: "alice".to_string(),
            },
        };
        let wire: pb::VoteRequestMsg = (&req).into();
        let back = VoteRequest::try_from(wire).unwrap();
        assert_eq!(back.filename, req.filename);
        assert_eq!(back.metadata, req.metadata);
    }
}
