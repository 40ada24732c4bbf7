//! Environment-driven configuration for the three binaries.
//!
//! Mirrors the `os.environ.get(...)` defaults in the original Python
//! reference (`NODE_ID`, `GRPC_PORT`, `HTTP_PORT`, `SECRET_KEY`) with typed
//! Rust equivalents, following this teacher repo's `PoolConfig`-style
//! plain-struct-with-`Default`-impl convention (`connection_pool.rs`).

use std::env;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_port(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Number of worker threads/concurrent in-flight RPCs a participant will
/// allow, bounding the server the way spec.md §5's "10 workers" reference
/// implementation does. Falls back to the host's core count (grounded on
/// `storage.rs`'s use of `num_cpus` for pool sizing) when unset.
pub fn worker_concurrency() -> usize {
    env::var("WORKER_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(num_cpus::get)
}

/// One registered participant endpoint, `node_id=host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantEndpoint {
    pub node_id: String,
    pub host: String,
    pub port: u16,
}

impl ParticipantEndpoint {
    pub fn grpc_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Parses `COORDINATOR_PARTICIPANTS` (`node_id=host:port,node_id=host:port,...`)
/// or falls back to the original reference topology: two storage
/// participants and two metadata participants.
pub fn participant_endpoints() -> Vec<ParticipantEndpoint> {
    match env::var("COORDINATOR_PARTICIPANTS") {
        Ok(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|entry| parse_endpoint(entry.trim()))
            .collect(),
        Err(_) => default_participants(),
    }
}

fn parse_endpoint(entry: &str) -> Option<ParticipantEndpoint> {
    let (node_id, addr) = entry.split_once('=')?;
    let (host, port) = addr.rsplit_once(':')?;
    Some(ParticipantEndpoint {
        node_id: node_id.to_string(),
        host: host.to_string(),
        port: port.parse().ok()?,
    })
}

fn default_participants() -> Vec<ParticipantEndpoint> {
    vec![
        ParticipantEndpoint { node_id: "2".into(), host: "storage1".into(), port: 50052 },
        ParticipantEndpoint { node_id: "3".into(), host: "storage2".into(), port: 50053 },
        ParticipantEndpoint { node_id: "4".into(), host: "metadata1".into(), port: 50054 },
        ParticipantEndpoint { node_id: "5".into(), host: "metadata2".into(), port: 50055 },
    ]
}

/// Config for the coordinator binary (the HTTP front door).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub node_id: String,
    pub http_port: u16,
    pub secret_key: String,
    pub participants: Vec<ParticipantEndpoint>,
    /// Host:port of one metadata participant's internal HTTP API, used for
    /// signup/login/list-files. Defaults to the first registered metadata
    /// node whose node_id is "4" (the original topology's primary metadata
    /// node), falling back to METADATA_HTTP_ADDR if set.
    pub metadata_http_addr: String,
    pub vote_timeout: std::time::Duration,
}

impl CoordinatorConfig {
    pub fn from_env() -> Self {
        let participants = participant_endpoints();
        let metadata_http_addr = env::var("METADATA_HTTP_ADDR")
            .unwrap_or_else(|_| "http://metadata1:5005".to_string());
        CoordinatorConfig {
            node_id: env_or("NODE_ID", "1"),
            http_port: env_port("HTTP_PORT", 5003),
            secret_key: env_or("SECRET_KEY", "supersecretkey"),
            participants,
            metadata_http_addr,
            vote_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// Config for the storage-participant binary.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub node_id: String,
    pub grpc_port: u16,
    pub storage_dir: std::path::PathBuf,
    pub temp_dir: std::path::PathBuf,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let storage_dir = std::path::PathBuf::from(env_or("STORAGE_DIR", "/storage"));
        let temp_dir = env::var("TEMP_DIR")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| storage_dir.join("temp"));
        StorageConfig {
            node_id: env_or("NODE_ID", "2"),
            grpc_port: env_port("GRPC_PORT", 50052),
            storage_dir,
            temp_dir,
        }
    }
}

/// Config for the metadata-participant binary.
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub node_id: String,
    pub grpc_port: u16,
    pub http_port: u16,
}

impl MetadataConfig {
    pub fn from_env() -> Self {
        MetadataConfig {
            node_id: env_or("NODE_ID", "4"),
            grpc_port: env_port("GRPC_PORT", 50054),
            http_port: env_port("HTTP_PORT", 5005),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_endpoint() {
        let ep = parse_endpoint("2=storage1:50052").unwrap();
        assert_eq!(ep.node_id, "2");
        assert_eq!(ep.host, "storage1");
        assert_eq!(ep.port, 50052);
    }

    #[test]
    fn default_topology_has_four_participants() {
        assert_eq!(default_participants().len(), 4);
    }

    #[test]
    fn grpc_uri_format() {
        let ep = ParticipantEndpoint { node_id: "2".into(), host: "storage1".into(), port: 50052 };
        assert_eq!(ep.grpc_uri(), "http://storage1:50052");
    }
}
