//! Two-phase commit coordination for a distributed file-upload service.
//!
//! Three roles share this crate: a coordinator that drives the commit
//! protocol and fronts the public HTTP API, and two participant flavors
//! (storage, metadata) that vote on and apply one phase each. See
//! `proto/twopc.proto` for the wire schema shared by all three.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod http;
pub mod participant;
pub mod pb;
pub mod protocol;
pub mod registry;

pub use coordinator::Coordinator;
pub use participant::metadata::MetadataParticipant;
pub use participant::storage::StorageParticipant;
pub use registry::ParticipantRegistry;
