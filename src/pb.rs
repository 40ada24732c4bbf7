//! Generated gRPC types for the 2PC wire protocol.
//!
//! See `proto/twopc.proto` for the schema; `build.rs` compiles it with
//! `tonic-build` at build time.

tonic::include_proto!("twopc");
