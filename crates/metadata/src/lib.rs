//! Metadata store for shardfs.
//!
//! This crate provides the control-plane data model:
//! - The `MetadataService` capability (`read_file`, `modify_file`, `delete_file`)
//! - `MetadataStore`, the authoritative in-memory implementation
//! - `MetadataError`, whose protocol variants are shared with remote clients

pub mod error;
pub mod service;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use service::MetadataService;
pub use store::MetadataStore;
