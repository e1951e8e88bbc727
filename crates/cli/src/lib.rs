//! Client library for shardfs.
//!
//! - `engine`: upload, download, delete and read against a deployment
//! - `api_client`: the metadata store reached over HTTP

pub mod api_client;
pub mod engine;
pub mod error;

pub use api_client::RemoteMetadata;
pub use engine::{Client, Outcome};
pub use error::{ClientError, ClientResult};
