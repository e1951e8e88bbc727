//! Common test utilities and fixtures.

pub mod cluster;

#[allow(unused_imports)]
pub use cluster::*;
