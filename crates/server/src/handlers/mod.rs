//! HTTP request handlers.

pub mod blocks;
pub mod files;
pub mod health;

pub use blocks::*;
pub use files::*;
pub use health::*;
