pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{block_of, seeded_bytes};
