//! Integration tests and the fixtures they share

pub mod e2e;
pub mod fixtures;
