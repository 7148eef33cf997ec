//! Strongbox shared building blocks: configuration, route constants and the
//! dependency-free error type used across crates.

pub mod config;
pub mod constants;
pub mod error;
