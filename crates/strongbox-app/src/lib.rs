//! HTTP surface of the Strongbox file vault.
//!
//! ## Module Organization
//!
//! - `app::api`: route table and handlers
//! - `middleware`: session resolution and the role gate hoop
//! - `state`: shared components injected into every request
//! - `config`: depot access to the loaded `Settings`
//! - `error`: `AppError` and its HTTP rendering

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod state;
