//! Access-control and file-sharing engine.
//!
//! ## Module Organization
//!
//! - `auth`: sessions, password hashing and the `SessionAuthenticator`
//! - `access`: role sets and the `AccessGate`
//! - `vault`: path confinement and the `FileVault` manager
//! - `share`: share-link issuance and resolution (`ShareRegistry`)
//! - `error`: error taxonomy shared by the components above

pub mod access;
pub mod auth;
pub mod error;
pub mod share;
pub mod vault;
