//! Credential store for Strongbox: user, session and share-link records.
//!
//! The [`store`] module defines the contract the service layer depends on and
//! ships two implementations of it, a diesel-async PostgreSQL store and an
//! in-memory store.

pub mod db;
pub mod error;
pub mod model;
pub mod store;
