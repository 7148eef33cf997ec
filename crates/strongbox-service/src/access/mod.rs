//! Role-based authorization.
//!
//! ## Module Organization
//!
//! - `role_set`: `RoleSet` and the role sets each operation declares
//! - `gate`: the `AccessGate` decision function

pub mod gate;
pub mod role_set;

pub use gate::{AccessGate, Decision, Grant};
pub use role_set::RoleSet;
