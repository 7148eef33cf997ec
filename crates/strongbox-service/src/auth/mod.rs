//! Authentication and session flow.
//!
//! ## Module Organization
//!
//! - `identity`: the verified caller (`Identity`, `VerifiedUser`)
//! - `password`: Argon2 hashing and the credential policy
//! - `session`: the `SessionAuthenticator` (verify, login, logout, register, setup)
//! - `token`: opaque token generation and digesting

pub mod identity;
pub mod password;
pub mod session;
pub mod token;

pub use identity::{Identity, VerifiedUser};
pub use password::PasswordPolicy;
pub use session::{AuthSettings, IssuedSession, SessionAuthenticator};
