//! Storage contract consumed by the service layer.
//!
//! ## Module Organization
//!
//! - `memory`: process-local store backed by `tokio::sync::RwLock`
//! - `postgres`: diesel-async store over a bb8 connection pool
//!
//! Every method is a single atomic operation against the backing store, so a
//! logout racing a login on the same token always observes either the whole
//! session record or none of it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use crate::model::{
    session::Session,
    share::{NewShareLink, ShareLink},
    user::{NewUser, Role, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// User and session records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn user_by_username(&self, username: &str) -> DbResult<Option<User>>;

    async fn user_by_id(&self, id: i64) -> DbResult<Option<User>>;

    /// ## Errors
    /// Returns `DbError::UniqueViolation` if the username is already taken.
    async fn insert_user(&self, new_user: NewUser<'_>) -> DbResult<User>;

    /// Inserts the user only if no user exists yet. Returns `None` otherwise.
    async fn insert_first_user(&self, new_user: NewUser<'_>) -> DbResult<Option<User>>;

    async fn count_users(&self) -> DbResult<u64>;

    /// All users ordered by id.
    async fn list_users(&self) -> DbResult<Vec<User>>;

    async fn update_role(&self, id: i64, role: Role) -> DbResult<Option<User>>;

    async fn update_password_hash(&self, id: i64, password_hash: &str)
    -> DbResult<Option<User>>;

    async fn insert_session(&self, session: Session) -> DbResult<Session>;

    async fn session_by_digest(&self, token_digest: &str) -> DbResult<Option<Session>>;

    /// Returns whether a session was removed. Removing an unknown digest is not an error.
    async fn delete_session(&self, token_digest: &str) -> DbResult<bool>;

    async fn delete_sessions_for_user(&self, user_id: i64) -> DbResult<usize>;

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<usize>;
}

/// Share-link records.
#[async_trait]
pub trait ShareStore: Send + Sync {
    async fn insert_share(&self, new_share: NewShareLink<'_>) -> DbResult<ShareLink>;

    async fn share_by_token(&self, token: &str) -> DbResult<Option<ShareLink>>;

    /// Shares owned by the user, newest first.
    async fn shares_for_owner(&self, owner_user_id: i64) -> DbResult<Vec<ShareLink>>;

    async fn delete_share(&self, token: &str) -> DbResult<bool>;

    async fn delete_shares_for_owner(&self, owner_user_id: i64) -> DbResult<usize>;
}
