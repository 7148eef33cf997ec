use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use strongbox_core::error::CoreError;

use super::{CredentialStore, ShareStore};
use crate::error::{DbError, DbResult};
use crate::model::{
    session::Session,
    share::{NewShareLink, ShareLink},
    user::{NewUser, Role, User},
};

#[derive(Debug, Default)]
struct State {
    last_user_id: i64,
    users: BTreeMap<i64, User>,
    user_ids_by_name: HashMap<String, i64>,
    sessions: HashMap<String, Session>,
    shares: HashMap<String, ShareLink>,
}

impl State {
    fn insert_user(&mut self, new_user: NewUser<'_>) -> DbResult<User> {
        if self.user_ids_by_name.contains_key(new_user.username) {
            return Err(DbError::UniqueViolation(format!(
                "username {} already exists",
                new_user.username
            )));
        }

        self.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: self.last_user_id,
            username: new_user.username.to_string(),
            password_hash: new_user.password_hash.to_string(),
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };

        self.user_ids_by_name
            .insert(user.username.clone(), user.id);
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_user(&mut self, id: i64, apply: impl FnOnce(&mut User)) -> Option<User> {
        let user = self.users.get_mut(&id)?;
        apply(user);
        user.updated_at = Utc::now();
        Some(user.clone())
    }
}

/// ## Summary
/// Credential and share store held entirely in process memory.
///
/// All state sits behind one `RwLock`, so every operation is atomic with
/// respect to every other. Used by tests and by the `memory` backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .user_ids_by_name
            .get(username)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn user_by_id(&self, id: i64) -> DbResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn insert_user(&self, new_user: NewUser<'_>) -> DbResult<User> {
        self.state.write().await.insert_user(new_user)
    }

    async fn insert_first_user(&self, new_user: NewUser<'_>) -> DbResult<Option<User>> {
        let mut state = self.state.write().await;
        if !state.users.is_empty() {
            return Ok(None);
        }
        state.insert_user(new_user).map(Some)
    }

    async fn count_users(&self) -> DbResult<u64> {
        let count = self.state.read().await.users.len();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn update_role(&self, id: i64, role: Role) -> DbResult<Option<User>> {
        Ok(self
            .state
            .write()
            .await
            .update_user(id, |user| user.role = role))
    }

    async fn update_password_hash(
        &self,
        id: i64,
        password_hash: &str,
    ) -> DbResult<Option<User>> {
        Ok(self
            .state
            .write()
            .await
            .update_user(id, |user| user.password_hash = password_hash.to_string()))
    }

    async fn insert_session(&self, session: Session) -> DbResult<Session> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&session.user_id) {
            return Err(CoreError::NotFound(format!("user {}", session.user_id)).into());
        }
        if state.sessions.contains_key(&session.token_digest) {
            return Err(DbError::UniqueViolation(
                "session token already exists".to_string(),
            ));
        }
        state
            .sessions
            .insert(session.token_digest.clone(), session.clone());
        Ok(session)
    }

    async fn session_by_digest(&self, token_digest: &str) -> DbResult<Option<Session>> {
        Ok(self.state.read().await.sessions.get(token_digest).cloned())
    }

    async fn delete_session(&self, token_digest: &str) -> DbResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .sessions
            .remove(token_digest)
            .is_some())
    }

    async fn delete_sessions_for_user(&self, user_id: i64) -> DbResult<usize> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| session.user_id != user_id);
        Ok(before - state.sessions.len())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - state.sessions.len())
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn insert_share(&self, new_share: NewShareLink<'_>) -> DbResult<ShareLink> {
        let mut state = self.state.write().await;
        if state.shares.contains_key(new_share.token) {
            return Err(DbError::UniqueViolation(
                "share token already exists".to_string(),
            ));
        }
        let share = ShareLink {
            token: new_share.token.to_string(),
            path: new_share.path.to_string(),
            owner_user_id: new_share.owner_user_id,
            created_at: Utc::now(),
        };
        state.shares.insert(share.token.clone(), share.clone());
        Ok(share)
    }

    async fn share_by_token(&self, token: &str) -> DbResult<Option<ShareLink>> {
        Ok(self.state.read().await.shares.get(token).cloned())
    }

    async fn shares_for_owner(&self, owner_user_id: i64) -> DbResult<Vec<ShareLink>> {
        let state = self.state.read().await;
        let mut shares: Vec<ShareLink> = state
            .shares
            .values()
            .filter(|share| share.owner_user_id == owner_user_id)
            .cloned()
            .collect();
        shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shares)
    }

    async fn delete_share(&self, token: &str) -> DbResult<bool> {
        Ok(self.state.write().await.shares.remove(token).is_some())
    }

    async fn delete_shares_for_owner(&self, owner_user_id: i64) -> DbResult<usize> {
        let mut state = self.state.write().await;
        let before = state.shares.len();
        state
            .shares
            .retain(|_, share| share.owner_user_id != owner_user_id);
        Ok(before - state.shares.len())
    }
}
