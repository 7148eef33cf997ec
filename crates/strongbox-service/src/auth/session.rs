use std::sync::Arc;

use chrono::{DateTime, Utc};

use strongbox_core::config::AuthConfig;
use strongbox_db::{
    error::DbError,
    model::{
        session::Session,
        user::{NewUser, Role, User},
    },
    store::CredentialStore,
};

use super::{
    identity::{Identity, VerifiedUser},
    password::{self, PasswordPolicy},
    token,
};
use crate::error::AuthError;

/// Authentication knobs derived from `AuthConfig`.
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub session_ttl: chrono::Duration,
    pub password_policy: PasswordPolicy,
    pub allow_registration: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::days(7),
            password_policy: PasswordPolicy::default(),
            allow_registration: true,
        }
    }
}

impl From<&AuthConfig> for AuthSettings {
    fn from(config: &AuthConfig) -> Self {
        let ttl_seconds = i64::try_from(config.session_ttl_seconds).unwrap_or(i64::MAX);
        Self {
            session_ttl: chrono::Duration::try_seconds(ttl_seconds)
                .unwrap_or(chrono::Duration::MAX),
            password_policy: PasswordPolicy {
                min_length: config.min_password_length,
            },
            allow_registration: config.allow_registration,
        }
    }
}

/// A freshly created session together with the raw token for the client.
#[derive(Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

impl std::fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSession")
            .field("token", &"<redacted>")
            .field("session", &self.session)
            .finish()
    }
}

/// ## Summary
/// Owns every write to user and session records and turns session tokens into
/// verified identities.
pub struct SessionAuthenticator {
    store: Arc<dyn CredentialStore>,
    settings: AuthSettings,
}

impl SessionAuthenticator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, settings: AuthSettings) -> Self {
        Self { store, settings }
    }

    /// ## Summary
    /// Resolves a session token to the identity of its user.
    ///
    /// A missing, malformed, unknown or expired token yields `Anonymous`, as does
    /// a session whose user no longer exists. Store failures are logged and also
    /// yield `Anonymous`.
    ///
    /// ## Side Effects
    /// Deletes the session record if it has expired.
    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, token: Option<&str>) -> Identity {
        let Some(token) = token.filter(|t| token::is_well_formed(t)) else {
            return Identity::Anonymous;
        };

        match self.lookup(token).await {
            Ok(Some(user)) => Identity::User(VerifiedUser::from(&user)),
            Ok(None) => Identity::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "Session lookup failed; treating request as anonymous");
                Identity::Anonymous
            }
        }
    }

    async fn lookup(&self, token: &str) -> Result<Option<User>, DbError> {
        let digest = token::token_digest(token);
        let Some(session) = self.store.session_by_digest(&digest).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            tracing::debug!(user_id = session.user_id, "Session expired");
            self.store.delete_session(&digest).await?;
            return Ok(None);
        }

        let user = self.store.user_by_id(session.user_id).await?;
        if user.is_none() {
            tracing::warn!(user_id = session.user_id, "Session refers to a missing user");
        }
        Ok(user)
    }

    /// ## Summary
    /// Checks the credentials and opens a new session.
    ///
    /// ## Errors
    /// Returns `InvalidCredentials` if the user is unknown or the password does not match.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(VerifiedUser, IssuedSession), AuthError> {
        let Some(user) = self.store.user_by_username(username).await? else {
            let attempt = password.to_string();
            run_blocking(move || {
                password::burn_verification(&attempt);
                Ok(())
            })
            .await?;
            tracing::debug!("Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        let attempt = password.to_string();
        let stored_hash = user.password_hash.clone();
        run_blocking(move || password::verify_password(&attempt, &stored_hash)).await?;

        let issued = self.issue_session(&user).await?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok((VerifiedUser::from(&user), issued))
    }

    /// ## Summary
    /// Creates a session for an already authenticated user.
    ///
    /// ## Errors
    /// Returns an error if the session cannot be stored.
    pub async fn issue_session(&self, user: &User) -> Result<IssuedSession, AuthError> {
        let token = token::generate_token();
        let issued_at = Utc::now();
        let session = self
            .store
            .insert_session(Session {
                token_digest: token::token_digest(&token),
                user_id: user.id,
                issued_at,
                expires_at: issued_at
                    .checked_add_signed(self.settings.session_ttl)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            })
            .await?;

        Ok(IssuedSession { token, session })
    }

    /// ## Summary
    /// Ends the session. Unknown tokens are ignored.
    ///
    /// ## Errors
    /// Returns an error only if the store fails.
    #[tracing::instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let removed = self
            .store
            .delete_session(&token::token_digest(token))
            .await?;
        tracing::debug!(removed, "Logout processed");
        Ok(())
    }

    /// ## Summary
    /// Registers a new user with the `User` role.
    ///
    /// ## Errors
    /// Returns `RegistrationClosed`, `WeakCredentials` or `UsernameTaken`.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if !self.settings.allow_registration {
            return Err(AuthError::RegistrationClosed);
        }

        password::validate_username(username)?;
        if self.store.user_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        self.settings.password_policy.check(password)?;

        let password_hash = hash_blocking(password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                username,
                password_hash: &password_hash,
                role: Role::User,
            })
            .await
            .map_err(username_conflict)?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// ## Summary
    /// Creates the first administrator. Only succeeds while no user exists.
    ///
    /// ## Errors
    /// Returns `SetupComplete` if any user already exists, or `WeakCredentials`.
    #[tracing::instrument(skip(self, password))]
    pub async fn setup(&self, username: &str, password: &str) -> Result<User, AuthError> {
        password::validate_username(username)?;
        self.settings.password_policy.check(password)?;

        if self.store.count_users().await? > 0 {
            return Err(AuthError::SetupComplete);
        }

        let password_hash = hash_blocking(password).await?;
        let user = self
            .store
            .insert_first_user(NewUser {
                username,
                password_hash: &password_hash,
                role: Role::Admin,
            })
            .await?
            .ok_or(AuthError::SetupComplete)?;

        tracing::info!(user_id = user.id, "Initial administrator created");
        Ok(user)
    }

    /// ## Summary
    /// Seeds the configured administrator when the store is empty.
    ///
    /// ## Errors
    /// Returns an error if the credentials are invalid or the store fails.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        match self.setup(username, password).await {
            Ok(user) => Ok(Some(user)),
            Err(AuthError::SetupComplete) => {
                tracing::debug!("Users already exist; skipping bootstrap administrator");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// ## Summary
    /// Replaces the password after checking the current one.
    ///
    /// ## Side Effects
    /// Revokes every session of the user, including the one making the request.
    ///
    /// ## Errors
    /// Returns `InvalidCredentials` if the current password does not match.
    #[tracing::instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        let attempt = current_password.to_string();
        let stored_hash = user.password_hash.clone();
        run_blocking(move || password::verify_password(&attempt, &stored_hash)).await?;

        self.settings.password_policy.check(new_password)?;
        let password_hash = hash_blocking(new_password).await?;

        self.store
            .update_password_hash(user_id, &password_hash)
            .await?
            .ok_or(AuthError::UnknownUser)?;
        let revoked = self.store.delete_sessions_for_user(user_id).await?;

        tracing::info!(user_id, revoked, "Password changed");
        Ok(())
    }

    /// ## Summary
    /// Changes a user's role.
    ///
    /// ## Side Effects
    /// Revokes every session of the user.
    ///
    /// ## Errors
    /// Returns `UnknownUser` if no such user exists.
    #[tracing::instrument(skip(self))]
    pub async fn set_role(&self, user_id: i64, role: Role) -> Result<User, AuthError> {
        let user = self
            .store
            .update_role(user_id, role)
            .await?
            .ok_or(AuthError::UnknownUser)?;
        let revoked = self.store.delete_sessions_for_user(user_id).await?;

        tracing::info!(user_id, %role, revoked, "Role changed");
        Ok(user)
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.store.list_users().await?)
    }

    /// ## Summary
    /// Removes every expired session.
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn purge_expired(&self) -> Result<usize, AuthError> {
        let purged = self.store.purge_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "Expired sessions purged");
        }
        Ok(purged)
    }
}

fn username_conflict(err: DbError) -> AuthError {
    match err {
        DbError::UniqueViolation(_) => AuthError::UsernameTaken,
        other => AuthError::Store(other),
    }
}

async fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    run_blocking(move || password::hash_password(&password)).await
}

/// Argon2 is CPU bound; keep it off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AuthError::Hashing(format!("Hashing task failed: {e}")))?
}
