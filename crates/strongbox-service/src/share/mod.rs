//! Share Registry: opaque tokens granting anonymous read of one vault path.

use std::sync::Arc;

use strongbox_db::{
    model::{
        share::{NewShareLink, ShareLink},
        user::Role,
    },
    store::{CredentialStore, ShareStore},
};

use crate::{
    access::RoleSet,
    auth::{VerifiedUser, token},
    error::{PathError, ShareError},
    vault::{FileVault, VaultView},
};

/// ## Summary
/// Issues, resolves and revokes share links.
///
/// Rendering a shared path goes through the same [`FileVault`] confinement as
/// an authenticated crawl; only the role gate is bypassed.
pub struct ShareRegistry {
    shares: Arc<dyn ShareStore>,
    users: Arc<dyn CredentialStore>,
    vault: FileVault,
}

impl ShareRegistry {
    #[must_use]
    pub fn new(
        shares: Arc<dyn ShareStore>,
        users: Arc<dyn CredentialStore>,
        vault: FileVault,
    ) -> Self {
        Self {
            shares,
            users,
            vault,
        }
    }

    /// ## Summary
    /// Creates a share link for an existing entry.
    ///
    /// The stored path is the normalized form, so `docs//a.txt` and
    /// `docs/a.txt` share one spelling.
    ///
    /// ## Errors
    /// Returns `Forbidden` if the owner may not read the vault or the path does
    /// not resolve to an entry under the root.
    #[tracing::instrument(skip(self, owner), fields(owner = owner.user_id))]
    pub async fn create_share(
        &self,
        owner: &VerifiedUser,
        relative_path: &str,
    ) -> Result<ShareLink, ShareError> {
        if !RoleSet::VAULT_READ.contains(owner.role) {
            return Err(ShareError::Forbidden);
        }

        let resolved = self.vault.locate(relative_path).await.map_err(|e| match e {
            PathError::NotFound | PathError::Forbidden => ShareError::Forbidden,
            other => ShareError::Path(other),
        })?;

        let token = token::generate_token();
        let share = self
            .shares
            .insert_share(NewShareLink {
                token: &token,
                path: &resolved.relative,
                owner_user_id: owner.user_id,
            })
            .await?;

        tracing::info!(path = %share.path, "Share link created");
        Ok(share)
    }

    /// ## Summary
    /// Returns the vault-relative path a token grants.
    ///
    /// ## Errors
    /// Returns `NotFound` for malformed, unknown or revoked tokens and for
    /// shares whose owner no longer exists.
    #[tracing::instrument(skip_all)]
    pub async fn resolve_share(&self, token: &str) -> Result<String, ShareError> {
        if !token::is_well_formed(token) {
            return Err(ShareError::NotFound);
        }

        let share = self
            .shares
            .share_by_token(token)
            .await?
            .ok_or(ShareError::NotFound)?;

        if self.users.user_by_id(share.owner_user_id).await?.is_none() {
            tracing::warn!(owner = share.owner_user_id, "Share owner no longer exists");
            return Err(ShareError::NotFound);
        }

        Ok(share.path)
    }

    /// ## Summary
    /// Resolves the token and crawls the shared path.
    ///
    /// ## Errors
    /// Returns `NotFound` if the token does not resolve or the path vanished
    /// or now escapes the root.
    pub async fn render_shared(&self, token: &str) -> Result<VaultView, ShareError> {
        let path = self.resolve_share(token).await?;
        Ok(self.vault.crawl(&path).await?)
    }

    /// ## Summary
    /// Revokes a share. Its owner and administrators may revoke it.
    ///
    /// ## Errors
    /// Returns `NotFound` if the token is unknown or the actor may not revoke it.
    #[tracing::instrument(skip(self, actor, token), fields(actor = actor.user_id))]
    pub async fn revoke(&self, actor: &VerifiedUser, token: &str) -> Result<(), ShareError> {
        let share = self
            .shares
            .share_by_token(token)
            .await?
            .ok_or(ShareError::NotFound)?;

        if share.owner_user_id != actor.user_id && actor.role != Role::Admin {
            tracing::debug!("Revocation refused for non-owner");
            return Err(ShareError::NotFound);
        }

        if !self.shares.delete_share(token).await? {
            return Err(ShareError::NotFound);
        }
        tracing::info!(path = %share.path, "Share link revoked");
        Ok(())
    }

    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn revoke_all_for(&self, owner_user_id: i64) -> Result<usize, ShareError> {
        let revoked = self.shares.delete_shares_for_owner(owner_user_id).await?;
        tracing::info!(owner = owner_user_id, revoked, "Share links revoked");
        Ok(revoked)
    }

    /// Shares owned by the user, newest first.
    ///
    /// ## Errors
    /// Returns an error if the store fails.
    pub async fn list_for(&self, owner_user_id: i64) -> Result<Vec<ShareLink>, ShareError> {
        Ok(self.shares.shares_for_owner(owner_user_id).await?)
    }
}
