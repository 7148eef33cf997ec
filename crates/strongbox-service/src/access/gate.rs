use strongbox_core::config::AccessConfig;

use super::RoleSet;
use crate::{auth::Identity, error::AccessError};

/// Which rule allowed a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The caller's role is in the permitted set.
    Role,
    /// The caller is a verified user acting on their own resource.
    SameActor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny,
}

impl Decision {
    /// ## Errors
    /// Returns `AccessError::Unauthorized` for `Deny`.
    pub const fn into_result(self) -> Result<Grant, AccessError> {
        match self {
            Self::Allow(grant) => Ok(grant),
            Self::Deny => Err(AccessError::Unauthorized),
        }
    }
}

/// ## Summary
/// Decides whether an identity may perform an operation.
///
/// Pure function of its inputs; it never consults a store.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate {
    legacy_same_actor: bool,
}

impl From<&AccessConfig> for AccessGate {
    fn from(config: &AccessConfig) -> Self {
        Self::new(config.legacy_same_actor)
    }
}

impl AccessGate {
    #[must_use]
    pub const fn new(legacy_same_actor: bool) -> Self {
        Self { legacy_same_actor }
    }

    /// ## Summary
    /// Allows the request when the caller's role is in `permitted`.
    ///
    /// With `legacy_same_actor` enabled, a verified user whose id equals
    /// `subject` is also evaluated. That branch still requires role
    /// membership, so it never allows a request the role branch denies; it only
    /// changes which grant is recorded.
    #[tracing::instrument(level = "trace", skip(identity), fields(role = %identity.role()))]
    pub fn authorize(
        &self,
        identity: &Identity,
        permitted: RoleSet,
        subject: Option<i64>,
    ) -> Decision {
        let role_allowed = permitted.contains(identity.role());

        let same_actor = self.legacy_same_actor
            && role_allowed
            && subject.is_some()
            && identity.user_id() == subject;

        let decision = if same_actor {
            Decision::Allow(Grant::SameActor)
        } else if role_allowed {
            Decision::Allow(Grant::Role)
        } else {
            Decision::Deny
        };

        tracing::trace!(?decision, "Access decision");
        decision
    }
}
