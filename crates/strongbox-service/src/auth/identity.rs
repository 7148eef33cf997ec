use serde::Serialize;

use strongbox_db::model::user::{Role, User};

/// A user whose session token was verified against the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedUser {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl From<&User> for VerifiedUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }
}

/// Caller identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    User(VerifiedUser),
    /// No valid session; acts with the `Guest` role.
    Anonymous,
}

impl Identity {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::User(user) => user.role,
            Self::Anonymous => Role::Guest,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&VerifiedUser> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|user| user.user_id)
    }
}
