use std::fmt;

use strongbox_db::model::user::Role;

/// Non-empty set of roles permitted to perform an operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

const fn bit(role: Role) -> u8 {
    match role {
        Role::Admin => 1,
        Role::User => 1 << 1,
        Role::Guest => 1 << 2,
    }
}

impl RoleSet {
    /// Browsing and reading vault entries.
    pub const VAULT_READ: Self = Self::of(&[Role::Admin, Role::User]);
    /// Uploading, deleting and creating vault entries.
    pub const VAULT_WRITE: Self = Self::of(&[Role::Admin, Role::User]);
    /// Any signed-in user.
    pub const AUTHENTICATED: Self = Self::of(&[Role::Admin, Role::User]);
    /// Every caller, including anonymous ones.
    pub const PUBLIC: Self = Self::of(&Role::ALL);
    /// First-run setup, only reachable before anyone has signed in.
    pub const SETUP: Self = Self::of(&[Role::Guest]);
    pub const ADMIN_ONLY: Self = Self::of(&[Role::Admin]);

    /// ## Panics
    /// Panics if `roles` is empty. In a `const` this fails compilation instead.
    #[must_use]
    pub const fn of(roles: &[Role]) -> Self {
        assert!(!roles.is_empty(), "a role set must permit at least one role");

        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= bit(roles[i]);
            i += 1;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & bit(role) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
