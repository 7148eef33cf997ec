pub mod gate;
pub mod session;

pub mod depot_keys {
    pub const IDENTITY: &str = "__identity";
}

pub use gate::RequireRoles;
pub use session::{SessionMiddleware, identity_from_depot, require_user};
