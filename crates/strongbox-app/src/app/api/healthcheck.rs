use salvo::{Router, handler};

use strongbox_service::access::RoleSet;

use crate::middleware::RequireRoles;

#[handler]
async fn healthcheck() -> &'static str {
    "OK"
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck")
        .hoop(RequireRoles::new(RoleSet::PUBLIC))
        .get(healthcheck)
}
