mod admin;
mod files;
mod healthcheck;
mod setup;
mod shares;
mod user;

use salvo::{Request, Router};

use crate::{error::AppError, middleware::SessionMiddleware};

/// Path parameter carrying a vault-relative path.
const VAULT_PATH_PARAM: &str = "path";

/// ## Summary
/// Constructs the router for every Strongbox endpoint.
///
/// Every route passes through `SessionMiddleware`; each route then declares
/// the roles it admits with a `RequireRoles` hoop.
#[must_use]
pub fn routes() -> Router {
    Router::new()
        .hoop(SessionMiddleware)
        .push(healthcheck::routes())
        .push(files::routes())
        .push(shares::routes())
        .push(user::routes())
        .push(setup::routes())
        .push(admin::routes())
}

fn vault_path_param(req: &Request) -> String {
    req.param::<String>(VAULT_PATH_PARAM).unwrap_or_default()
}

async fn required_form_field(req: &mut Request, name: &str) -> Result<String, AppError> {
    req.form::<String>(name)
        .await
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing form field `{name}`")))
}
