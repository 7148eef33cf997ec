use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};

use strongbox_core::constants::SETUP_ROUTE_COMPONENT;
use strongbox_db::model::user::User;
use strongbox_service::access::RoleSet;

use super::{required_form_field, user::set_session_cookie};
use crate::{
    config::get_config_from_depot, error::AppResult, middleware::RequireRoles,
    state::get_state_from_depot,
};

/// ## Summary
/// POST /setup - Creates the first administrator and signs them in.
///
/// Only anonymous callers reach this handler, and only while the store holds
/// no user.
///
/// ## Errors
/// Returns 409 once any user exists and 400 for weak credentials.
#[handler]
async fn setup(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<Json<User>> {
    let state = get_state_from_depot(depot)?;
    let config = get_config_from_depot(depot)?;
    let username = required_form_field(req, "username").await?;
    let password = required_form_field(req, "password").await?;

    let user = state.authenticator.setup(&username, &password).await?;
    let issued = state.authenticator.issue_session(&user).await?;
    set_session_cookie(res, &issued, config.auth.secure_cookie);

    res.status_code(StatusCode::CREATED);
    Ok(Json(user))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(SETUP_ROUTE_COMPONENT)
        .hoop(RequireRoles::new(RoleSet::SETUP))
        .post(setup)
}
