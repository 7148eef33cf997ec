use std::str::FromStr;

use salvo::{Depot, Request, Router, handler, writing::Json};

use strongbox_core::constants::ADMIN_ROUTE_COMPONENT;
use strongbox_db::model::user::{Role, User};
use strongbox_service::access::RoleSet;

use super::required_form_field;
use crate::{
    error::{AppError, AppResult},
    middleware::RequireRoles,
    state::get_state_from_depot,
};

const USER_ID_PARAM: &str = "id";

/// ## Summary
/// GET /admin/users - Lists every account.
#[handler]
async fn list_users(depot: &mut Depot) -> AppResult<Json<Vec<User>>> {
    let state = get_state_from_depot(depot)?;
    Ok(Json(state.authenticator.list_users().await?))
}

/// ## Summary
/// POST /admin/users/{id}/role - Assigns a role to a user.
///
/// ## Side Effects
/// Revokes every session of the target user. A role that may not read the
/// vault also loses every share link it issued.
///
/// ## Errors
/// Returns 400 for an unknown role and 404 for an unknown user.
#[handler]
async fn set_role(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let state = get_state_from_depot(depot)?;
    let user_id = req
        .param::<i64>(USER_ID_PARAM)
        .ok_or_else(|| AppError::BadRequest("Invalid user id".to_string()))?;
    let role = Role::from_str(&required_form_field(req, "role").await?)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state.authenticator.set_role(user_id, role).await?;
    if !RoleSet::VAULT_READ.contains(role) {
        state.shares.revoke_all_for(user_id).await?;
    }

    Ok(Json(user))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(format!("{ADMIN_ROUTE_COMPONENT}/users"))
        .push(
            Router::new()
                .hoop(RequireRoles::new(RoleSet::ADMIN_ONLY))
                .get(list_users),
        )
        .push(
            Router::with_path(format!("{{{USER_ID_PARAM}}}/role"))
                .hoop(RequireRoles::new(RoleSet::ADMIN_ONLY).with_subject_param(USER_ID_PARAM))
                .post(set_role),
        )
}
