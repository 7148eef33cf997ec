use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use strongbox_core::constants::{
    SHARE_ROUTE_COMPONENT, SHARED_ROUTE_PREFIX, SHARES_ROUTE_COMPONENT, SHARED_ROUTE_COMPONENT,
    UNSHARE_ROUTE_COMPONENT,
};
use strongbox_db::model::share::ShareLink;
use strongbox_service::{access::RoleSet, error::ShareError, vault::VaultView};

use super::vault_path_param;
use crate::{
    config::get_config_from_depot,
    error::AppResult,
    middleware::{RequireRoles, require_user},
    state::get_state_from_depot,
};

const TOKEN_QUERY: &str = "token";

#[derive(Debug, Serialize)]
pub struct ShareCreatedResponse {
    pub token: String,
    pub path: String,
    pub url: String,
}

fn token_query(req: &Request) -> AppResult<String> {
    req.query::<String>(TOKEN_QUERY)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ShareError::NotFound.into())
}

/// ## Summary
/// POST /share/{path} - Issues a share link for an existing entry.
#[handler]
async fn create_share(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<ShareCreatedResponse>> {
    let state = get_state_from_depot(depot)?;
    let config = get_config_from_depot(depot)?;
    let owner = require_user(depot)?;

    let share = state
        .shares
        .create_share(&owner, &vault_path_param(req))
        .await?;
    let url = format!(
        "{}{SHARED_ROUTE_PREFIX}?{TOKEN_QUERY}={}",
        config.server.origin(),
        share.token
    );

    res.status_code(StatusCode::CREATED);
    Ok(Json(ShareCreatedResponse {
        token: share.token,
        path: share.path,
        url,
    }))
}

/// ## Summary
/// GET /shares - Lists the caller's share links, newest first.
#[handler]
async fn list_shares(depot: &mut Depot) -> AppResult<Json<Vec<ShareLink>>> {
    let state = get_state_from_depot(depot)?;
    let owner = require_user(depot)?;
    Ok(Json(state.shares.list_for(owner.user_id).await?))
}

/// ## Summary
/// POST /unshare?token=T - Revokes a share link owned by the caller.
///
/// Administrators may revoke any link. Unknown tokens and links owned by
/// someone else both yield 404.
#[handler]
async fn unshare(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let state = get_state_from_depot(depot)?;
    let actor = require_user(depot)?;
    let token = token_query(req)?;

    state.shares.revoke(&actor, &token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// GET /shared?token=T - Renders a shared entry without requiring a session.
#[handler]
async fn shared(req: &mut Request, depot: &mut Depot) -> AppResult<Json<VaultView>> {
    let state = get_state_from_depot(depot)?;
    let token = token_query(req)?;
    Ok(Json(state.shares.render_shared(&token).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(
            Router::with_path(format!("{SHARE_ROUTE_COMPONENT}/{{**path}}"))
                .hoop(RequireRoles::new(RoleSet::VAULT_READ))
                .post(create_share),
        )
        .push(
            Router::with_path(SHARES_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::AUTHENTICATED))
                .get(list_shares),
        )
        .push(
            Router::with_path(UNSHARE_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::AUTHENTICATED))
                .post(unshare),
        )
        .push(
            Router::with_path(SHARED_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::PUBLIC))
                .get(shared),
        )
}
