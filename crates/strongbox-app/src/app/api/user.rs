use salvo::{
    Depot, Request, Response, Router, handler,
    http::{
        StatusCode,
        cookie::{Cookie, SameSite},
    },
    writing::Json,
};
use serde::Serialize;
use serde_json::json;

use strongbox_core::constants::{SESSION_COOKIE, USER_ROUTE_COMPONENT};
use strongbox_db::model::user::User;
use strongbox_service::{
    access::RoleSet,
    auth::{Identity, IssuedSession, VerifiedUser},
};

use super::required_form_field;
use crate::{
    config::get_config_from_depot,
    error::AppResult,
    middleware::{RequireRoles, identity_from_depot, require_user},
    state::get_state_from_depot,
};

/// ## Summary
/// Login response payload
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: VerifiedUser,
    /// RFC 3339 expiry of the new session.
    pub expires_at: String,
}

/// Sets the session cookie for a freshly issued session.
pub(super) fn set_session_cookie(res: &mut Response, issued: &IssuedSession, secure: bool) {
    res.add_cookie(
        Cookie::build((SESSION_COOKIE, issued.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .build(),
    );
}

fn session_token(req: &Request) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

/// ## Summary
/// POST /user/login - Verifies credentials and opens a session.
///
/// ## Side Effects
/// Sets the `strongbox_session` cookie.
///
/// ## Errors
/// Returns 400 for missing fields or invalid credentials.
#[handler]
async fn login(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<LoginResponse>> {
    let state = get_state_from_depot(depot)?;
    let config = get_config_from_depot(depot)?;
    let username = required_form_field(req, "username").await?;
    let password = required_form_field(req, "password").await?;

    let (user, issued) = state.authenticator.login(&username, &password).await?;
    set_session_cookie(res, &issued, config.auth.secure_cookie);

    Ok(Json(LoginResponse {
        user,
        expires_at: issued.session.expires_at.to_rfc3339(),
    }))
}

/// ## Summary
/// GET /user/logout - Ends the current session.
///
/// ## Side Effects
/// Deletes the session record and clears the cookie.
#[handler]
async fn logout(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<StatusCode> {
    let state = get_state_from_depot(depot)?;
    if let Some(token) = session_token(req) {
        state.authenticator.logout(&token).await?;
    }
    res.remove_cookie(SESSION_COOKIE);
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// POST /user/register - Creates a user with the `user` role.
///
/// ## Errors
/// Returns 400 for weak credentials, 409 if the username is taken and 403 if
/// registration is closed.
#[handler]
async fn register(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<User>> {
    let state = get_state_from_depot(depot)?;
    let username = required_form_field(req, "username").await?;
    let password = required_form_field(req, "password").await?;

    let user = state.authenticator.register(&username, &password).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(user))
}

/// ## Summary
/// POST /user/password - Replaces the caller's password.
///
/// ## Side Effects
/// Revokes every session of the caller and clears the cookie.
#[handler]
async fn change_password(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<StatusCode> {
    let state = get_state_from_depot(depot)?;
    let user = require_user(depot)?;
    let current = required_form_field(req, "current_password").await?;
    let new = required_form_field(req, "new_password").await?;

    state
        .authenticator
        .change_password(user.user_id, &current, &new)
        .await?;

    res.remove_cookie(SESSION_COOKIE);
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// Returns the caller's identity as JSON.
#[handler]
async fn whoami(depot: &Depot) -> Json<serde_json::Value> {
    match identity_from_depot(depot) {
        Identity::User(user) => Json(json!({ "status": "authenticated", "user": user })),
        Identity::Anonymous => Json(json!({ "status": "anonymous" })),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(USER_ROUTE_COMPONENT)
        .push(
            Router::with_path("login")
                .hoop(RequireRoles::new(RoleSet::PUBLIC))
                .post(login),
        )
        .push(
            Router::with_path("logout")
                .hoop(RequireRoles::new(RoleSet::AUTHENTICATED))
                .get(logout),
        )
        .push(
            Router::with_path("register")
                .hoop(RequireRoles::new(RoleSet::PUBLIC))
                .post(register),
        )
        .push(
            Router::with_path("password")
                .hoop(RequireRoles::new(RoleSet::AUTHENTICATED))
                .post(change_password),
        )
        .push(
            Router::with_path("whoami")
                .hoop(RequireRoles::new(RoleSet::PUBLIC))
                .get(whoami),
        )
}
