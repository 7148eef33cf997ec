use salvo::Depot;

use strongbox_core::constants::SESSION_COOKIE;
use strongbox_service::{
    auth::{Identity, VerifiedUser},
    error::AccessError,
};

use super::depot_keys;
use crate::{error::AppResult, state::get_state_from_depot};

/// ## Summary
/// Resolves the session cookie to an `Identity` and stores it in the depot.
///
/// Requests without a valid session continue as `Identity::Anonymous`; the
/// role gate decides whether that is enough.
///
/// ## Side Effects
/// Inserts the identity into the depot under `depot_keys::IDENTITY`.
pub struct SessionMiddleware;

#[salvo::async_trait]
impl salvo::Handler for SessionMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let state = match get_state_from_depot(depot) {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(error = ?e, "Failed to get application state from depot");
                res.status_code(salvo::http::StatusCode::INTERNAL_SERVER_ERROR);
                ctrl.skip_rest();
                return;
            }
        };

        let token = req.cookie(SESSION_COOKIE).map(|cookie| cookie.value().to_string());
        let identity = state.authenticator.verify(token.as_deref()).await;

        if let Identity::User(user) = &identity {
            tracing::trace!(user_id = user.user_id, role = %user.role, "Session verified");
        }
        depot.insert(depot_keys::IDENTITY, identity);
    }
}

/// Identity resolved by `SessionMiddleware`, `Anonymous` if none was stored.
#[must_use]
pub fn identity_from_depot(depot: &Depot) -> Identity {
    depot
        .get::<Identity>(depot_keys::IDENTITY)
        .cloned()
        .unwrap_or(Identity::Anonymous)
}

/// ## Errors
/// Returns `AccessError::Unauthorized` if the request carries no verified user.
pub fn require_user(depot: &Depot) -> AppResult<VerifiedUser> {
    match identity_from_depot(depot) {
        Identity::User(user) => Ok(user),
        Identity::Anonymous => Err(AccessError::Unauthorized.into()),
    }
}
