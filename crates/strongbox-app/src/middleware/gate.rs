use salvo::{Depot, FlowCtrl, Request, Response, Writer};

use strongbox_service::access::{Grant, RoleSet};

use super::identity_from_depot;
use crate::{error::AppError, state::get_state_from_depot};

/// ## Summary
/// Hoop that admits a request only if the caller's role is in `permitted`.
///
/// Denied requests get a 401 with a `Location` pointing at the login route
/// and never reach the handler. When `subject_param` is set, that path
/// parameter is read as the id of the user the request acts on.
#[derive(Debug, Clone, Copy)]
pub struct RequireRoles {
    permitted: RoleSet,
    subject_param: Option<&'static str>,
}

impl RequireRoles {
    #[must_use]
    pub const fn new(permitted: RoleSet) -> Self {
        Self {
            permitted,
            subject_param: None,
        }
    }

    #[must_use]
    pub const fn with_subject_param(mut self, name: &'static str) -> Self {
        self.subject_param = Some(name);
        self
    }
}

#[salvo::async_trait]
impl salvo::Handler for RequireRoles {
    #[tracing::instrument(skip_all, fields(permitted = ?self.permitted))]
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let state = match get_state_from_depot(depot) {
            Ok(state) => state,
            Err(e) => {
                ctrl.skip_rest();
                e.write(req, depot, res).await;
                return;
            }
        };

        let identity = identity_from_depot(depot);
        let subject = self.subject_param.and_then(|name| req.param::<i64>(name));

        match state
            .gate
            .authorize(&identity, self.permitted, subject)
            .into_result()
        {
            Ok(Grant::SameActor) => {
                tracing::debug!(subject = ?subject, "Admitted acting on own record");
            }
            Ok(Grant::Role) => {}
            Err(denied) => {
                tracing::debug!(role = %identity.role(), "Request denied by role gate");
                ctrl.skip_rest();
                AppError::from(denied).write(req, depot, res).await;
            }
        }
    }
}
