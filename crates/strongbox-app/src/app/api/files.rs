use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use strongbox_core::constants::{
    DELETE_ROUTE_COMPONENT, FILES_ROUTE_COMPONENT, MKDIR_ROUTE_COMPONENT, UPLOAD_FIELD,
    UPLOAD_ROUTE_COMPONENT,
};
use strongbox_service::{
    access::RoleSet,
    error::UploadError,
    vault::{StoredFile, VaultView},
};

use super::vault_path_param;
use crate::{
    error::AppResult,
    middleware::RequireRoles,
    state::get_state_from_depot,
};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub stored: Vec<StoredFile>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryCreatedResponse {
    pub path: String,
}

/// ## Summary
/// GET /files/{path} - Lists a directory or returns a file's text.
#[handler]
async fn crawl(req: &mut Request, depot: &mut Depot) -> AppResult<Json<VaultView>> {
    let state = get_state_from_depot(depot)?;
    let path = vault_path_param(req);
    Ok(Json(state.vault.crawl(&path).await?))
}

/// ## Summary
/// POST /upload/{dir} - Stores every multipart part of the `files` field in `dir`.
///
/// The target directory may also be given as the `dir` query parameter when
/// the path is empty.
///
/// The batch is all or nothing: a rejected part stores none of the others.
///
/// ## Errors
/// Returns 400 if no file part is present or one has no filename.
#[handler]
async fn upload(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<UploadResponse>> {
    let state = get_state_from_depot(depot)?;

    let mut dir = vault_path_param(req);
    if dir.is_empty() {
        dir = req.query::<String>("dir").unwrap_or_default();
    }

    let parts: Vec<(Option<String>, std::path::PathBuf)> = req
        .files(UPLOAD_FIELD)
        .await
        .map(|files| {
            files
                .iter()
                .map(|part| (part.name().map(str::to_string), part.path().clone()))
                .collect()
        })
        .unwrap_or_default();
    if parts.is_empty() {
        return Err(UploadError::MissingFilename.into());
    }

    let mut bodies = Vec::with_capacity(parts.len());
    for (name, temp_path) in parts {
        let body = tokio::fs::File::open(&temp_path)
            .await
            .map_err(UploadError::WriteFailed)?;
        bodies.push((name, body));
    }
    let stored = state.vault.upload_batch(&dir, bodies).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(UploadResponse { stored }))
}

/// ## Summary
/// POST /delete/{path} - Removes a file or an empty directory.
#[handler]
async fn delete(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let state = get_state_from_depot(depot)?;
    state.vault.delete(&vault_path_param(req)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// ## Summary
/// POST /mkdir/{path} - Creates a directory and missing parents.
#[handler]
async fn mkdir(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<DirectoryCreatedResponse>> {
    let state = get_state_from_depot(depot)?;
    let created = state.vault.mkdir(&vault_path_param(req)).await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(DirectoryCreatedResponse {
        path: created.relative,
    }))
}

fn vault_route(component: &str) -> Router {
    Router::with_path(format!("{component}/{{**path}}"))
}

#[must_use]
pub fn routes() -> Router {
    Router::new()
        .push(
            vault_route(FILES_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::VAULT_READ))
                .get(crawl),
        )
        .push(
            vault_route(UPLOAD_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::VAULT_WRITE))
                .post(upload),
        )
        .push(
            vault_route(DELETE_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::VAULT_WRITE))
                .post(delete),
        )
        .push(
            vault_route(MKDIR_ROUTE_COMPONENT)
                .hoop(RequireRoles::new(RoleSet::VAULT_WRITE))
                .post(mkdir),
        )
}
