use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use courier_core::TenantScope;

use crate::error::AppError;

/// Set by the upstream gateway after it has authenticated the caller.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";
pub const BRANCH_HEADER: &str = "x-branch-id";

fn required_header(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::AuthenticationError(format!("Missing {} header", name)))
}

/// Resolve the caller's tenant and inject it as a request extension.
pub async fn tenant_middleware(mut req: Request, next: Next) -> Result<Response, AppError> {
    let organization_id = required_header(req.headers(), ORGANIZATION_HEADER)?;
    let branch_id = required_header(req.headers(), BRANCH_HEADER)?;

    req.extensions_mut().insert(TenantScope::new(organization_id, branch_id));

    Ok(next.run(req).await)
}
