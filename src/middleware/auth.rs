//! Bearer-token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the token from the Authorization header
//! 2. Resolve it against the service's credential registry
//! 3. Inject the caller identity into the request
//! 4. Reject unknown callers with HTTP 401

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::credential::Credentials};

/// Authentication context attached to authenticated requests.
///
/// Route handlers can extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Identity the token is registered under (e.g. `business-1`)
    pub caller: String,
}

/// Token authentication middleware function.
///
/// # Headers
///
/// Both forms are accepted:
/// ```text
/// Authorization: Bearer abc123xyz
/// Authorization: Basic abc123xyz
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if the token is registered (calls next handler)
/// - `Err(AppError::InvalidCredentials)` otherwise (returns 401)
pub async fn auth_middleware(
    State(credentials): State<Arc<Credentials>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("Basic "))
        .ok_or(AppError::InvalidCredentials)?;

    let caller = credentials
        .identify(token.trim())
        .ok_or_else(|| {
            tracing::warn!(path = %request.uri().path(), "Rejected unknown credential");
            AppError::InvalidCredentials
        })?
        .to_string();

    request.extensions_mut().insert(AuthContext { caller });

    Ok(next.run(request).await)
}
