use axum::extract::Extension;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, MaybeAuthUser};

/// GET /api/auth/whoami - report the resolved caller identity.
pub async fn whoami(Extension(caller): Extension<MaybeAuthUser>) -> ApiResult<Value> {
    let data = match &caller.0 {
        Some(user) => json!({
            "authenticated": true,
            "user_id": user.user_id,
            "username": user.username,
        }),
        None => json!({ "authenticated": false }),
    };
    Ok(ApiResponse::success(data))
}

/// POST /api/auth/token - mint a Bearer JWT for a session-authenticated
/// caller, for API clients that cannot carry the cookie.
pub async fn token(Extension(caller): Extension<MaybeAuthUser>) -> ApiResult<Value> {
    let user = caller.require()?;
    let claims = Claims::new(user.user_id, user.username.clone());
    let token = generate_jwt(claims).map_err(|e| {
        tracing::error!("JWT generation failed: {}", e);
        ApiError::internal_server_error("Could not issue token")
    })?;
    Ok(ApiResponse::success(json!({ "token": token })))
}
