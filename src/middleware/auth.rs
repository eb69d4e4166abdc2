use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::validate_jwt;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::session::{self, SessionStore};

/// Authenticated caller identity
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Caller identity when present. Reads are open to anonymous callers, so the
/// middleware never rejects; write handlers call [`MaybeAuthUser::require`].
#[derive(Clone, Debug, Default)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl MaybeAuthUser {
    pub fn require(&self) -> Result<&AuthUser, ApiError> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.user_id)
    }
}

/// Resolve the caller from a Bearer JWT or, failing that, the session
/// cookie, and inject `MaybeAuthUser` into the request.
pub async fn resolve_auth_middleware(mut request: Request, next: Next) -> Response {
    let caller = resolve_caller(request.headers()).await;
    request.extensions_mut().insert(MaybeAuthUser(caller));
    next.run(request).await
}

async fn resolve_caller(headers: &HeaderMap) -> Option<AuthUser> {
    if let Some(token) = bearer_token(headers) {
        match validate_jwt(&token) {
            Ok(claims) => {
                return Some(AuthUser { user_id: claims.sub, username: claims.username })
            }
            Err(e) => {
                tracing::debug!("Rejected bearer token: {}", e);
                return None;
            }
        }
    }

    let session_id = session::session_id(headers)?;
    let user_id = SessionStore::load(session_id).await?.user_id?;

    // The session only stores the binding; the identity comes from the row
    match load_user(user_id).await {
        Ok(Some(user)) => Some(AuthUser { user_id: user.id, username: user.username }),
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Could not resolve session user {}: {}", user_id, e);
            None
        }
    }
}

async fn load_user(user_id: Uuid) -> Result<Option<User>, crate::database::manager::DatabaseError> {
    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;
    Ok(user)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_requires_prefix_and_content() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn require_rejects_anonymous() {
        let anon = MaybeAuthUser(None);
        assert_eq!(anon.require().unwrap_err().status_code(), 401);

        let user = MaybeAuthUser(Some(AuthUser {
            user_id: Uuid::new_v4(),
            username: "keisha".to_string(),
        }));
        assert!(user.require().is_ok());
    }
}
