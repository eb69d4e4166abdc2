use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::database::readmodel;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, MaybeAuthUser};
use crate::serializers;

use super::{page_bounds, page_count, parse_list_query};

#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// GET /api/users - paginated listing of profiled users, filterable by one
/// or more `neighborhood` tags.
pub async fn list(Query(pairs): Query<Vec<(String, String)>>) -> ApiResult<Value> {
    let page_size = config::config().api.page_size;
    let (page, neighborhoods) = parse_list_query(&pairs);
    let (limit, offset) = page_bounds(page, page_size);

    let pool = DatabaseManager::pool().await?;
    let (count, records) =
        readmodel::user_records_page(&pool, &neighborhoods, limit, offset).await?;

    let results: Vec<_> = records.iter().map(serializers::user_view).collect();
    Ok(ApiResponse::success(json!({
        "count": count,
        "page": page.max(1),
        "pages": page_count(count, page_size),
        "results": results,
    })))
}

/// GET /api/users/:id - public view, or the expanded self view when the
/// caller asks for their own record.
pub async fn get(
    Path(id): Path<Uuid>,
    Extension(caller): Extension<MaybeAuthUser>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let record = readmodel::user_record(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Identity comparison is the only thing that switches the shape
    let data = if caller.user_id() == Some(id) {
        serde_json::to_value(serializers::user_self_view(&record))?
    } else {
        serde_json::to_value(serializers::user_view(&record))?
    };
    Ok(ApiResponse::success(data))
}

/// POST /api/users - create an account. The new user has no profile yet and
/// stays out of the listing until one exists.
pub async fn post(
    Extension(caller): Extension<MaybeAuthUser>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<User> {
    caller.require()?;

    let username = payload
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("username is required"))?;
    let email = payload
        .email
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let pool = DatabaseManager::pool().await?;
    let user: User = sqlx::query_as(
        "INSERT INTO users (id, username, email, created_at, updated_at) \
         VALUES ($1, $2, $3, now(), now()) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(&email)
    .fetch_one(&pool)
    .await
    .map_err(crate::database::manager::DatabaseError::from)?;

    Ok(ApiResponse::created(user))
}

/// PUT/PATCH /api/users/:id - update account fields.
pub async fn patch(
    Path(id): Path<Uuid>,
    Extension(caller): Extension<MaybeAuthUser>,
    Json(payload): Json<UserPayload>,
) -> ApiResult<User> {
    caller.require()?;

    let pool = DatabaseManager::pool().await?;
    let user: Option<User> = sqlx::query_as(
        "UPDATE users SET username = COALESCE($2, username), \
         email = COALESCE($3, email), updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(payload.username)
    .bind(payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(crate::database::manager::DatabaseError::from)?;

    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(caller): Extension<MaybeAuthUser>,
) -> ApiResult<()> {
    caller.require()?;

    let pool = DatabaseManager::pool().await?;
    let deleted: Option<(Uuid,)> = sqlx::query_as("DELETE FROM users WHERE id = $1 RETURNING id")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(crate::database::manager::DatabaseError::from)?;

    if deleted.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(ApiResponse::<()>::no_content())
}
