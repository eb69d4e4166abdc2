use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::UserAction;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, MaybeAuthUser};
use crate::serializers;

use super::{page_bounds, page_count};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAction {
    pub user_id: Uuid,
    pub action_type: String,
    pub points: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAction {
    pub action_type: Option<String>,
    pub points: Option<i32>,
}

/// GET /api/actions - paginated, newest first.
pub async fn list(Query(query): Query<ListQuery>) -> ApiResult<Value> {
    let page_size = config::config().api.page_size;
    let page = query.page.unwrap_or(1).max(1);
    let (limit, offset) = page_bounds(page, page_size);

    let pool = DatabaseManager::pool().await?;
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_actions")
        .fetch_one(&pool)
        .await
        .map_err(DatabaseError::from)?;
    let actions: Vec<UserAction> =
        sqlx::query_as("SELECT * FROM user_actions ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&pool)
            .await
            .map_err(DatabaseError::from)?;

    let results: Vec<_> = actions.iter().map(serializers::action_view).collect();
    Ok(ApiResponse::success(json!({
        "count": count,
        "page": page,
        "pages": page_count(count, page_size),
        "results": results,
    })))
}

/// GET /api/actions/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let action: Option<UserAction> = sqlx::query_as("SELECT * FROM user_actions WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(DatabaseError::from)?;

    let action = action.ok_or_else(|| ApiError::not_found("Action not found"))?;
    Ok(ApiResponse::success(serde_json::to_value(serializers::action_view(&action))?))
}

/// POST /api/actions - record a point-earning event.
pub async fn post(
    Extension(caller): Extension<MaybeAuthUser>,
    Json(payload): Json<CreateAction>,
) -> ApiResult<Value> {
    caller.require()?;

    let pool = DatabaseManager::pool().await?;
    let action: UserAction = sqlx::query_as(
        "INSERT INTO user_actions (id, user_id, action_type, points, created_at) \
         VALUES ($1, $2, $3, $4, COALESCE($5, now())) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(payload.user_id)
    .bind(&payload.action_type)
    .bind(payload.points)
    .bind(payload.created_at)
    .fetch_one(&pool)
    .await
    .map_err(DatabaseError::from)?;

    Ok(ApiResponse::created(serde_json::to_value(serializers::action_view(&action))?))
}

/// PUT/PATCH /api/actions/:id
pub async fn patch(
    Path(id): Path<Uuid>,
    Extension(caller): Extension<MaybeAuthUser>,
    Json(payload): Json<UpdateAction>,
) -> ApiResult<Value> {
    caller.require()?;

    let pool = DatabaseManager::pool().await?;
    let action: Option<UserAction> = sqlx::query_as(
        "UPDATE user_actions SET action_type = COALESCE($2, action_type), \
         points = COALESCE($3, points) WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(payload.action_type)
    .bind(payload.points)
    .fetch_optional(&pool)
    .await
    .map_err(DatabaseError::from)?;

    let action = action.ok_or_else(|| ApiError::not_found("Action not found"))?;
    Ok(ApiResponse::success(serde_json::to_value(serializers::action_view(&action))?))
}

/// DELETE /api/actions/:id
pub async fn delete(
    Path(id): Path<Uuid>,
    Extension(caller): Extension<MaybeAuthUser>,
) -> ApiResult<()> {
    caller.require()?;

    let pool = DatabaseManager::pool().await?;
    let deleted: Option<(Uuid,)> =
        sqlx::query_as("DELETE FROM user_actions WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(DatabaseError::from)?;

    if deleted.is_none() {
        return Err(ApiError::not_found("Action not found"));
    }
    Ok(ApiResponse::<()>::no_content())
}
