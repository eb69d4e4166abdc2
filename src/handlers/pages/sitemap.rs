use axum::response::Json;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::database::readmodel;
use crate::error::ApiError;
use crate::serializers;

/// GET /sitemap.xml - sitemap render context: the neighborhood listing only.
pub async fn sitemap() -> Result<Json<Value>, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let rollups = readmodel::neighborhood_rollups(&pool).await?;
    Ok(Json(json!({
        "neighborhood_data": serializers::neighborhood_views(&rollups),
    })))
}
