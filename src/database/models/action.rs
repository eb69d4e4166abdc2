use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A recorded point-earning event attributed to one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}
