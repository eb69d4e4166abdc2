use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Neighborhood {
    /// Unique short tag, also the primary key and default sort order.
    pub tag: String,
    pub name: String,
}
