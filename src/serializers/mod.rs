//! View-model mapping from assembled read models to API/context shapes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::UserAction;
use crate::database::readmodel::{NeighborhoodRollup, UserRecord};

/// Neighborhood with its trailing-window activity aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodView {
    pub tag: String,
    pub name: String,
    pub points: i64,
}

/// Public user view with lifetime score.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: String,
    pub neighborhood: String,
    pub points: i64,
}

/// Expanded view returned only for the caller's own record.
#[derive(Debug, Clone, Serialize)]
pub struct UserSelfView {
    #[serde(flatten)]
    pub user: UserView,
    pub email: String,
    pub actions: Vec<ActionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

fn sum_points(actions: &[UserAction]) -> i64 {
    actions.iter().map(|a| a.points as i64).sum()
}

pub fn neighborhood_view(rollup: &NeighborhoodRollup) -> NeighborhoodView {
    let points = rollup
        .members
        .iter()
        .map(|m| sum_points(&m.recent_actions))
        .sum();
    NeighborhoodView {
        tag: rollup.neighborhood.tag.clone(),
        name: rollup.neighborhood.name.clone(),
        points,
    }
}

pub fn neighborhood_views(rollups: &[NeighborhoodRollup]) -> Vec<NeighborhoodView> {
    rollups.iter().map(neighborhood_view).collect()
}

pub fn user_view(record: &UserRecord) -> UserView {
    UserView {
        id: record.user.id,
        username: record.user.username.clone(),
        avatar_url: record.profile.avatar_url.clone(),
        neighborhood: record.neighborhood.tag.clone(),
        points: sum_points(&record.actions),
    }
}

pub fn user_self_view(record: &UserRecord) -> UserSelfView {
    UserSelfView {
        user: user_view(record),
        email: record.user.email.clone(),
        actions: record.actions.iter().map(action_view).collect(),
    }
}

pub fn action_view(action: &UserAction) -> ActionView {
    ActionView {
        id: action.id,
        user_id: action.user_id,
        action_type: action.action_type.clone(),
        points: action.points,
        created_at: action.created_at,
    }
}
