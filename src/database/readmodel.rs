//! Batch read models for the app shell, sitemap, and users API.
//!
//! Both listing reads fetch each association level in one query and join the
//! rows in memory, so a request costs a fixed number of round trips no
//! matter how many rows exist.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Neighborhood, User, UserAction, UserProfile};

/// Trailing window for neighborhood activity aggregates.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// One neighborhood member with activity restricted to the trailing window.
#[derive(Debug, Clone)]
pub struct MemberActivity {
    pub user: User,
    pub profile: UserProfile,
    pub recent_actions: Vec<UserAction>,
}

/// A neighborhood with all of its members and their windowed activity.
#[derive(Debug, Clone)]
pub struct NeighborhoodRollup {
    pub neighborhood: Neighborhood,
    pub members: Vec<MemberActivity>,
}

/// A profiled user with neighborhood and lifetime action history.
/// Users without a profile never appear in this model.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub profile: UserProfile,
    pub neighborhood: Neighborhood,
    pub actions: Vec<UserAction>,
}

/// All neighborhoods ordered by tag, each with profiles, users, and actions
/// from the last [`RECENT_WINDOW_DAYS`] days. Members with no in-window
/// actions are kept with an empty action set so score displays can show zero.
pub async fn neighborhood_rollups(pool: &PgPool) -> Result<Vec<NeighborhoodRollup>, DatabaseError> {
    let neighborhoods: Vec<Neighborhood> =
        sqlx::query_as("SELECT * FROM neighborhoods ORDER BY tag")
            .fetch_all(pool)
            .await?;

    let profiles: Vec<UserProfile> = sqlx::query_as("SELECT * FROM user_profiles")
        .fetch_all(pool)
        .await?;

    let user_ids: Vec<Uuid> = profiles.iter().map(|p| p.user_id).collect();
    let users: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
        .bind(&user_ids)
        .fetch_all(pool)
        .await?;

    let cutoff = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let actions: Vec<UserAction> =
        sqlx::query_as("SELECT * FROM user_actions WHERE user_id = ANY($1) AND created_at >= $2")
            .bind(&user_ids)
            .bind(cutoff)
            .fetch_all(pool)
            .await?;

    Ok(assemble_rollups(neighborhoods, profiles, users, actions))
}

/// A page of profiled users with neighborhood and lifetime actions, plus the
/// unpaged total. `neighborhood_tags`, when non-empty, restricts the listing
/// to users whose profile belongs to one of the given neighborhoods.
pub async fn user_records_page(
    pool: &PgPool,
    neighborhood_tags: &[String],
    limit: i64,
    offset: i64,
) -> Result<(i64, Vec<UserRecord>), DatabaseError> {
    // INNER JOIN drops users that have no profile row
    let (count_sql, page_sql) = if neighborhood_tags.is_empty() {
        (
            "SELECT COUNT(*) FROM users u JOIN user_profiles p ON p.user_id = u.id".to_string(),
            "SELECT u.* FROM users u JOIN user_profiles p ON p.user_id = u.id \
             ORDER BY u.username LIMIT $1 OFFSET $2"
                .to_string(),
        )
    } else {
        (
            "SELECT COUNT(*) FROM users u JOIN user_profiles p ON p.user_id = u.id \
             WHERE p.neighborhood_tag = ANY($1)"
                .to_string(),
            "SELECT u.* FROM users u JOIN user_profiles p ON p.user_id = u.id \
             WHERE p.neighborhood_tag = ANY($3) ORDER BY u.username LIMIT $1 OFFSET $2"
                .to_string(),
        )
    };

    let count: i64 = if neighborhood_tags.is_empty() {
        sqlx::query_scalar(&count_sql).fetch_one(pool).await?
    } else {
        sqlx::query_scalar(&count_sql)
            .bind(neighborhood_tags)
            .fetch_one(pool)
            .await?
    };

    let users: Vec<User> = if neighborhood_tags.is_empty() {
        sqlx::query_as(&page_sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as(&page_sql)
            .bind(limit)
            .bind(offset)
            .bind(neighborhood_tags)
            .fetch_all(pool)
            .await?
    };

    let records = load_records_for(pool, users).await?;
    Ok((count, records))
}

/// Fully-assembled record for a single user, or None when the user does not
/// exist or has no profile (profileless users are invisible to this model).
pub async fn user_record(pool: &PgPool, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(user) = user else { return Ok(None) };
    let mut records = load_records_for(pool, vec![user]).await?;
    Ok(records.pop())
}

/// The user row plus its optional profile, for flows that must distinguish
/// "no such user" from "user without a profile" (corrupt-account handling).
pub async fn user_with_profile(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<(User, Option<UserProfile>)>, DatabaseError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    let Some(user) = user else { return Ok(None) };

    let profile: Option<UserProfile> =
        sqlx::query_as("SELECT * FROM user_profiles WHERE user_id = $1")
            .bind(user.id)
            .fetch_optional(pool)
            .await?;

    Ok(Some((user, profile)))
}

/// All neighborhoods ordered by tag, without rollups (form display).
pub async fn neighborhoods(pool: &PgPool) -> Result<Vec<Neighborhood>, DatabaseError> {
    let rows = sqlx::query_as("SELECT * FROM neighborhoods ORDER BY tag")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Batch-fetch profiles, neighborhoods, and lifetime actions for the given
/// users and assemble them. Users lacking a profile are dropped.
async fn load_records_for(
    pool: &PgPool,
    users: Vec<User>,
) -> Result<Vec<UserRecord>, DatabaseError> {
    if users.is_empty() {
        return Ok(vec![]);
    }

    let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let profiles: Vec<UserProfile> =
        sqlx::query_as("SELECT * FROM user_profiles WHERE user_id = ANY($1)")
            .bind(&user_ids)
            .fetch_all(pool)
            .await?;

    let tags: Vec<String> = profiles.iter().map(|p| p.neighborhood_tag.clone()).collect();
    let neighborhoods: Vec<Neighborhood> =
        sqlx::query_as("SELECT * FROM neighborhoods WHERE tag = ANY($1)")
            .bind(&tags)
            .fetch_all(pool)
            .await?;

    let actions: Vec<UserAction> =
        sqlx::query_as("SELECT * FROM user_actions WHERE user_id = ANY($1) ORDER BY created_at")
            .bind(&user_ids)
            .fetch_all(pool)
            .await?;

    Ok(assemble_user_records(users, profiles, neighborhoods, actions))
}

fn assemble_rollups(
    neighborhoods: Vec<Neighborhood>,
    profiles: Vec<UserProfile>,
    users: Vec<User>,
    actions: Vec<UserAction>,
) -> Vec<NeighborhoodRollup> {
    let users_by_id: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();

    let mut actions_by_user: HashMap<Uuid, Vec<UserAction>> = HashMap::new();
    for action in actions {
        actions_by_user.entry(action.user_id).or_default().push(action);
    }

    let mut profiles_by_tag: HashMap<String, Vec<UserProfile>> = HashMap::new();
    for profile in profiles {
        profiles_by_tag
            .entry(profile.neighborhood_tag.clone())
            .or_default()
            .push(profile);
    }

    neighborhoods
        .into_iter()
        .map(|neighborhood| {
            let members = profiles_by_tag
                .remove(&neighborhood.tag)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|profile| {
                    let user = users_by_id.get(&profile.user_id)?.clone();
                    let recent_actions =
                        actions_by_user.remove(&profile.user_id).unwrap_or_default();
                    Some(MemberActivity { user, profile, recent_actions })
                })
                .collect();
            NeighborhoodRollup { neighborhood, members }
        })
        .collect()
}

fn assemble_user_records(
    users: Vec<User>,
    profiles: Vec<UserProfile>,
    neighborhoods: Vec<Neighborhood>,
    actions: Vec<UserAction>,
) -> Vec<UserRecord> {
    let mut profiles_by_user: HashMap<Uuid, UserProfile> =
        profiles.into_iter().map(|p| (p.user_id, p)).collect();
    let neighborhoods_by_tag: HashMap<String, Neighborhood> =
        neighborhoods.into_iter().map(|n| (n.tag.clone(), n)).collect();

    let mut actions_by_user: HashMap<Uuid, Vec<UserAction>> = HashMap::new();
    for action in actions {
        actions_by_user.entry(action.user_id).or_default().push(action);
    }

    users
        .into_iter()
        .filter_map(|user| {
            let profile = profiles_by_user.remove(&user.id)?;
            let neighborhood = neighborhoods_by_tag.get(&profile.neighborhood_tag)?.clone();
            let actions = actions_by_user.remove(&user.id).unwrap_or_default();
            Some(UserRecord { user, profile, neighborhood, actions })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.org"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn profile(user_id: Uuid, tag: &str) -> UserProfile {
        UserProfile {
            user_id,
            neighborhood_tag: tag.to_string(),
            avatar_url: "https://img.example.org/a.png".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn action(user_id: Uuid, points: i32) -> UserAction {
        UserAction {
            id: Uuid::new_v4(),
            user_id,
            action_type: "checkin".to_string(),
            points,
            created_at: Utc::now(),
        }
    }

    fn neighborhood(tag: &str) -> Neighborhood {
        Neighborhood { tag: tag.to_string(), name: format!("{tag} proper") }
    }

    #[test]
    fn rollups_keep_every_neighborhood_and_zero_action_members() {
        let alice = user("alice");
        let bob = user("bob");
        let hoods = vec![neighborhood("fairhill"), neighborhood("germantown")];
        let profiles = vec![profile(alice.id, "fairhill"), profile(bob.id, "fairhill")];
        let actions = vec![action(alice.id, 5)];

        let rollups = assemble_rollups(hoods, profiles, vec![alice.clone(), bob.clone()], actions);

        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].neighborhood.tag, "fairhill");
        assert_eq!(rollups[0].members.len(), 2);
        // Bob stays listed even with nothing in the window
        let bob_member = rollups[0].members.iter().find(|m| m.user.id == bob.id).unwrap();
        assert!(bob_member.recent_actions.is_empty());
        // Germantown has no members but is still present
        assert!(rollups[1].members.is_empty());
    }

    #[test]
    fn user_records_drop_profileless_users_keep_actionless_ones() {
        let a = user("a");
        let b = user("b");
        let c = user("c");
        let hoods = vec![neighborhood("fairhill")];
        // b has no profile; c has a profile but no actions
        let profiles = vec![profile(a.id, "fairhill"), profile(c.id, "fairhill")];
        let actions = vec![action(a.id, 1), action(a.id, 2), action(b.id, 9)];

        let records =
            assemble_user_records(vec![a.clone(), b.clone(), c.clone()], profiles, hoods, actions);

        let ids: Vec<Uuid> = records.iter().map(|r| r.user.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert_eq!(records[0].actions.len(), 2);
        assert!(records[1].actions.is_empty());
    }
}
