use axum::{
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use crate::config::{self, SsoConfig};
use crate::database::manager::DatabaseManager;
use crate::database::models::{User, UserProfile};
use crate::database::readmodel::{self, UserRecord};
use crate::error::ApiError;
use crate::serializers;
use crate::session::{self, SessionStore};
use crate::sso::{self, SsoIdentity};

/// Caller-dependent part of the app-shell context.
struct CallerView {
    current_user_data: Value,
    identity: Option<SsoIdentity>,
    /// Set for the corrupt-account case: a logged-in user with no profile.
    invalidate_session: bool,
}

/// GET / - render context for the single-page app shell.
///
/// A logged-in user whose profile row is missing is treated as corrupt for
/// this flow: the session is destroyed and the anonymous context is served.
/// The client never sees an error for it.
pub async fn app_shell(headers: HeaderMap) -> Result<Response, ApiError> {
    let config = config::config();
    let pool = DatabaseManager::pool().await?;

    let rollups = readmodel::neighborhood_rollups(&pool).await?;
    let neighborhood_data = serializers::neighborhood_views(&rollups);

    let session_id = session::session_id(&headers);
    let session_user = match session_id {
        Some(id) => SessionStore::load(id).await.and_then(|data| data.user_id),
        None => None,
    };

    let lookup = match session_user {
        Some(user_id) => readmodel::user_with_profile(&pool, user_id).await?,
        None => None,
    };
    let record = match &lookup {
        Some((user, Some(_))) => readmodel::user_record(&pool, user.id).await?,
        _ => None,
    };

    let view = caller_view(lookup, record, &config.sso)?;
    if view.invalidate_session {
        if let Some(id) = session_id {
            SessionStore::destroy(id).await;
        }
    }

    let comments_sso_auth = sso::auth_string(view.identity.as_ref(), &config.sso)?;

    let context: Value = json!({
        "ns": "CityRising",
        "neighborhood_data": neighborhood_data,
        "current_user_data": view.current_user_data,
        "twitter_config": config.integrations.twitter_config,
        "comments_sso_auth": comments_sso_auth,
    });

    let mut response = Json(context).into_response();
    if view.invalidate_session {
        if let Ok(value) = session::expire_cookie().parse() {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Decide the current-user view from the pre-fetched rows. Anonymous callers
/// and corrupt accounts (user without a profile) both get the empty object;
/// only the latter additionally forces a logout.
fn caller_view(
    lookup: Option<(User, Option<UserProfile>)>,
    record: Option<UserRecord>,
    sso_config: &SsoConfig,
) -> Result<CallerView, ApiError> {
    match lookup {
        Some((user, Some(profile))) => {
            let identity = Some(SsoIdentity::from_user(&user, &profile, sso_config));
            let current_user_data = match record {
                Some(record) => serde_json::to_value(serializers::user_self_view(&record))?,
                None => json!({}),
            };
            Ok(CallerView { current_user_data, identity, invalidate_session: false })
        }
        Some((user, None)) => {
            tracing::warn!("User {} has no profile; invalidating session", user.id);
            Ok(CallerView {
                current_user_data: json!({}),
                identity: None,
                invalidate_session: true,
            })
        }
        None => Ok(CallerView {
            current_user_data: json!({}),
            identity: None,
            invalidate_session: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Neighborhood, UserAction};
    use chrono::Utc;
    use uuid::Uuid;

    fn sso_config() -> SsoConfig {
        SsoConfig {
            secret_key: "test-secret".to_string(),
            account_uniquifier: "-cityrising".to_string(),
        }
    }

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.org"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn profile(user_id: Uuid) -> UserProfile {
        UserProfile {
            user_id,
            neighborhood_tag: "fairhill".to_string(),
            avatar_url: "https://img.example.org/a.png".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn record(user: User, profile: UserProfile) -> UserRecord {
        UserRecord {
            neighborhood: Neighborhood { tag: "fairhill".into(), name: "Fairhill".into() },
            actions: vec![UserAction {
                id: Uuid::new_v4(),
                user_id: user.id,
                action_type: "checkin".to_string(),
                points: 5,
                created_at: Utc::now(),
            }],
            user,
            profile,
        }
    }

    #[test]
    fn anonymous_caller_gets_empty_view_without_logout() {
        let view = caller_view(None, None, &sso_config()).unwrap();
        assert_eq!(view.current_user_data, json!({}));
        assert!(view.identity.is_none());
        assert!(!view.invalidate_session);
    }

    #[test]
    fn profileless_account_is_degraded_and_logged_out() {
        let keisha = user("keisha");
        let view = caller_view(Some((keisha, None)), None, &sso_config()).unwrap();

        // Exactly the anonymous shape, never an error
        assert_eq!(view.current_user_data, json!({}));
        assert!(view.identity.is_none());
        assert!(view.invalidate_session);
    }

    #[test]
    fn profiled_caller_gets_self_view_and_sso_identity() {
        let keisha = user("keisha");
        let keisha_profile = profile(keisha.id);
        let keisha_record = record(keisha.clone(), keisha_profile.clone());

        let view = caller_view(
            Some((keisha.clone(), Some(keisha_profile))),
            Some(keisha_record),
            &sso_config(),
        )
        .unwrap();

        assert_eq!(view.current_user_data["username"], "keisha");
        assert_eq!(view.current_user_data["points"], 5);
        assert_eq!(view.current_user_data["email"], "keisha@example.org");
        let identity = view.identity.unwrap();
        assert_eq!(identity.id, format!("{}-cityrising", keisha.id));
        assert!(!view.invalidate_session);
    }
}
