use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::readmodel;
use crate::error::ApiError;
use crate::session::{self, SessionData, SessionStore};

#[derive(Debug, Deserialize)]
pub struct ChooseQuery {
    pub auth_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChooseForm {
    pub neighborhood: String,
    pub auth_provider: String,
}

/// Outcome of a valid submission: where to continue, and the cookie to set
/// when the caller had no live session yet.
struct ChoiceApplied {
    location: String,
    new_session: Option<Uuid>,
}

/// GET /choose-neighborhood - form display context. The provider hint comes
/// from the query string, falling back to the one stored in the session.
pub async fn show(
    Query(query): Query<ChooseQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;
    let neighborhoods = readmodel::neighborhoods(&pool).await?;

    let session_provider = match session::session_id(&headers) {
        Some(id) => SessionStore::load(id).await.and_then(|data| data.auth_provider),
        None => None,
    };
    let auth_provider = query.auth_provider.or(session_provider);

    Ok(Json(json!({
        "neighborhoods": neighborhoods,
        "auth_provider": auth_provider,
    }))
    .into_response())
}

/// POST /choose-neighborhood - store the choice in the session and redirect
/// to the auth provider's continuation endpoint. Invalid submissions leave
/// the session untouched.
pub async fn submit(headers: HeaderMap, Form(form): Form<ChooseForm>) -> Result<Response, ApiError> {
    let config = config::config();
    let pool = DatabaseManager::pool().await?;

    let neighborhoods = readmodel::neighborhoods(&pool).await?;
    let known_tags: Vec<&str> = neighborhoods.iter().map(|n| n.tag.as_str()).collect();

    if let Err(field_errors) = validate(&form, &known_tags, &config.integrations.auth_providers) {
        return Err(ApiError::unprocessable_entity("Invalid form submission", field_errors));
    }

    let applied = apply_choice(session::session_id(&headers), &form).await;

    let mut response =
        (StatusCode::SEE_OTHER, [(header::LOCATION, applied.location)]).into_response();
    if let Some(session_id) = applied.new_session {
        if let Ok(value) = session::issue_cookie(session_id).parse() {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Write the validated choice into session state. A cookie naming a session
/// the store doesn't know is ignored and replaced with a freshly-minted id,
/// so a caller can never choose its own session key.
async fn apply_choice(existing: Option<Uuid>, form: &ChooseForm) -> ChoiceApplied {
    let live = match existing {
        Some(id) => SessionStore::load(id).await.map(|data| (id, data)),
        None => None,
    };

    let (session_id, mut data, new_session) = match live {
        Some((id, data)) => (id, data, None),
        None => {
            let id = Uuid::new_v4();
            (id, SessionData::default(), Some(id))
        }
    };
    data.neighborhood = Some(form.neighborhood.clone());
    data.auth_provider = Some(form.auth_provider.clone());
    SessionStore::save(session_id, data).await;

    ChoiceApplied { location: format!("/complete/{}", form.auth_provider), new_session }
}

fn validate(
    form: &ChooseForm,
    known_tags: &[&str],
    providers: &[String],
) -> Result<(), HashMap<String, String>> {
    let mut errors = HashMap::new();
    if !known_tags.contains(&form.neighborhood.as_str()) {
        errors.insert("neighborhood".to_string(), "Unknown neighborhood".to_string());
    }
    if !providers.iter().any(|p| p == &form.auth_provider) {
        errors.insert("auth_provider".to_string(), "Unsupported auth provider".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
