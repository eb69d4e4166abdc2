//! Signed single-sign-on handoff for the third-party commenting widget.
//!
//! The widget receives `"<message> <signature> <timestamp>"` where message is
//! the base64 of a JSON identity payload and the signature is HMAC-SHA1 over
//! `"<message> <timestamp>"` keyed with the shared secret.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

use crate::config::SsoConfig;
use crate::database::models::{User, UserProfile};
use crate::error::ApiError;

type HmacSha1 = Hmac<Sha1>;

/// Identity payload for an authenticated, profiled caller.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SsoIdentity {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar_url: String,
}

impl SsoIdentity {
    /// Requires the profile: callers must have already branched on presence.
    pub fn from_user(user: &User, profile: &UserProfile, config: &SsoConfig) -> Self {
        Self {
            id: format!("{}{}", user.id, config.account_uniquifier),
            username: user.username.clone(),
            email: user.email.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// Build the handoff string for the given caller at the current time.
/// Anonymous callers (and profileless ones, after their session has been
/// invalidated upstream) get an empty `{}` payload.
pub fn auth_string(identity: Option<&SsoIdentity>, config: &SsoConfig) -> Result<String, ApiError> {
    auth_string_at(identity, config, Utc::now().timestamp())
}

fn auth_string_at(
    identity: Option<&SsoIdentity>,
    config: &SsoConfig,
    timestamp: i64,
) -> Result<String, ApiError> {
    let payload = match identity {
        Some(identity) => serde_json::to_vec(identity)?,
        None => b"{}".to_vec(),
    };

    let message = BASE64.encode(payload);
    let signature = sign(&message, timestamp, &config.secret_key)?;
    Ok(format!("{message} {signature} {timestamp}"))
}

fn sign(message: &str, timestamp: i64, secret: &str) -> Result<String, ApiError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::internal_server_error("SSO secret key not usable"))?;
    mac.update(format!("{message} {timestamp}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Value;
    use uuid::Uuid;

    fn sso_config() -> SsoConfig {
        SsoConfig {
            secret_key: "test-secret".to_string(),
            account_uniquifier: "-cityrising".to_string(),
        }
    }

    fn verify(message: &str, signature: &str, timestamp: i64, secret: &str) -> bool {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{message} {timestamp}").as_bytes());
        mac.verify_slice(&hex::decode(signature).unwrap()).is_ok()
    }

    #[test]
    fn anonymous_payload_is_empty_object() {
        let auth = auth_string_at(None, &sso_config(), 1_700_000_000).unwrap();
        let parts: Vec<&str> = auth.split(' ').collect();
        assert_eq!(parts.len(), 3);

        let decoded = BASE64.decode(parts[0]).unwrap();
        let payload: Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(payload, serde_json::json!({}));
        assert_eq!(parts[2], "1700000000");
    }

    #[test]
    fn profiled_payload_carries_uniquified_id_and_verifies() {
        let config = sso_config();
        let user = User {
            id: Uuid::new_v4(),
            username: "keisha".to_string(),
            email: "keisha@example.org".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let profile = UserProfile {
            user_id: user.id,
            neighborhood_tag: "fairhill".to_string(),
            avatar_url: "https://img.example.org/keisha.png".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let identity = SsoIdentity::from_user(&user, &profile, &config);
        let auth = auth_string_at(Some(&identity), &config, 1_700_000_000).unwrap();
        let parts: Vec<&str> = auth.split(' ').collect();

        let decoded = BASE64.decode(parts[0]).unwrap();
        let payload: Value = serde_json::from_slice(&decoded).unwrap();
        let fields: Vec<&String> = payload.as_object().unwrap().keys().collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(payload["id"], format!("{}-cityrising", user.id));
        assert_eq!(payload["username"], "keisha");
        assert_eq!(payload["email"], "keisha@example.org");
        assert_eq!(payload["avatar_url"], "https://img.example.org/keisha.png");

        assert!(verify(parts[0], parts[1], 1_700_000_000, "test-secret"));
        assert!(!verify(parts[0], parts[1], 1_700_000_001, "test-secret"));
        assert!(!verify(parts[0], parts[1], 1_700_000_000, "other-secret"));
    }
}
