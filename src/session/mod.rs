//! Per-caller session state for the page flows.
//!
//! Sessions are keyed by a `crsid` cookie and held in an in-process map.
//! Only three keys exist: the logged-in user binding, the chosen
//! neighborhood, and the last-used auth provider. Entries expire after
//! [`SESSION_TTL`] of inactivity; stale entries are dropped on access and
//! swept on every write so the map stays bounded by the active population.

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "crsid";

/// Idle lifetime of a session, also the cookie Max-Age.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 14);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    pub user_id: Option<Uuid>,
    pub neighborhood: Option<String>,
    pub auth_provider: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionEntry {
    data: SessionData,
    expires_at: Instant,
}

impl SessionEntry {
    fn new(data: SessionData) -> Self {
        Self { data, expires_at: Instant::now() + SESSION_TTL }
    }

    fn is_stale(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    fn instance() -> &'static SessionStore {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<SessionStore> = OnceLock::new();
        INSTANCE.get_or_init(|| SessionStore { sessions: Arc::new(RwLock::new(HashMap::new())) })
    }

    /// Load the session, refreshing its idle timer. Expired sessions are
    /// removed and read as absent.
    pub async fn load(session_id: Uuid) -> Option<SessionData> {
        let mut sessions = Self::instance().sessions.write().await;
        match sessions.get_mut(&session_id) {
            Some(entry) if entry.is_stale() => {
                sessions.remove(&session_id);
                None
            }
            Some(entry) => {
                entry.expires_at = Instant::now() + SESSION_TTL;
                Some(entry.data.clone())
            }
            None => None,
        }
    }

    /// Persist data under an existing session id. Writes also sweep any
    /// entries that have sat idle past the TTL.
    pub async fn save(session_id: Uuid, data: SessionData) {
        let mut sessions = Self::instance().sessions.write().await;
        sessions.retain(|_, entry| !entry.is_stale());
        sessions.insert(session_id, SessionEntry::new(data));
    }

    /// Start a new session and return its id.
    pub async fn create(data: SessionData) -> Uuid {
        let session_id = Uuid::new_v4();
        Self::save(session_id, data).await;
        session_id
    }

    /// Forced logout: the session ceases to exist.
    pub async fn destroy(session_id: Uuid) {
        let mut sessions = Self::instance().sessions.write().await;
        sessions.remove(&session_id);
    }

    /// Pretend the session was last touched `age` ago.
    #[cfg(test)]
    async fn backdate(session_id: Uuid, age: Duration) {
        let mut sessions = Self::instance().sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session_id) {
            entry.expires_at = entry
                .expires_at
                .checked_sub(age)
                .expect("backdate exceeds the representable range");
        }
    }

    #[cfg(test)]
    async fn contains(session_id: Uuid) -> bool {
        let sessions = Self::instance().sessions.read().await;
        sessions.contains_key(&session_id)
    }
}

/// Extract the session id from the request's Cookie header, if any.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    let cookies = headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            Uuid::parse_str(value.trim()).ok()
        } else {
            None
        }
    })
}

/// Set-Cookie value binding the caller to the given session.
pub fn issue_cookie(session_id: Uuid) -> String {
    format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_TTL.as_secs()
    )
}

/// Set-Cookie value that expires the session cookie.
pub fn expire_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
