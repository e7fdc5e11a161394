use axum::http::{header, HeaderMap};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use callassist_types::{new_session_id, SessionId, SessionState};

/// Cookie carrying the browser's session token
pub const SESSION_COOKIE: &str = "callassist_session";

/// A session loaded for the duration of one request
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub id: SessionId,
    pub state: SessionState,
    /// True when a fresh token was issued and must be sent to the browser
    pub is_new: bool,
}

/// In-memory session store keyed by browser token
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the session for `token`, or start a fresh one when the token is
    /// missing, unknown, or `force_reset` is set
    pub async fn load_or_init(&self, token: Option<&str>, force_reset: bool) -> SessionContext {
        let mut sessions = self.sessions.write().await;

        if let Some(token) = token {
            if force_reset {
                sessions.remove(token);
            } else if let Some(state) = sessions.get_mut(token) {
                state.touch();
                return SessionContext {
                    id: token.to_string(),
                    state: state.clone(),
                    is_new: false,
                };
            }
        }

        let id = new_session_id();
        let state = SessionState::default();
        sessions.insert(id.clone(), state.clone());
        tracing::debug!(session = %id, force_reset, "Started new session");

        SessionContext { id, state, is_new: true }
    }

    /// Write a request's session back
    pub async fn save(&self, context: &SessionContext) {
        let mut state = context.state.clone();
        state.touch();
        self.sessions.write().await.insert(context.id.clone(), state);
    }

    /// Empty the conversation history of `token`'s session
    pub async fn clear_history(&self, token: Option<&str>) -> SessionContext {
        let mut context = self.load_or_init(token, false).await;
        context.state.clear_history();
        self.save(&context).await;
        context
    }

    pub async fn get(&self, id: &str) -> Option<SessionState> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Drop sessions idle for longer than `ttl`, returning how many went
    pub async fn purge_idle(&self, ttl: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, state| state.last_activity >= cutoff);
        before - sessions.len()
    }
}

/// Periodically purge idle sessions
pub fn spawn_purge_task(store: Arc<SessionStore>, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).clamp(Duration::from_secs(60), Duration::from_secs(60 * 60));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let purged = store.purge_idle(ttl).await;
            if purged > 0 {
                tracing::info!(purged, "Purged idle sessions");
            }
        }
    })
}

/// Read the session token from the request's cookies
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value binding the browser to `id`
pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}
