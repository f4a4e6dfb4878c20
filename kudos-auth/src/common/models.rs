use chrono::{serde::ts_seconds, DateTime, Utc};
use kudos_api::endpoints::auth::Role;
use serde::{Deserialize, Serialize};

/// Session record persisted between runs
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    /// `Cookie` header value for the refresh endpoint.
    #[serde(default)]
    pub refresh_cookie: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(with = "ts_seconds")]
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_cookie: None,
            login: None,
            role: None,
            saved_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_cookie", &self.refresh_cookie.as_ref().map(|_| "[REDACTED]"))
            .field("login", &self.login)
            .field("role", &self.role)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}
