use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::error::{ComposerError, Result};
use crate::runtime::Principal;
use crate::viewsheet::is_valid_name;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";

/// An authenticated editor
#[derive(Debug, Clone)]
pub struct Session {
    /// Who the session acts for
    pub principal: Principal,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// Login request body
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionRequest {
    pub username: String,
}

/// Active sessions keyed by session id
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Create a new session
    ///
    /// # Arguments
    /// * `username` - The user to create a session for
    ///
    /// # Returns
    /// * `Result<String>` - A unique session id
    pub fn create_session(&self, username: &str) -> Result<String> {
        if !is_valid_name(username) {
            return Err(ComposerError::validation(format!(
                "invalid user name: {}",
                username
            )));
        }

        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            principal: Principal::new(username),
            expires_at: SystemTime::now() + self.ttl,
        };

        let purged = self.purge_expired()?;
        if purged > 0 {
            debug!("purged {} expired sessions", purged);
        }
        self.sessions.write()?.insert(session_id.clone(), session);
        info!("session opened for {}", username);
        Ok(session_id)
    }

    /// Validate a session
    ///
    /// # Arguments
    /// * `session_id` - The session id to validate
    ///
    /// # Returns
    /// * `Result<Principal>` - The principal of the session, `Unauthorized`
    ///   when it is unknown or expired
    pub fn validate_session(&self, session_id: &str) -> Result<Principal> {
        let mut sessions = self.sessions.write()?;

        match sessions.get(session_id) {
            Some(session) if session.expires_at > SystemTime::now() => {
                Ok(session.principal.clone())
            }
            Some(_) => {
                sessions.remove(session_id);
                Err(ComposerError::Unauthorized("session expired".to_string()))
            }
            None => Err(ComposerError::Unauthorized("no session".to_string())),
        }
    }

    /// Number of sessions currently held, expired ones included
    pub fn active_count(&self) -> Result<usize> {
        Ok(self.sessions.read()?.len())
    }

    pub fn remove_session(&self, session_id: &str) -> Result<()> {
        if let Some(session) = self.sessions.write()?.remove(session_id) {
            debug!("session closed for {}", session.principal.name);
        }
        Ok(())
    }

    /// Drop expired sessions, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write()?;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_resolve_to_their_principal() {
        let store = SessionStore::new(60);
        let id = store.create_session("alice").unwrap();

        assert_eq!(store.validate_session(&id).unwrap(), Principal::new("alice"));
        store.remove_session(&id).unwrap();
        assert!(matches!(
            store.validate_session(&id),
            Err(ComposerError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let store = SessionStore::new(0);
        let id = store.create_session("alice").unwrap();
        std::thread::sleep(Duration::from_millis(1));

        assert!(store.validate_session(&id).is_err());
        assert_eq!(store.active_count().unwrap(), 0);
        assert_eq!(store.purge_expired().unwrap(), 0);
    }

    #[test]
    fn new_logins_drop_expired_sessions() {
        let store = SessionStore::new(0);
        for _ in 0..5 {
            store.create_session("alice").unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(store.active_count().unwrap(), 1);

        let live = SessionStore::new(60);
        live.create_session("alice").unwrap();
        live.create_session("bob").unwrap();
        assert_eq!(live.active_count().unwrap(), 2);
    }

    #[test]
    fn user_names_are_checked() {
        let store = SessionStore::new(60);
        assert!(store.create_session("../etc").is_err());
    }
}
