//! Session cache and the guard every protected command runs through.
//!
//! Login stores `{key, user_code, role, full_name}` in `session.json`. The
//! guard trusts a complete cached identity; an incomplete cache falls back to
//! an `auth/check` round trip with the stored key. Any check failure, business
//! or transport, clears the cached artifacts, so the next command starts from
//! a clean "not logged in" state.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{ApiClient, ApiError, MSG_SERVER_UNREACHABLE};
use crate::models::{AuthCheckData, LoginData, LoginPayload};

/// System-wide role attached to every account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProjectManager,
    Member,
}

/// Human-readable role label.
pub fn format_role(role: Role) -> &'static str {
    match role {
        Role::Admin => "Administrator",
        Role::ProjectManager => "Project Manager",
        Role::Member => "Member",
    }
}

/// What `session.json` holds. `user_code` and `role` may be absent when only
/// the key survived; the guard then revalidates against the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A fully resolved identity: what protected commands actually work with.
#[derive(Debug, Clone)]
pub struct Identity {
    pub key: String,
    pub user_code: String,
    pub role: Role,
    pub full_name: Option<String>,
}

impl Identity {
    fn to_session(&self) -> Session {
        Session {
            key: self.key.clone(),
            user_code: Some(self.user_code.clone()),
            role: Some(self.role),
            full_name: self.full_name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,

    /// The server refused the credentials or the session key.
    #[error("{message}")]
    Rejected { message: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to persist session: {0}")]
    Store(#[from] std::io::Error),
}

impl SessionError {
    /// Message suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::NotLoggedIn => {
                "Not logged in. Run `pmt login` first.".to_string()
            }
            SessionError::Rejected { message } => message.clone(),
            SessionError::Api(_) => MSG_SERVER_UNREACHABLE.to_string(),
            SessionError::Store(e) => format!("Failed to persist session: {e}"),
        }
    }
}

/// File-backed store for the cached session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: &Path) -> Self {
        SessionStore {
            path: dir.join("session.json"),
        }
    }

    /// Load the cached session, tolerating a missing or malformed file.
    pub fn load(&self) -> Option<Session> {
        if !self.path.exists() {
            return None;
        }
        let mut buf = String::new();
        match File::open(&self.path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(sess) => Some(sess),
                Err(e) => {
                    log::warn!("ignoring malformed session {}: {e}", self.path.display());
                    None
                }
            },
            Err(e) => {
                log::warn!("ignoring unreadable session {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Save the session using atomic write (temp file + rename).
    pub fn save(&self, session: &Session) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(session).expect("session serializes");
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }

    /// Remove the cached session. Missing file is fine.
    pub fn clear(&self) -> std::io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Authenticate against the server and cache the resulting identity.
pub fn login(
    client: &ApiClient,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> Result<Identity, SessionError> {
    let payload = LoginPayload {
        email: email.to_string(),
        password: password.to_string(),
    };
    let env = client.post::<LoginData, _>("auth/login", &payload)?;
    if !env.status {
        return Err(rejected(env.message, "Giriş başarısız."));
    }
    let key = match env.data {
        Some(data) if !data.key.is_empty() => data.key,
        _ => return Err(rejected(env.message, "Giriş başarısız.")),
    };
    let identity = check_key(client, &key)?;
    store.save(&identity.to_session())?;
    log::info!("logged in as {}", identity.user_code);
    Ok(identity)
}

/// Forget the cached session. Purely local, like the original logout.
pub fn logout(store: &SessionStore) -> std::io::Result<()> {
    store.clear()
}

/// Resolve the current identity before running a protected command.
///
/// A complete cached identity is trusted as-is. A key-only cache is
/// revalidated with `auth/check`; on any failure the cache is cleared and the
/// caller is effectively logged out.
pub fn resolve(client: &ApiClient, store: &SessionStore) -> Result<Identity, SessionError> {
    let Some(session) = store.load() else {
        return Err(SessionError::NotLoggedIn);
    };
    if let (Some(user_code), Some(role)) = (session.user_code.clone(), session.role) {
        return Ok(Identity {
            key: session.key,
            user_code,
            role,
            full_name: session.full_name,
        });
    }
    match check_key(client, &session.key) {
        Ok(identity) => {
            if let Err(e) = store.save(&identity.to_session()) {
                log::warn!("could not refresh session cache: {e}");
            }
            Ok(identity)
        }
        Err(e) => {
            if let Err(clear_err) = store.clear() {
                log::warn!("could not clear session cache: {clear_err}");
            }
            Err(e)
        }
    }
}

fn check_key(client: &ApiClient, key: &str) -> Result<Identity, SessionError> {
    let env = client.auth_get::<AuthCheckData>("auth/check", key, &[])?;
    let data = if env.status { env.data } else { None };
    match data.and_then(|d| d.auth.filter(|code| !code.is_empty()).map(|code| (code, d.role, d.full_name))) {
        Some((user_code, role, full_name)) => {
            let role = role.unwrap_or_else(|| {
                log::warn!("auth/check returned no role; assuming member");
                Role::Member
            });
            Ok(Identity {
                key: key.to_string(),
                user_code,
                role,
                full_name,
            })
        }
        None => Err(rejected(env.message, "Oturum doğrulanamadı.")),
    }
}

fn rejected(message: String, fallback: &str) -> SessionError {
    let message = if message.is_empty() {
        fallback.to_string()
    } else {
        message
    };
    SessionError::Rejected { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> ApiClient {
        // Port 1 refuses connections immediately; nothing listens there.
        ApiClient::new("http://127.0.0.1:1").unwrap()
    }

    #[test]
    fn test_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.load().is_none());

        let sess = Session {
            key: "k1".to_string(),
            user_code: Some("u1".to_string()),
            role: Some(Role::Admin),
            full_name: Some("Ada L.".to_string()),
        };
        store.save(&sess).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.key, "k1");
        assert_eq!(loaded.role, Some(Role::Admin));

        store.clear().unwrap();
        assert!(store.load().is_none());
        // Clearing twice must not error.
        store.clear().unwrap();
    }

    #[test]
    fn test_resolve_trusts_complete_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store
            .save(&Session {
                key: "k2".to_string(),
                user_code: Some("u2".to_string()),
                role: Some(Role::ProjectManager),
                full_name: None,
            })
            .unwrap();

        // No request goes out for a complete cache, so the dead client is fine.
        let identity = resolve(&unreachable_client(), &store).unwrap();
        assert_eq!(identity.user_code, "u2");
        assert_eq!(identity.role, Role::ProjectManager);
    }

    #[test]
    fn test_resolve_without_cache_is_not_logged_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let err = resolve(&unreachable_client(), &store).unwrap_err();
        assert!(matches!(err, SessionError::NotLoggedIn));
    }

    #[test]
    fn test_failed_check_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        // Key-only cache forces the round trip, which cannot succeed here.
        store
            .save(&Session {
                key: "stale".to_string(),
                user_code: None,
                role: None,
                full_name: None,
            })
            .unwrap();

        let err = resolve(&unreachable_client(), &store).unwrap_err();
        assert!(matches!(err, SessionError::Api(_)));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_role_wire_values() {
        let role: Role = serde_json::from_str("\"project_manager\"").unwrap();
        assert_eq!(role, Role::ProjectManager);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }
}
