use self::{
    db::AuthDatabase,
    models::{Role, Session},
};
use crate::{
    config::{AdminConfig, SessionConfig},
    error::WeaverError,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHashString, SaltString},
    PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Duration, Utc};
use cookie::{Cookie, SameSite};
use thiserror::Error;
use tracing::debug;

pub mod db;
pub mod models;

/// Name of the cookie holding a learner session
pub const LEARNER_COOKIE: &str = "SID";

/// Name of the cookie holding an admin session
pub const ADMIN_COOKIE: &str = "ASID";

#[derive(Debug)]
pub struct Auth {
    cookie_domain: Option<String>,
    admin_hash: Option<PasswordHashString>,
    sessions: SessionConfig,
    db: AuthDatabase,
}

impl Auth {
    pub fn new(
        db: AuthDatabase,
        cookie_domain: Option<String>,
        admin: Option<AdminConfig>,
        sessions: SessionConfig,
    ) -> Result<Self, WeaverError> {
        sessions.validate()?;

        let admin_hash = admin
            .map(|AdminConfig { pw_hash }| PasswordHashString::new(&pw_hash))
            .transpose()?;

        Ok(Self {
            cookie_domain,
            admin_hash,
            sessions,
            db,
        })
    }

    pub fn admin_enabled(&self) -> bool {
        self.admin_hash.is_some()
    }

    pub fn verify_admin_password(&self, password: &str) -> bool {
        let Some(ref hash) = self.admin_hash else {
            return false;
        };

        argon2::Argon2::default()
            .verify_password(password.as_bytes(), &hash.password_hash())
            .is_ok()
    }

    /// Resolve a session id to a live session. Expired sessions are never
    /// returned.
    pub async fn session(&self, session_id: uuid::Uuid) -> Result<Option<Session>, WeaverError> {
        self.db.get_live_session(session_id).await
    }

    /// Resolve the session cookie of a request for a route requiring `role`.
    /// This is the only place session validity is decided.
    pub async fn resolve(&self, cookie: Option<&str>, role: Role) -> Result<Session, WeaverError> {
        let Some(cookie) = cookie else {
            return Err(AuthError::NoSession.into());
        };

        let Ok(session_id) = uuid::Uuid::parse_str(cookie) else {
            return Err(AuthError::NoSession.into());
        };

        let Some(session) = self.session(session_id).await? else {
            return Err(AuthError::NoSession.into());
        };

        match (role, session.role()) {
            (Role::Admin, Role::Admin) => Ok(session),
            (Role::Admin, Role::Learner) => Err(AuthError::NotAdmin.into()),
            (Role::Learner, _) if session.user_id.is_none() => Err(AuthError::NoSession.into()),
            (Role::Learner, _) => Ok(session),
        }
    }

    pub async fn create_session(
        &self,
        role: Role,
        user_id: Option<uuid::Uuid>,
    ) -> Result<Session, WeaverError> {
        let purged = self.db.purge_expired().await?;
        if purged > 0 {
            debug!("Purged {purged} expired sessions");
        }

        let hours = self.session_hours(role);
        let Some(expires) = session_expiry(Utc::now(), hours) else {
            return Err(WeaverError::Validation(format!(
                "session length of {hours} hours is out of range"
            )));
        };

        let id = uuid::Uuid::new_v4();
        self.db.insert_session(id, user_id, role, expires).await
    }

    pub async fn remove_session(&self, session_id: uuid::Uuid) -> Result<(), WeaverError> {
        self.db.remove_session(session_id).await
    }

    pub fn session_hours(&self, role: Role) -> i64 {
        match role {
            Role::Admin => self.sessions.admin_hours,
            Role::Learner => self.sessions.learner_hours,
        }
    }

    pub fn create_session_cookie(&self, session: &Session) -> Cookie<'static> {
        let role = session.role();
        let (name, path) = match role {
            Role::Admin => (ADMIN_COOKIE, "/admin"),
            Role::Learner => (LEARNER_COOKIE, "/api"),
        };

        let mut cookie = Cookie::new(name, session.id.to_string());
        cookie.set_secure(true);
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        if let Some(ref domain) = self.cookie_domain {
            cookie.set_domain(domain.clone());
        }
        cookie.set_path(path);
        cookie.set_max_age(cookie::time::Duration::hours(self.session_hours(role)));
        cookie
    }

    pub fn removal_cookie(&self, role: Role) -> Cookie<'static> {
        let (name, path) = match role {
            Role::Admin => (ADMIN_COOKIE, "/admin"),
            Role::Learner => (LEARNER_COOKIE, "/api"),
        };

        let mut cookie = Cookie::new(name, "");
        cookie.set_path(path);
        cookie.make_removal();
        cookie
    }
}

/// `None` when the expiry can not be represented.
pub fn session_expiry(now: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    Duration::try_hours(hours).and_then(|hours| now.checked_add_signed(hours))
}

/// Hash a password into a PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, WeaverError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2::Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a password against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(hash) = PasswordHash::new(hash) else {
        return false;
    };

    argon2::Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Session required for requested resource")]
    NoSession,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Admin session required")]
    NotAdmin,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoSession | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotAdmin => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        WeaverError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("hunter2"));
        assert!(verify_password(&hash, "hunter2"));
        assert!(!verify_password(&hash, "hunter3"));
    }

    #[test]
    fn same_password_different_salt() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("hunter2", "hunter2"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn expiry_adds_hours() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let expires = session_expiry(now, 24);
        assert_eq!(Some(Utc.with_ymd_and_hms(2024, 3, 2, 23, 30, 0).unwrap()), expires);
    }

    #[test]
    fn expiry_overflow_is_none() {
        assert_eq!(None, session_expiry(Utc::now(), 9_000_000_000_000_000));
        assert_eq!(None, session_expiry(Utc::now(), i64::MAX));
    }

    #[test]
    fn auth_error_status() {
        assert_eq!(StatusCode::UNAUTHORIZED, AuthError::NoSession.status());
        assert_eq!(StatusCode::UNAUTHORIZED, AuthError::InvalidCredentials.status());
        assert_eq!(StatusCode::FORBIDDEN, AuthError::NotAdmin.status());
    }
}
