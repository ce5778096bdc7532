use self::{
    db::UserDb,
    models::{NewUser, User},
};
use crate::{
    auth::{self, AuthError},
    error::WeaverError,
};
use tracing::{info, warn};

pub mod db;
pub mod models;

const MAX_USERNAME_LEN: usize = 64;

/// Postgres SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

pub fn validate_new_user(user: &NewUser) -> Result<(), WeaverError> {
    let username = user.username.trim();

    if username.is_empty() || user.password.is_empty() {
        return Err(WeaverError::Validation(
            "username and password are required".to_string(),
        ));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(WeaverError::Validation(format!(
            "username must be at most {MAX_USERNAME_LEN} bytes"
        )));
    }

    if username.chars().any(char::is_whitespace) {
        return Err(WeaverError::Validation(
            "username must not contain whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Register a learner. Only the argon2 hash of the password is stored.
pub async fn signup(db: &UserDb, user: NewUser) -> Result<User, WeaverError> {
    validate_new_user(&user)?;

    let NewUser {
        username,
        password,
        full_name,
        organization,
        phone,
    } = user;
    let username = username.trim();

    if db.get_by_username(username).await?.is_some() {
        return Err(WeaverError::Conflict(format!(
            "username {username} is taken"
        )));
    }

    let hash = auth::hash_password(&password)?;

    let created = db
        .insert_user(
            username,
            &hash,
            non_empty(&full_name),
            non_empty(&organization),
            non_empty(&phone),
        )
        .await
        .map_err(|e| match e {
            WeaverError::Sqlx(ref sql) if is_unique_violation(sql) => {
                WeaverError::Conflict(format!("username {username} is taken"))
            }
            e => e,
        })?;

    info!("Created user {}", created.username);

    Ok(created.into())
}

/// Unknown usernames and wrong passwords fail the same way.
pub async fn login(db: &UserDb, username: &str, password: &str) -> Result<User, WeaverError> {
    let Some(user) = db.get_by_username(username.trim()).await? else {
        warn!("Login attempt for unknown user");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !auth::verify_password(&user.password_hash, password) {
        warn!("Failed login for {}", user.username);
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(user.into())
}

pub async fn remove(db: &UserDb, id: uuid::Uuid) -> Result<(), WeaverError> {
    if db.remove_user(id).await? == 0 {
        return Err(WeaverError::NotFound(format!("user {id}")));
    }
    info!("Removed user {id}");
    Ok(())
}

pub async fn set_permissions(
    db: &UserDb,
    user_id: uuid::Uuid,
    mut course_ids: Vec<uuid::Uuid>,
) -> Result<Vec<uuid::Uuid>, WeaverError> {
    if db.get(user_id).await?.is_none() {
        return Err(WeaverError::NotFound(format!("user {user_id}")));
    }

    course_ids.sort();
    course_ids.dedup();

    db.replace_permissions(user_id, &course_ids).await?;
    db.list_permissions(user_id).await
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: password.to_string(),
            full_name: None,
            organization: None,
            phone: None,
        }
    }

    #[test]
    fn validates_required_fields() {
        assert!(validate_new_user(&new_user("learner", "secret")).is_ok());
        assert!(validate_new_user(&new_user("  learner ", "secret")).is_ok());

        assert!(matches!(
            validate_new_user(&new_user("", "secret")),
            Err(WeaverError::Validation(_))
        ));
        assert!(matches!(
            validate_new_user(&new_user("   ", "secret")),
            Err(WeaverError::Validation(_))
        ));
        assert!(matches!(
            validate_new_user(&new_user("learner", "")),
            Err(WeaverError::Validation(_))
        ));
    }

    #[test]
    fn rejects_bad_usernames() {
        assert!(validate_new_user(&new_user("two words", "secret")).is_err());
        assert!(validate_new_user(&new_user(&"a".repeat(65), "secret")).is_err());
        assert!(validate_new_user(&new_user(&"a".repeat(64), "secret")).is_ok());
    }

    #[test]
    fn blank_optionals_dropped() {
        assert_eq!(None, non_empty(&None));
        assert_eq!(None, non_empty(&Some("  ".to_string())));
        assert_eq!(Some("ACME"), non_empty(&Some(" ACME ".to_string())));
    }

    #[test]
    fn new_user_accepts_camel_case_full_name() {
        let user: NewUser = serde_json::from_str(
            r#"{"username":"learner","password":"secret","fullName":"Ada Lovelace"}"#,
        )
        .unwrap();
        assert_eq!(Some("Ada Lovelace"), user.full_name.as_deref());
    }
}
