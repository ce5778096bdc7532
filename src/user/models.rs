use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserModel {
    pub id: uuid::Uuid,
    pub username: String,

    /// Argon2 PHC string
    pub password_hash: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user as exposed over the API, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: uuid::Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserModel> for User {
    fn from(value: UserModel) -> Self {
        let UserModel {
            id,
            username,
            full_name,
            organization,
            phone,
            created_at,
            ..
        } = value;

        Self {
            id,
            username,
            full_name,
            organization,
            phone,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,

    #[serde(alias = "fullName")]
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub course_ids: Vec<uuid::Uuid>,
}
