use chrono::{DateTime, Utc};
use serde::Serialize;

/// Session model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: uuid::Uuid,

    /// Owning user, admin sessions have none
    pub user_id: Option<uuid::Uuid>,
    pub role: String,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Learner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Learner => "learner",
        }
    }

    /// Anything that is not explicitly `admin` is a learner.
    pub fn parse(value: &str) -> Self {
        match value {
            "admin" => Role::Admin,
            _ => Role::Learner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse() {
        assert_eq!(Role::Admin, Role::parse(Role::Admin.as_str()));
        assert_eq!(Role::Learner, Role::parse(Role::Learner.as_str()));
        assert_eq!(Role::Learner, Role::parse("ADMIN"));
    }
}
