use super::models::{Role, Session};
use crate::error::WeaverError;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct AuthDatabase {
    pool: sqlx::PgPool,
}

impl AuthDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_session(
        &self,
        session_id: uuid::Uuid,
        user_id: Option<uuid::Uuid>,
        role: Role,
        expires: DateTime<Utc>,
    ) -> Result<Session, WeaverError> {
        Ok(sqlx::query_as::<_, Session>(
            "INSERT INTO sessions(id, user_id, role, expires) VALUES ($1, $2, $3, $4)
             RETURNING id, user_id, role, expires, created_at, updated_at",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(expires)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn get_live_session(
        &self,
        session_id: uuid::Uuid,
    ) -> Result<Option<Session>, WeaverError> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT id, user_id, role, expires, created_at, updated_at
             FROM sessions WHERE id = $1 AND expires > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn remove_session(&self, session_id: uuid::Uuid) -> Result<(), WeaverError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, WeaverError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
