use super::models::UserModel;
use crate::error::WeaverError;
use sqlx::PgPool;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct UserDb {
    pool: sqlx::PgPool,
}

impl UserDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<Option<UserModel>, WeaverError> {
        sqlx::query_as::<_, UserModel>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(WeaverError::from)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<UserModel>, WeaverError> {
        sqlx::query_as::<_, UserModel>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(WeaverError::from)
    }

    pub async fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        full_name: Option<&str>,
        organization: Option<&str>,
        phone: Option<&str>,
    ) -> Result<UserModel, WeaverError> {
        sqlx::query_as::<_, UserModel>(
            "INSERT INTO users(username, password_hash, full_name, organization, phone)
             VALUES($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .bind(organization)
        .bind(phone)
        .fetch_one(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    /// Newest first. `search` matches username or full name, case-insensitive.
    pub async fn list_users(&self, search: Option<&str>) -> Result<Vec<UserModel>, WeaverError> {
        sqlx::query_as::<_, UserModel>(
            "SELECT * FROM users
             WHERE $1::TEXT IS NULL
             OR username ILIKE '%' || $1 || '%'
             OR full_name ILIKE '%' || $1 || '%'
             ORDER BY created_at DESC",
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    pub async fn remove_user(&self, id: uuid::Uuid) -> Result<u64, WeaverError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, WeaverError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(id) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_permissions(&self, user_id: uuid::Uuid) -> Result<Vec<uuid::Uuid>, WeaverError> {
        Ok(sqlx::query_as::<_, (uuid::Uuid,)>(
            "SELECT course_id FROM course_permissions WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(id,)| id)
        .collect())
    }

    pub async fn has_permission(
        &self,
        user_id: uuid::Uuid,
        course_id: uuid::Uuid,
    ) -> Result<bool, WeaverError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(id) FROM course_permissions WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Replace every grant of the user with `course_ids`.
    pub async fn replace_permissions(
        &self,
        user_id: uuid::Uuid,
        course_ids: &[uuid::Uuid],
    ) -> Result<(), WeaverError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM course_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            "INSERT INTO course_permissions(user_id, course_id)
             SELECT $1, course.id FROM courses course WHERE course.id = ANY($2)",
        )
        .bind(user_id)
        .bind(course_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            "Granted {} courses to user {user_id}",
            inserted.rows_affected()
        );

        Ok(())
    }
}
