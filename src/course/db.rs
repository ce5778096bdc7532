use super::models::Course;
use crate::error::WeaverError;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct CourseDb {
    pool: sqlx::PgPool,
}

impl CourseDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: uuid::Uuid) -> Result<Option<Course>, WeaverError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(WeaverError::from)
    }

    /// Newest first. `search` matches the course name, case-insensitive.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Course>, WeaverError> {
        sqlx::query_as::<_, Course>(
            "SELECT * FROM courses
             WHERE $1::TEXT IS NULL OR name ILIKE '%' || $1 || '%'
             ORDER BY created_at DESC",
        )
        .bind(search)
        .fetch_all(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    /// Courses granted to a user, newest first.
    pub async fn list_for_user(&self, user_id: uuid::Uuid) -> Result<Vec<Course>, WeaverError> {
        sqlx::query_as::<_, Course>(
            "SELECT c.* FROM courses c
             INNER JOIN course_permissions cp
             ON c.id = cp.course_id AND cp.user_id = $1
             ORDER BY c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    pub async fn insert(
        &self,
        name: &str,
        description: Option<&str>,
        cover_image: Option<&str>,
    ) -> Result<Course, WeaverError> {
        sqlx::query_as::<_, Course>(
            "INSERT INTO courses(name, description, cover_image) VALUES($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(description)
        .bind(cover_image)
        .fetch_one(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    /// Resources and grants of the course go with it.
    pub async fn remove(&self, id: uuid::Uuid) -> Result<u64, WeaverError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, WeaverError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(id) FROM courses")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
