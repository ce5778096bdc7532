use super::models::ResourceModel;
use crate::error::WeaverError;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ResourceDb {
    pool: sqlx::PgPool,
}

impl ResourceDb {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All resources of a course. Folders come first, then by ordering key and
    /// name, so ties in `order_index` keep that order in the built tree.
    pub async fn list_by_course(
        &self,
        course_id: uuid::Uuid,
    ) -> Result<Vec<ResourceModel>, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "SELECT * FROM course_resources WHERE course_id = $1
             ORDER BY is_folder DESC, order_index, name, created_at",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    pub async fn get(
        &self,
        course_id: uuid::Uuid,
        id: uuid::Uuid,
    ) -> Result<Option<ResourceModel>, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "SELECT * FROM course_resources WHERE id = $1 AND course_id = $2",
        )
        .bind(id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    /// Number of resources directly under `parent`, or at the root for `None`.
    pub async fn count_siblings(
        &self,
        course_id: uuid::Uuid,
        parent: Option<uuid::Uuid>,
    ) -> Result<i64, WeaverError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(id) FROM course_resources
             WHERE course_id = $1 AND parent_id IS NOT DISTINCT FROM $2",
        )
        .bind(course_id)
        .bind(parent)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn insert_folder(
        &self,
        course_id: uuid::Uuid,
        name: &str,
        parent: Option<uuid::Uuid>,
        order_index: i32,
    ) -> Result<ResourceModel, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "INSERT INTO course_resources(course_id, parent_id, name, type, file_url, is_folder, order_index)
             VALUES($1, $2, $3, 'folder', '', TRUE, $4) RETURNING *",
        )
        .bind(course_id)
        .bind(parent)
        .bind(name)
        .bind(order_index)
        .fetch_one(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_file(
        &self,
        course_id: uuid::Uuid,
        name: &str,
        parent: Option<uuid::Uuid>,
        kind: &str,
        file_url: &str,
        file_path: Option<&str>,
        order_index: i32,
    ) -> Result<ResourceModel, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "INSERT INTO course_resources(course_id, parent_id, name, type, file_url, file_path, is_folder, order_index)
             VALUES($1, $2, $3, $4, $5, $6, FALSE, $7) RETURNING *",
        )
        .bind(course_id)
        .bind(parent)
        .bind(name)
        .bind(kind)
        .bind(file_url)
        .bind(file_path)
        .bind(order_index)
        .fetch_one(&self.pool)
        .await
        .map_err(WeaverError::from)
    }

    /// Start a transaction for edits that must see a stable tree.
    pub async fn begin(&self) -> Result<ResourceTx, WeaverError> {
        Ok(ResourceTx {
            tx: self.pool.begin().await?,
        })
    }

    /// Folder and file counts over all courses.
    pub async fn count_all(&self) -> Result<(i64, i64), WeaverError> {
        sqlx::query_as(
            "SELECT
             COUNT(id) FILTER (WHERE is_folder) AS folders,
             COUNT(id) FILTER (WHERE NOT is_folder) AS files
             FROM course_resources",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(WeaverError::from)
    }
}

/// Tree edits of one course. Rows read through [ResourceTx::lock_course] stay
/// locked until the transaction commits or is dropped.
pub struct ResourceTx {
    tx: Transaction<'static, Postgres>,
}

impl ResourceTx {
    /// All resources of a course, locked, in the order of
    /// [ResourceDb::list_by_course].
    pub async fn lock_course(
        &mut self,
        course_id: uuid::Uuid,
    ) -> Result<Vec<ResourceModel>, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "SELECT * FROM course_resources WHERE course_id = $1
             ORDER BY is_folder DESC, order_index, name, created_at
             FOR UPDATE",
        )
        .bind(course_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(WeaverError::from)
    }

    pub async fn update(
        &mut self,
        id: uuid::Uuid,
        name: &str,
        parent: Option<uuid::Uuid>,
        order_index: i32,
    ) -> Result<ResourceModel, WeaverError> {
        sqlx::query_as::<_, ResourceModel>(
            "UPDATE course_resources SET
             name = $1,
             parent_id = $2,
             order_index = $3
             WHERE id = $4 RETURNING *",
        )
        .bind(name)
        .bind(parent)
        .bind(order_index)
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(WeaverError::from)
    }

    pub async fn remove_many(
        &mut self,
        course_id: uuid::Uuid,
        ids: &[uuid::Uuid],
    ) -> Result<u64, WeaverError> {
        let result =
            sqlx::query("DELETE FROM course_resources WHERE course_id = $1 AND id = ANY($2)")
                .bind(course_id)
                .bind(ids)
                .execute(&mut *self.tx)
                .await?;

        debug!("Removed {} resources", result.rows_affected());

        Ok(result.rows_affected())
    }

    pub async fn commit(self) -> Result<(), WeaverError> {
        self.tx.commit().await?;
        Ok(())
    }
}
