use crate::{
    auth::Auth, course::db::CourseDb, error::WeaverError, resource::db::ResourceDb,
    user::db::UserDb,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Portal {
    /// The portal title for the front end
    pub title: Option<String>,

    pub users: UserDb,

    pub courses: CourseDb,

    pub resources: ResourceDb,

    pub auth: Arc<Auth>,
}

impl Portal {
    pub fn new(pool: PgPool, auth: Auth, title: Option<String>) -> Self {
        Self {
            title,
            users: UserDb::new(pool.clone()),
            courses: CourseDb::new(pool.clone()),
            resources: ResourceDb::new(pool),
            auth: Arc::new(auth),
        }
    }

    pub async fn stats(&self) -> Result<PortalStats, WeaverError> {
        let (users, courses, (folders, files)) = tokio::try_join!(
            self.users.count(),
            self.courses.count(),
            self.resources.count_all(),
        )?;

        Ok(PortalStats {
            users,
            courses,
            files,
            folders,
        })
    }
}

/// Dashboard counters
#[derive(Debug, Serialize)]
pub struct PortalStats {
    pub users: i64,
    pub courses: i64,
    pub files: i64,
    pub folders: i64,
}
