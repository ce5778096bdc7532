use crate::resource::{NestedNode, ResourceRecord, TreeStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Course {
    pub id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewCourse {
    pub name: String,
    pub description: Option<String>,

    #[serde(alias = "coverImage")]
    pub cover_image: Option<String>,
}

/// A course together with its (possibly filtered) resource tree.
#[derive(Debug, Serialize)]
pub struct CourseDetail<'a> {
    pub course: &'a Course,
    pub resources: Vec<NestedNode<'a>>,

    /// Opened by default when the course is shown
    pub first_resource: Option<&'a ResourceRecord>,
    pub stats: TreeStats,
}
