use super::{NestedNode, ResourceKind, ResourceRecord, TreeStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResourceModel {
    pub id: uuid::Uuid,
    pub course_id: uuid::Uuid,
    pub parent_id: Option<uuid::Uuid>,
    pub name: String,

    /// `folder` for folders, otherwise the resource kind
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,

    /// Public URL of the content, empty for folders
    pub file_url: String,

    /// Object storage path, if the content was uploaded
    pub file_path: Option<String>,

    pub is_folder: bool,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<uuid::Uuid>,
    pub order_index: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct NewFile {
    pub name: String,
    pub parent_id: Option<uuid::Uuid>,

    /// URL the content is served from
    pub locator: String,
    pub storage_path: Option<String>,

    /// Inferred from the file name when absent
    pub kind: Option<ResourceKind>,
    pub order_index: Option<i32>,
}

/// Partial update. `parent_id: Some(None)` moves the resource to the root.
#[derive(Debug, Default, Deserialize)]
pub struct ResourceUpdate {
    pub name: Option<String>,
    pub order_index: Option<i32>,

    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<uuid::Uuid>>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResources {
    pub removed: usize,

    /// Storage paths of removed leaves, for the object store to clean up
    pub storage_paths: Vec<String>,
}

/// Admin view of a course's resources.
#[derive(Debug, Serialize)]
pub struct ResourceListing<'a> {
    pub tree: Vec<NestedNode<'a>>,

    /// From the root down to the selected folder, empty at the root
    pub breadcrumbs: Vec<&'a ResourceRecord>,

    /// Contents of the selected folder
    pub contents: Vec<&'a ResourceRecord>,
    pub stats: TreeStats,

    /// Resources whose parent is gone, shown at the root
    pub orphans: Vec<&'a ResourceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_null_parent() {
        let absent: ResourceUpdate = serde_json::from_str(r#"{"name":"Week 2"}"#).unwrap();
        assert_eq!(Some("Week 2"), absent.name.as_deref());
        assert_eq!(None, absent.parent_id);

        let root: ResourceUpdate = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(Some(None), root.parent_id);

        let id = uuid::Uuid::new_v4();
        let moved: ResourceUpdate =
            serde_json::from_str(&format!(r#"{{"parent_id":"{id}"}}"#)).unwrap();
        assert_eq!(Some(Some(id)), moved.parent_id);
    }

    #[test]
    fn new_file_kind_optional() {
        let file: NewFile =
            serde_json::from_str(r#"{"name":"a.mp4","locator":"https://cdn/a.mp4"}"#).unwrap();
        assert_eq!(None, file.kind);
        assert_eq!(None, file.parent_id);

        let file: NewFile = serde_json::from_str(
            r#"{"name":"a","locator":"https://cdn/a","kind":"ppt","order_index":3}"#,
        )
        .unwrap();
        assert_eq!(Some(ResourceKind::Ppt), file.kind);
        assert_eq!(Some(3), file.order_index);
    }
}
