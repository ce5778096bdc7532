use self::{
    db::ResourceDb,
    models::{DeletedResources, NewFile, NewFolder, ResourceListing, ResourceModel, ResourceUpdate},
};
use crate::error::WeaverError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::Path};
use tracing::info;

pub mod db;
pub mod models;
mod tree;

pub use tree::{Forest, NestedNode, ResourceNode, TreeError, TreeStats};

/// Flat resource as stored for a course. Folders carry no locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,

    /// `None` places the record at the root of the course.
    pub parent_id: Option<String>,

    pub is_folder: bool,

    /// Only meaningful for leaves.
    pub kind: ResourceKind,

    /// Sibling ordering key. Ties keep the order the records arrived in.
    pub order_index: i32,

    pub name: String,

    /// URL or storage path of the content.
    pub locator: Option<String>,
}

impl From<ResourceModel> for ResourceRecord {
    fn from(value: ResourceModel) -> Self {
        let ResourceModel {
            id,
            parent_id,
            name,
            kind,
            file_url,
            is_folder,
            order_index,
            ..
        } = value;

        Self {
            id: id.to_string(),
            parent_id: parent_id.map(|id| id.to_string()),
            is_folder,
            kind: if is_folder {
                ResourceKind::Other
            } else {
                ResourceKind::parse(&kind)
            },
            order_index,
            name,
            locator: (!is_folder && !file_url.is_empty()).then_some(file_url),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Video,
    Pdf,
    Ppt,
    #[default]
    Other,
}

impl ResourceKind {
    /// The value stored in the `type` column. Folders are stored as `folder`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Video => "video",
            ResourceKind::Pdf => "pdf",
            ResourceKind::Ppt => "ppt",
            ResourceKind::Other => "other",
        }
    }

    /// Lenient parse of a stored type, anything unknown is `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "video" => ResourceKind::Video,
            "pdf" => ResourceKind::Pdf,
            "ppt" | "pptx" => ResourceKind::Ppt,
            _ => ResourceKind::Other,
        }
    }

    /// Infer the kind of an uploaded file from its extension.
    pub fn from_file_name(name: &str) -> Self {
        let Some(ext) = Path::new(name).extension().and_then(|ext| ext.to_str()) else {
            return ResourceKind::Other;
        };

        match ext.to_ascii_lowercase().as_str() {
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v" => ResourceKind::Video,
            "pdf" => ResourceKind::Pdf,
            "ppt" | "pptx" => ResourceKind::Ppt,
            _ => ResourceKind::Other,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, ResourceKind::Pdf | ResourceKind::Ppt)
    }
}

/// Which resources a course view shows. Folders survive a filtered view only
/// when they lead to a matching leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceView {
    #[default]
    All,
    Video,
    Document,
}

impl ResourceView {
    pub fn matches(&self, record: &ResourceRecord) -> bool {
        if record.is_folder {
            return false;
        }

        match self {
            ResourceView::All => true,
            ResourceView::Video => record.kind == ResourceKind::Video,
            ResourceView::Document => record.kind.is_document(),
        }
    }

    pub fn apply(&self, forest: &Forest) -> Forest {
        match self {
            ResourceView::All => forest.clone(),
            view => forest.filter_preserving_ancestors(|node| view.matches(node.record())),
        }
    }
}

/// Build the resource tree of a course from its stored records.
pub async fn load_forest(db: &ResourceDb, course_id: uuid::Uuid) -> Result<Forest, WeaverError> {
    let models = db.list_by_course(course_id).await?;
    forest_of(&models)
}

/// The whole tree plus the breadcrumbs and contents of `folder`, the root
/// when absent.
pub fn listing<'a>(
    forest: &'a Forest,
    folder: Option<&str>,
) -> Result<ResourceListing<'a>, WeaverError> {
    if let Some(folder) = folder {
        match forest.get(folder) {
            Some(node) if node.is_folder() => {}
            _ => return Err(WeaverError::NotFound(format!("folder {folder}"))),
        }
    }

    Ok(ResourceListing {
        tree: forest.to_nested(),
        breadcrumbs: folder
            .map(|folder| {
                forest
                    .breadcrumbs(folder)
                    .into_iter()
                    .map(|node| node.record())
                    .collect()
            })
            .unwrap_or_default(),
        contents: forest
            .children_of(folder)
            .into_iter()
            .map(|node| node.record())
            .collect(),
        stats: forest.stats(),
        orphans: forest.orphans().map(|node| node.record()).collect(),
    })
}

pub async fn create_folder(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    folder: NewFolder,
) -> Result<ResourceModel, WeaverError> {
    let NewFolder {
        name,
        parent_id,
        order_index,
    } = folder;

    let name = required_name(&name)?;
    check_parent(db, course_id, parent_id).await?;

    let order_index = match order_index {
        Some(order_index) => order_index,
        None => next_order_index(db, course_id, parent_id).await?,
    };

    let folder = db
        .insert_folder(course_id, name, parent_id, order_index)
        .await?;

    info!("Created folder {} in course {course_id}", folder.name);

    Ok(folder)
}

pub async fn create_file(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    file: NewFile,
) -> Result<ResourceModel, WeaverError> {
    let NewFile {
        name,
        parent_id,
        locator,
        storage_path,
        kind,
        order_index,
    } = file;

    let name = required_name(&name)?;

    let locator = locator.trim();
    if locator.is_empty() {
        return Err(WeaverError::Validation(
            "resource locator is required".to_string(),
        ));
    }

    check_parent(db, course_id, parent_id).await?;

    let kind = kind.unwrap_or_else(|| ResourceKind::from_file_name(name));

    let order_index = match order_index {
        Some(order_index) => order_index,
        None => next_order_index(db, course_id, parent_id).await?,
    };

    let file = db
        .insert_file(
            course_id,
            name,
            parent_id,
            kind.as_str(),
            locator,
            storage_path.as_deref(),
            order_index,
        )
        .await?;

    info!(
        "Registered {} resource {} in course {course_id}",
        kind.as_str(),
        file.name
    );

    Ok(file)
}

/// Rename, re-order or move a resource. A folder can not be moved into
/// itself or anywhere below itself. The check and the write hold the row
/// locks of the whole course.
pub async fn update(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    id: uuid::Uuid,
    update: ResourceUpdate,
) -> Result<ResourceModel, WeaverError> {
    let mut tx = db.begin().await?;
    let models = tx.lock_course(course_id).await?;

    let Some(existing) = models.iter().find(|model| model.id == id) else {
        return Err(WeaverError::NotFound(format!("resource {id}")));
    };

    let ResourceUpdate {
        name,
        order_index,
        parent_id,
    } = update;

    let name = match name {
        Some(ref name) => required_name(name)?,
        None => existing.name.as_str(),
    };

    let parent = match parent_id {
        Some(Some(parent)) => {
            let forest = forest_of(&models)?;
            check_move(&forest, id, parent)?;
            Some(parent)
        }
        Some(None) => None,
        None => existing.parent_id,
    };

    let order_index = order_index.unwrap_or(existing.order_index);

    let updated = tx.update(id, name, parent, order_index).await?;
    tx.commit().await?;

    Ok(updated)
}

/// Delete a resource, folders together with everything below them.
pub async fn delete(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    id: uuid::Uuid,
) -> Result<DeletedResources, WeaverError> {
    let mut tx = db.begin().await?;
    let models = tx.lock_course(course_id).await?;
    let forest = forest_of(&models)?;

    let Removal { ids, storage_paths } = removal(&forest, &models, id);

    if ids.is_empty() {
        return Err(WeaverError::NotFound(format!("resource {id}")));
    }

    let removed = tx.remove_many(course_id, &ids).await?;
    tx.commit().await?;

    info!("Removed {removed} resources from course {course_id}");

    Ok(DeletedResources {
        removed: removed as usize,
        storage_paths,
    })
}

fn forest_of(models: &[ResourceModel]) -> Result<Forest, WeaverError> {
    Ok(Forest::build(
        models.iter().cloned().map(ResourceRecord::from).collect(),
    )?)
}

/// `parent` must be a folder of the forest that is neither `id` nor below it.
fn check_move(forest: &Forest, id: uuid::Uuid, parent: uuid::Uuid) -> Result<(), WeaverError> {
    let target = parent.to_string();

    match forest.get(&target) {
        Some(node) if node.is_folder() => {}
        _ => {
            return Err(WeaverError::Validation(format!(
                "parent {parent} is not a folder of this course"
            )))
        }
    }

    if forest.is_within(&target, &id.to_string()) {
        return Err(WeaverError::Validation(
            "a resource can not be moved into itself".to_string(),
        ));
    }

    Ok(())
}

#[derive(Debug, Default, PartialEq)]
struct Removal {
    /// `id` and its descendants, in pre-order
    ids: Vec<uuid::Uuid>,

    /// Storage paths of the removed leaves, in the same order
    storage_paths: Vec<String>,
}

/// What deleting `id` removes. Empty when `id` is not in the forest.
fn removal(forest: &Forest, models: &[ResourceModel], id: uuid::Uuid) -> Removal {
    let by_id = models
        .iter()
        .map(|model| (model.id, model))
        .collect::<HashMap<_, _>>();

    let ids = forest
        .subtree_ids(&id.to_string())
        .into_iter()
        .filter_map(|id| uuid::Uuid::parse_str(id).ok())
        .collect::<Vec<_>>();

    let storage_paths = ids
        .iter()
        .filter_map(|id| by_id.get(id))
        .filter(|model| !model.is_folder)
        .filter_map(|model| model.file_path.clone())
        .collect();

    Removal { ids, storage_paths }
}

fn required_name(name: &str) -> Result<&str, WeaverError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(WeaverError::Validation(
            "resource name is required".to_string(),
        ));
    }
    Ok(name)
}

async fn check_parent(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    parent: Option<uuid::Uuid>,
) -> Result<(), WeaverError> {
    let Some(parent) = parent else {
        return Ok(());
    };

    match db.get(course_id, parent).await? {
        Some(model) if model.is_folder => Ok(()),
        _ => Err(WeaverError::Validation(format!(
            "parent {parent} is not a folder of this course"
        ))),
    }
}

async fn next_order_index(
    db: &ResourceDb,
    course_id: uuid::Uuid,
    parent: Option<uuid::Uuid>,
) -> Result<i32, WeaverError> {
    let count = db.count_siblings(course_id, parent).await?;
    Ok(i32::try_from(count).unwrap_or(i32::MAX))
}
