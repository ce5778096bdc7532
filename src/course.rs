use self::{
    db::CourseDb,
    models::{Course, CourseDetail, NewCourse},
};
use crate::{
    error::WeaverError,
    resource::{self, db::ResourceDb, Forest, ResourceView},
    user::db::UserDb,
};
use tracing::info;

pub mod db;
pub mod models;

pub fn validate_new_course(course: &NewCourse) -> Result<(), WeaverError> {
    if course.name.trim().is_empty() {
        return Err(WeaverError::Validation(
            "course name is required".to_string(),
        ));
    }
    Ok(())
}

pub async fn get(db: &CourseDb, id: uuid::Uuid) -> Result<Course, WeaverError> {
    db.get(id)
        .await?
        .ok_or_else(|| WeaverError::NotFound(format!("course {id}")))
}

pub async fn create(db: &CourseDb, course: NewCourse) -> Result<Course, WeaverError> {
    validate_new_course(&course)?;

    let NewCourse {
        name,
        description,
        cover_image,
    } = course;

    let course = db
        .insert(
            name.trim(),
            description.as_deref().filter(|d| !d.trim().is_empty()),
            cover_image.as_deref().filter(|c| !c.trim().is_empty()),
        )
        .await?;

    info!("Created course {} ({})", course.name, course.id);

    Ok(course)
}

pub async fn remove(db: &CourseDb, id: uuid::Uuid) -> Result<(), WeaverError> {
    if db.remove(id).await? == 0 {
        return Err(WeaverError::NotFound(format!("course {id}")));
    }
    info!("Removed course {id}");
    Ok(())
}

/// Load a course and its resource tree on behalf of a learner. The grant is
/// checked before the course is looked up.
pub async fn load_for_user(
    users: &UserDb,
    courses: &CourseDb,
    resources: &ResourceDb,
    user_id: uuid::Uuid,
    course_id: uuid::Uuid,
    view: ResourceView,
) -> Result<(Course, Forest), WeaverError> {
    if !users.has_permission(user_id, course_id).await? {
        return Err(WeaverError::Forbidden(format!(
            "no access to course {course_id}"
        )));
    }

    let Some(course) = courses.get(course_id).await? else {
        return Err(WeaverError::NotFound(format!("course {course_id}")));
    };

    let forest = resource::load_forest(resources, course_id).await?;

    Ok((course, view.apply(&forest)))
}

pub fn detail<'a>(course: &'a Course, forest: &'a Forest) -> CourseDetail<'a> {
    CourseDetail {
        course,
        resources: forest.to_nested(),
        first_resource: forest.first_leaf().map(|node| node.record()),
        stats: forest.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceKind, ResourceRecord};
    use chrono::Utc;

    fn course() -> Course {
        Course {
            id: uuid::Uuid::new_v4(),
            name: "Onboarding".to_string(),
            description: None,
            cover_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn record(id: &str, parent: Option<&str>, is_folder: bool, kind: ResourceKind) -> ResourceRecord {
        ResourceRecord {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            is_folder,
            kind,
            order_index: 0,
            name: id.to_string(),
            locator: (!is_folder).then(|| format!("https://cdn.local/{id}")),
        }
    }

    #[test]
    fn validates_name() {
        let missing = NewCourse {
            name: "  ".to_string(),
            description: Some("desc".to_string()),
            cover_image: None,
        };
        assert!(matches!(
            validate_new_course(&missing),
            Err(WeaverError::Validation(_))
        ));

        let ok = NewCourse {
            name: "Safety".to_string(),
            description: None,
            cover_image: None,
        };
        assert!(validate_new_course(&ok).is_ok());
    }

    #[test]
    fn detail_opens_first_leaf() {
        let course = course();
        let forest = Forest::build(vec![
            record("week-1", None, true, ResourceKind::Other),
            record("intro", Some("week-1"), false, ResourceKind::Video),
            record("notes", None, false, ResourceKind::Pdf),
        ])
        .unwrap();

        let detail = detail(&course, &forest);
        assert_eq!("intro", detail.first_resource.unwrap().id);
        assert_eq!(1, detail.stats.folders);
        assert_eq!(2, detail.stats.files);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!("Onboarding", json["course"]["name"]);
        assert_eq!("intro", json["resources"][0]["children"][0]["id"]);
        assert_eq!("intro", json["first_resource"]["id"]);
    }

    #[test]
    fn detail_of_empty_course() {
        let course = course();
        let forest = Forest::default();
        let detail = detail(&course, &forest);

        assert!(detail.first_resource.is_none());
        assert!(detail.resources.is_empty());

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json["first_resource"].is_null());
    }
}
