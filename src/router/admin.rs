use crate::{
    auth::{
        models::{Role, Session},
        AuthError, ADMIN_COOKIE,
    },
    course::{
        self,
        models::{Course, NewCourse},
    },
    error::WeaverError,
    resource::{
        self,
        models::{DeletedResources, NewFile, NewFolder, ResourceModel, ResourceUpdate},
    },
    state::{Portal, PortalStats},
    user::{
        self,
        models::{NewUser, Permissions, User},
    },
};
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, get_service, patch, post},
    Extension, Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use serde::Deserialize;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

pub(super) fn admin_router(state: Portal) -> Router {
    let router_static = Router::new()
        .fallback_service(ServeDir::new("public/admin"))
        .layer(middleware::from_fn_with_state(state.clone(), session_check));

    let router_admin = Router::new()
        .route("/api/logout", post(logout))
        .route("/api/stats", get(stats))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", delete(delete_user))
        .route(
            "/api/users/:id/permissions",
            get(get_permissions).put(set_permissions),
        )
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/:id", delete(delete_course))
        .route("/api/courses/:id/resources", get(list_resources))
        .route("/api/courses/:id/folders", post(create_folder))
        .route("/api/courses/:id/files", post(create_file))
        .route(
            "/api/courses/:id/resources/:resource_id",
            patch(update_resource).delete(delete_resource),
        )
        .layer(middleware::from_fn_with_state(state.clone(), session_check));

    let router_auth = Router::new().route(
        "/login",
        get_service(ServeFile::new("public/admin/login.html")).post(login),
    );

    let router = router_admin
        .merge(router_static)
        .merge(router_auth)
        .with_state(state);

    Router::new().nest("/admin", router)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

impl SearchQuery {
    fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct FolderQuery {
    folder: Option<uuid::Uuid>,
}

async fn login(
    state: State<Portal>,
    password: Json<String>,
) -> Result<Response, WeaverError> {
    if !state.auth.verify_admin_password(&password) {
        warn!("Failed admin login");
        return Err(AuthError::InvalidCredentials.into());
    }

    let session = state.auth.create_session(Role::Admin, None).await?;
    let cookie = state.auth.create_session_cookie(&session);

    info!("Admin logged in");

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

async fn logout(
    state: State<Portal>,
    Extension(session): Extension<Session>,
) -> Result<Response, WeaverError> {
    state.auth.remove_session(session.id).await?;
    let cookie = state.auth.removal_cookie(Role::Admin);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

async fn stats(state: State<Portal>) -> Result<Json<PortalStats>, WeaverError> {
    Ok(Json(state.stats().await?))
}

async fn list_users(
    state: State<Portal>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>, WeaverError> {
    let users = state.users.list_users(query.term()).await?;
    Ok(Json(users.into_iter().map(User::from).collect()))
}

async fn create_user(
    state: State<Portal>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), WeaverError> {
    let user = user::signup(&state.users, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    state: State<Portal>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, WeaverError> {
    user::remove(&state.users, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_permissions(
    state: State<Portal>,
    Path(id): Path<uuid::Uuid>,
) -> Result<Json<Permissions>, WeaverError> {
    if state.users.get(id).await?.is_none() {
        return Err(WeaverError::NotFound(format!("user {id}")));
    }

    Ok(Json(Permissions {
        course_ids: state.users.list_permissions(id).await?,
    }))
}

async fn set_permissions(
    state: State<Portal>,
    Path(id): Path<uuid::Uuid>,
    Json(permissions): Json<Permissions>,
) -> Result<Json<Permissions>, WeaverError> {
    let course_ids = user::set_permissions(&state.users, id, permissions.course_ids).await?;
    Ok(Json(Permissions { course_ids }))
}

async fn list_courses(
    state: State<Portal>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Course>>, WeaverError> {
    Ok(Json(state.courses.list(query.term()).await?))
}

async fn create_course(
    state: State<Portal>,
    Json(new_course): Json<NewCourse>,
) -> Result<(StatusCode, Json<Course>), WeaverError> {
    let course = course::create(&state.courses, new_course).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn delete_course(
    state: State<Portal>,
    Path(id): Path<uuid::Uuid>,
) -> Result<StatusCode, WeaverError> {
    course::remove(&state.courses, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_resources(
    state: State<Portal>,
    Path(course_id): Path<uuid::Uuid>,
    Query(query): Query<FolderQuery>,
) -> Result<Response, WeaverError> {
    course::get(&state.courses, course_id).await?;

    let forest = resource::load_forest(&state.resources, course_id).await?;
    let folder = query.folder.map(|folder| folder.to_string());
    let listing = resource::listing(&forest, folder.as_deref())?;

    Ok(Json(listing).into_response())
}

async fn create_folder(
    state: State<Portal>,
    Path(course_id): Path<uuid::Uuid>,
    Json(folder): Json<NewFolder>,
) -> Result<(StatusCode, Json<ResourceModel>), WeaverError> {
    course::get(&state.courses, course_id).await?;
    let folder = resource::create_folder(&state.resources, course_id, folder).await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

async fn create_file(
    state: State<Portal>,
    Path(course_id): Path<uuid::Uuid>,
    Json(file): Json<NewFile>,
) -> Result<(StatusCode, Json<ResourceModel>), WeaverError> {
    course::get(&state.courses, course_id).await?;
    let file = resource::create_file(&state.resources, course_id, file).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

async fn update_resource(
    state: State<Portal>,
    Path((course_id, id)): Path<(uuid::Uuid, uuid::Uuid)>,
    Json(update): Json<ResourceUpdate>,
) -> Result<Json<ResourceModel>, WeaverError> {
    Ok(Json(
        resource::update(&state.resources, course_id, id, update).await?,
    ))
}

async fn delete_resource(
    state: State<Portal>,
    Path((course_id, id)): Path<(uuid::Uuid, uuid::Uuid)>,
) -> Result<Json<DeletedResources>, WeaverError> {
    Ok(Json(resource::delete(&state.resources, course_id, id).await?))
}

/// Resolves the admin session. Learner sessions are refused.
async fn session_check(
    state: State<Portal>,
    cookie: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, WeaverError> {
    let session_id = cookie.as_ref().and_then(|cookie| cookie.get(ADMIN_COOKIE));

    let session = state.auth.resolve(session_id, Role::Admin).await?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_term_ignores_blank() {
        let blank = SearchQuery {
            search: Some("  ".to_string()),
        };
        assert_eq!(None, blank.term());

        let none = SearchQuery { search: None };
        assert_eq!(None, none.term());

        let term = SearchQuery {
            search: Some(" ada ".to_string()),
        };
        assert_eq!(Some("ada"), term.term());
    }
}
