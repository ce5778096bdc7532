use crate::{
    auth::{
        models::{Role, Session},
        AuthError, LEARNER_COOKIE,
    },
    course,
    error::WeaverError,
    resource::ResourceView,
    state::Portal,
    user::{
        self,
        models::{Credentials, NewUser, User},
    },
};
use axum::{
    extract::{Path, Query, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{headers::Cookie, TypedHeader};
use axum_macros::debug_handler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use self::admin::admin_router;

mod admin;

pub fn router(state: Portal) -> Router {
    let router = public_router(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ]);

    if state.auth.admin_enabled() {
        router.merge(admin_router(state))
    } else {
        router
    }
    .layer(TraceLayer::new_for_http())
    .layer(cors)
}

fn public_router(state: Portal) -> Router {
    let router_learner = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/courses", get(list_courses))
        .route("/api/courses/:id", get(course_detail))
        .layer(middleware::from_fn_with_state(state.clone(), session_check));

    Router::new()
        .nest_service("/public", ServeDir::new("public"))
        .route("/api", get(index))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .merge(router_learner)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user: User,
    expires: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CourseQuery {
    view: Option<ResourceView>,
}

async fn index(state: State<Portal>) -> Json<serde_json::Value> {
    Json(json!({
        "message": "CourseWeaver Backend API",
        "title": state.title,
    }))
}

async fn signup(
    state: State<Portal>,
    user: Json<NewUser>,
) -> Result<Response, WeaverError> {
    let user = user::signup(&state.users, user.0).await?;
    let response = start_session(&state, user).await?;
    Ok((StatusCode::CREATED, response).into_response())
}

async fn login(
    state: State<Portal>,
    credentials: Json<Credentials>,
) -> Result<Response, WeaverError> {
    let user = user::login(&state.users, &credentials.username, &credentials.password).await?;
    info!("User {} logged in", user.username);
    start_session(&state, user).await
}

async fn start_session(state: &Portal, user: User) -> Result<Response, WeaverError> {
    let session = state
        .auth
        .create_session(Role::Learner, Some(user.id))
        .await?;
    let cookie = state.auth.create_session_cookie(&session);

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(LoginResponse {
            user,
            expires: session.expires,
        }),
    )
        .into_response())
}

async fn logout(
    state: State<Portal>,
    Extension(session): Extension<Session>,
) -> Result<Response, WeaverError> {
    state.auth.remove_session(session.id).await?;
    let cookie = state.auth.removal_cookie(Role::Learner);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie.to_string())]).into_response())
}

async fn list_courses(
    state: State<Portal>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<course::models::Course>>, WeaverError> {
    let user_id = session.user_id.ok_or(AuthError::NoSession)?;
    Ok(Json(state.courses.list_for_user(user_id).await?))
}

#[debug_handler]
async fn course_detail(
    state: State<Portal>,
    Extension(session): Extension<Session>,
    Path(course_id): Path<uuid::Uuid>,
    Query(query): Query<CourseQuery>,
) -> Result<Response, WeaverError> {
    let user_id = session.user_id.ok_or(AuthError::NoSession)?;

    let (course, forest) = course::load_for_user(
        &state.users,
        &state.courses,
        &state.resources,
        user_id,
        course_id,
        query.view.unwrap_or_default(),
    )
    .await?;

    Ok(Json(course::detail(&course, &forest)).into_response())
}

/// Resolves the learner session and hands it to the handler as an extension.
async fn session_check(
    state: State<Portal>,
    cookie: Option<TypedHeader<Cookie>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, WeaverError> {
    let session_id = cookie.as_ref().and_then(|cookie| cookie.get(LEARNER_COOKIE));

    let session = state.auth.resolve(session_id, Role::Learner).await?;
    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
