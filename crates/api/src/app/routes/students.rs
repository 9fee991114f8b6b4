use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};

use tutorhub_core::StudentId;
use tutorhub_roster::{LinkOwner, StudentDraft};

use crate::app::extract::Body;
use crate::app::routes::common::{self, parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_student).get(list_students))
        .route(
            "/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route(
            "/:id/coaches",
            get(linked_coaches).post(link_coaches).delete(unlink_all_coaches),
        )
        .route("/:id/coaches/unlink", post(unlink_coaches))
}

pub async fn create_student(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::PersonRequest>,
) -> Response {
    let draft = match StudentDraft::new(body.name(), body.phone.as_deref()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .create_student(&draft)
        .await
        .map(dto::PersonResponse::from);
    respond(StatusCode::CREATED, result)
}

pub async fn update_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::PersonRequest>,
) -> Response {
    let id: StudentId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let draft = match StudentDraft::new(body.name(), body.phone.as_deref()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .update_student(id, &draft)
        .await
        .map(dto::PersonResponse::from);
    respond(StatusCode::OK, result)
}

pub async fn get_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: StudentId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.roster.student(id).await.map(dto::PersonResponse::from),
    )
}

pub async fn list_students(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let result = services
        .roster
        .students()
        .await
        .map(dto::Items::<dto::PersonResponse>::of);
    respond(StatusCode::OK, result)
}

/// Deletes the student with all its coach links; refused while orders are open.
pub async fn delete_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: StudentId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .roster
        .delete_student(id)
        .await
        .map(|removed| dto::RemovedResponse { removed });
    respond(StatusCode::OK, result)
}

pub async fn linked_coaches(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: StudentId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .roster
        .coaches_of(id)
        .await
        .map(dto::Items::<dto::PersonResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn link_coaches(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::LinkRequest>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::link(&services, LinkOwner::Student(id), body).await,
        Err(resp) => resp,
    }
}

pub async fn unlink_coaches(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::LinkRequest>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::unlink(&services, LinkOwner::Student(id), body).await,
        Err(resp) => resp,
    }
}

pub async fn unlink_all_coaches(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::unlink_all(&services, LinkOwner::Student(id)).await,
        Err(resp) => resp,
    }
}
