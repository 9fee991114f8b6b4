use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};

use tutorhub_core::CoachId;
use tutorhub_roster::{LinkOwner, CoachDraft};

use crate::app::extract::Body;
use crate::app::routes::common::{self, parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_coach).get(list_coaches))
        .route(
            "/:id",
            get(get_coach).put(update_coach).delete(delete_coach),
        )
        .route(
            "/:id/students",
            get(linked_students).post(link_students).delete(unlink_all_students),
        )
        .route("/:id/students/unlink", post(unlink_students))
}

pub async fn create_coach(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::PersonRequest>,
) -> Response {
    let draft = match CoachDraft::new(body.name(), body.phone.as_deref()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .create_coach(&draft)
        .await
        .map(dto::PersonResponse::from);
    respond(StatusCode::CREATED, result)
}

pub async fn update_coach(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::PersonRequest>,
) -> Response {
    let id: CoachId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let draft = match CoachDraft::new(body.name(), body.phone.as_deref()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .update_coach(id, &draft)
        .await
        .map(dto::PersonResponse::from);
    respond(StatusCode::OK, result)
}

pub async fn get_coach(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CoachId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.roster.coach(id).await.map(dto::PersonResponse::from),
    )
}

pub async fn list_coaches(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let result = services
        .roster
        .coaches()
        .await
        .map(dto::Items::<dto::PersonResponse>::of);
    respond(StatusCode::OK, result)
}

/// Deletes the coach together with its student links.
pub async fn delete_coach(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CoachId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .roster
        .delete_coach(id)
        .await
        .map(|removed| dto::RemovedResponse { removed });
    respond(StatusCode::OK, result)
}

pub async fn linked_students(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: CoachId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .roster
        .students_of(id)
        .await
        .map(dto::Items::<dto::PersonResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn link_students(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::LinkRequest>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::link(&services, LinkOwner::Coach(id), body).await,
        Err(resp) => resp,
    }
}

pub async fn unlink_students(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::LinkRequest>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::unlink(&services, LinkOwner::Coach(id), body).await,
        Err(resp) => resp,
    }
}

pub async fn unlink_all_students(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match parse_id(&id) {
        Ok(id) => common::unlink_all(&services, LinkOwner::Coach(id)).await,
        Err(resp) => resp,
    }
}
