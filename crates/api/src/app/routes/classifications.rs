use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};

use tutorhub_catalog::{ClassificationDraft, ClassificationLevel, ClassificationScope};
use tutorhub_core::{coerce, ClassificationId, DomainResult};
use tutorhub_infra::store::ClassificationFilter;

use crate::app::extract::Body;
use crate::app::routes::common::{parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_classification).get(list_all))
        .route("/top-level", get(list_top_level))
        .route("/active", get(list_active))
        .route("/name-check", get(check_name))
        .route("/:id", get(get_classification).put(update_classification))
        .route("/:id/status", post(toggle_status))
        .route("/:id/children", get(list_children))
}

fn draft(body: &dto::ClassificationRequest) -> DomainResult<ClassificationDraft> {
    ClassificationDraft::from_loose(body.name(), &body.level, &body.parent_id)
}

pub async fn create_classification(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::ClassificationRequest>,
) -> Response {
    let draft = match draft(&body) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .classifications
        .create(&draft)
        .await
        .map(|id| dto::CreatedResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

pub async fn update_classification(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::ClassificationRequest>,
) -> Response {
    let draft = match draft(&body) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let id: ClassificationId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .classifications
        .update(id, &draft)
        .await
        .map(|()| dto::CreatedResponse { id: id.get() });
    respond(StatusCode::OK, result)
}

pub async fn toggle_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::StatusRequest>,
) -> Response {
    let id: ClassificationId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status = match body.status() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = services.classifications.toggle_status(id, status).await {
        return errors::service_error_to_response(e);
    }
    let result = services
        .classifications
        .get(id)
        .await
        .map(dto::ClassificationResponse::from);
    respond(StatusCode::OK, result)
}

pub async fn get_classification(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ClassificationId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .classifications
        .get(id)
        .await
        .map(dto::ClassificationResponse::from);
    respond(StatusCode::OK, result)
}

async fn list(services: &AppServices, filter: ClassificationFilter) -> Response {
    let result = services
        .classifications
        .list(filter)
        .await
        .map(dto::Items::<dto::ClassificationResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn list_all(Extension(services): Extension<Arc<AppServices>>) -> Response {
    list(&services, ClassificationFilter::All).await
}

pub async fn list_top_level(Extension(services): Extension<Arc<AppServices>>) -> Response {
    list(&services, ClassificationFilter::TopLevel).await
}

pub async fn list_active(Extension(services): Extension<Arc<AppServices>>) -> Response {
    list(&services, ClassificationFilter::Active).await
}

pub async fn list_children(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match parse_id::<ClassificationId>(&id) {
        Ok(parent) => list(&services, ClassificationFilter::ChildrenOf(parent)).await,
        Err(resp) => resp,
    }
}

/// `GET /classifications/name-check?name=..&level=..&parent_id=..&exclude_id=..`
pub async fn check_name(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::NameCheckQuery>,
) -> Response {
    let (scope, exclude) = match name_probe(&query) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let result = services
        .classifications
        .is_name_available(&query.name, scope, exclude)
        .await
        .map(|unique| dto::NameCheckResponse { unique });
    respond(StatusCode::OK, result)
}

fn name_probe(
    query: &dto::NameCheckQuery,
) -> DomainResult<(ClassificationScope, Option<ClassificationId>)> {
    let level = ClassificationLevel::from_code(coerce::required_int("level", &query.level())?)?;
    let parent = match level {
        ClassificationLevel::TopLevel => None,
        ClassificationLevel::Child => {
            coerce::optional_int("parent_id", &query.parent_id())?.and_then(ClassificationId::positive)
        }
    };
    let scope = ClassificationScope::from_parts(level, parent)?;
    let exclude = query.exclude_id()?.map(ClassificationId::new);
    Ok((scope, exclude))
}
