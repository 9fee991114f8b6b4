use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Router,
};

use tutorhub_catalog::AttributeDraft;
use tutorhub_core::AttributeId;

use crate::app::extract::Body;
use crate::app::routes::common::{parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_attribute).get(list_attributes))
        .route("/:id", get(get_attribute).put(rename_attribute))
        .route("/:id/values", put(replace_values))
}

pub async fn create_attribute(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::AttributeRequest>,
) -> Response {
    let draft = match AttributeDraft::new(body.name(), &body.values) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .attributes
        .create(&draft)
        .await
        .map(|id| dto::CreatedResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

pub async fn get_attribute(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: AttributeId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.attributes.get(id).await.map(dto::AttributeResponse::from),
    )
}

pub async fn list_attributes(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let result = services
        .attributes
        .list()
        .await
        .map(dto::Items::<dto::AttributeResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn rename_attribute(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::NameRequest>,
) -> Response {
    let id: AttributeId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = services.attributes.rename(id, body.name()).await {
        return errors::service_error_to_response(e);
    }
    respond(
        StatusCode::OK,
        services.attributes.get(id).await.map(dto::AttributeResponse::from),
    )
}

pub async fn replace_values(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::ValuesRequest>,
) -> Response {
    let id: AttributeId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = services.attributes.replace_values(id, &body.values).await {
        return errors::service_error_to_response(e);
    }
    respond(
        StatusCode::OK,
        services.attributes.get(id).await.map(dto::AttributeResponse::from),
    )
}
