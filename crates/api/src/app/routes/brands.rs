use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};

use tutorhub_catalog::BrandDraft;
use tutorhub_core::BrandId;

use crate::app::extract::Body;
use crate::app::routes::common::{parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_brand).get(list_brands))
        .route("/:id", get(get_brand))
        .route("/:id/status", post(toggle_status))
}

pub async fn create_brand(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::NameRequest>,
) -> Response {
    let draft = match BrandDraft::new(body.name()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .brands
        .create(&draft)
        .await
        .map(|id| dto::CreatedResponse { id: id.get() });
    respond(StatusCode::CREATED, result)
}

pub async fn get_brand(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: BrandId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(StatusCode::OK, services.brands.get(id).await.map(dto::BrandResponse::from))
}

pub async fn list_brands(Extension(services): Extension<Arc<AppServices>>) -> Response {
    let result = services
        .brands
        .list()
        .await
        .map(dto::Items::<dto::BrandResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn toggle_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::StatusRequest>,
) -> Response {
    let id: BrandId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let status = match body.status() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = services.brands.toggle_status(id, status).await {
        return errors::service_error_to_response(e);
    }
    respond(StatusCode::OK, services.brands.get(id).await.map(dto::BrandResponse::from))
}
