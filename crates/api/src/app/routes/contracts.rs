use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};

use tutorhub_core::{ContractId, StudentId};

use crate::app::extract::Body;
use crate::app::routes::common::{parse_id, respond};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_contract).get(list_contracts))
        .route("/:id", get(get_contract))
        .route("/:id/revoke", post(revoke_contract))
        .route("/:id/terminate", post(terminate_contract))
}

/// The authenticated caller is recorded as the contract's initiator.
pub async fn create_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Body(body): Body<dto::CreateContractRequest>,
) -> Response {
    let input = match body.into_new_contract() {
        Ok(input) => input,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .contracts
        .create(input, actor.user_id())
        .await
        .map(dto::ContractResponse::from);
    respond(StatusCode::CREATED, result)
}

pub async fn list_contracts(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ContractListQuery>,
) -> Response {
    let student = match query.student_id.as_deref() {
        None => None,
        Some(raw) => match parse_id::<StudentId>(raw) {
            Ok(id) => Some(id),
            Err(resp) => return resp,
        },
    };
    let result = services
        .contracts
        .list(student)
        .await
        .map(dto::Items::<dto::ContractResponse>::of);
    respond(StatusCode::OK, result)
}

pub async fn get_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ContractId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.contracts.get(id).await.map(dto::ContractResponse::from),
    )
}

pub async fn revoke_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: ContractId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    respond(
        StatusCode::OK,
        services.contracts.revoke(id).await.map(dto::ContractResponse::from),
    )
}

pub async fn terminate_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(body): Body<dto::TerminateContractRequest>,
) -> Response {
    let id: ContractId = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let result = services
        .contracts
        .terminate(id, body.termination_agreement())
        .await
        .map(dto::ContractResponse::from);
    respond(StatusCode::OK, result)
}
