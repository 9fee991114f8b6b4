use std::str::FromStr;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

use tutorhub_core::DomainError;
use tutorhub_infra::ServiceResult;
use tutorhub_roster::LinkOwner;

use crate::app::dto;
use crate::app::errors;
use crate::app::services::AppServices;

/// Parse a path segment into a typed id; malformed ids are a 400.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

/// Render a service result with `status`, or the mapped error.
pub fn respond<T: Serialize>(status: StatusCode, result: ServiceResult<T>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

// Link handlers shared by the student and coach routes.

pub async fn link(services: &AppServices, owner: LinkOwner, body: dto::LinkRequest) -> Response {
    let ids = match body.ids() {
        Ok(ids) => ids,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .link(owner, &ids)
        .await
        .map(|plan| dto::LinkResponse::from_plan(owner, plan));
    respond(StatusCode::OK, result)
}

pub async fn unlink(services: &AppServices, owner: LinkOwner, body: dto::LinkRequest) -> Response {
    let ids = match body.ids() {
        Ok(ids) => ids,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .roster
        .unlink(owner, &ids)
        .await
        .map(|removed| dto::RemovedResponse { removed });
    respond(StatusCode::OK, result)
}

pub async fn unlink_all(services: &AppServices, owner: LinkOwner) -> Response {
    let result = services
        .roster
        .unlink_all(owner)
        .await
        .map(|removed| dto::RemovedResponse { removed });
    respond(StatusCode::OK, result)
}
