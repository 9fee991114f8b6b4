use axum::{routing::get, Router};

pub mod attributes;
pub mod brands;
pub mod classifications;
pub mod coaches;
pub mod common;
pub mod contracts;
pub mod students;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/classifications", classifications::router())
        .nest("/brands", brands::router())
        .nest("/attributes", attributes::router())
        .nest("/students", students::router())
        .nest("/coaches", coaches::router())
        .nest("/contracts", contracts::router())
}
