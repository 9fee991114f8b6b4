use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tutorhub_api::app::{build_app, services::AppServices};
use tutorhub_auth::JwtClaims;
use tutorhub_core::UserId;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    token: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = build_app(JWT_SECRET.to_string(), AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            token: mint_jwt(JWT_SECRET, 7),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap();
        read(res).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(jwt_secret: &str, user_id: i64) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(user_id),
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/students"))
        .bearer_auth(mint_jwt("other-secret", 7))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_is_derived_from_token() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/whoami").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 7);
}

#[tokio::test]
async fn classification_names_are_unique_per_scope() {
    let srv = TestServer::spawn().await;

    let (status, _) = srv
        .post("/classifications", json!({ "name": "Language", "level": 0 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = srv
        .post("/classifications", json!({ "name": "Language", "level": "0" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "constraint_violation");

    let (_, n) = srv
        .post("/classifications", json!({ "name": "Music", "level": 0 }))
        .await;
    let (_, m) = srv
        .post("/classifications", json!({ "name": "Science", "level": 0 }))
        .await;
    let (n, m) = (n["id"].as_i64().unwrap(), m["id"].as_i64().unwrap());

    // The same child name may live under two different parents.
    for parent in [n, m] {
        let (status, _) = srv
            .post(
                "/classifications",
                json!({ "name": "English", "level": 1, "parent_id": parent }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = srv
        .post(
            "/classifications",
            json!({ "name": "English", "level": 1, "parent_id": n.to_string() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = srv
        .get(&format!("/classifications/name-check?name=English&level=1&parent_id={n}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unique"], false);

    let (status, body) = srv.get("/classifications/name-check?name=%20&level=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, body) = srv.get(&format!("/classifications/{n}/children")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn contract_revocation_happens_once() {
    let srv = TestServer::spawn().await;

    let (status, student) = srv.post("/students", json!({ "name": "Mia" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let student_id = student["id"].as_i64().unwrap();

    let (status, contract) = srv
        .post(
            "/contracts",
            json!({
                "name": "Spring term",
                "student_id": student_id.to_string(),
                "type": 0,
                "signature_form": 1,
                "amount": 120000
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(contract["status"], 0);
    assert_eq!(contract["initiator"], 7);
    let id = contract["id"].as_i64().unwrap();

    let (status, revoked) = srv.post(&format!("/contracts/{id}/revoke"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["status"], 98);

    let (status, body) = srv.post(&format!("/contracts/{id}/revoke"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "constraint_violation");

    let (status, body) = srv
        .post(
            &format!("/contracts/{id}/terminate"),
            json!({ "termination_agreement": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, body) = srv.get(&format!("/contracts?student_id={student_id}")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn contract_validation_and_missing_student() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv
        .post(
            "/contracts",
            json!({ "name": "Term", "student_id": 404, "type": 0, "signature_form": 0, "amount": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .post(
            "/contracts",
            json!({ "name": "Term", "student_id": 404, "type": 0, "signature_form": 0, "amount": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn linking_is_idempotent() {
    let srv = TestServer::spawn().await;

    let (_, student) = srv.post("/students", json!({ "name": "Mia" })).await;
    let (_, coach_a) = srv.post("/coaches", json!({ "name": "Ana" })).await;
    let (_, coach_b) = srv.post("/coaches", json!({ "name": "Ben", "phone": "555-0101" })).await;
    let student = student["id"].as_i64().unwrap();
    let (a, b) = (coach_a["id"].as_i64().unwrap(), coach_b["id"].as_i64().unwrap());

    let path = format!("/students/{student}/coaches");
    let (status, body) = srv.post(&path, json!({ "ids": [a, b.to_string(), 999] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], json!([a, b]));
    assert_eq!(body["missing"], json!([999]));

    let (status, body) = srv.post(&path, json!({ "ids": [a, b] })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], json!([]));
    assert_eq!(body["already_linked"], json!([a, b]));

    let (_, body) = srv.get(&format!("/coaches/{a}/students")).await;
    assert_eq!(body["items"][0]["id"], student);

    let (_, body) = srv
        .post(&format!("/coaches/{a}/students/unlink"), json!({ "ids": [student] }))
        .await;
    assert_eq!(body["removed"], 1);

    let (_, body) = srv.delete(&path).await;
    assert_eq!(body["removed"], 1);

    let (_, body) = srv.get(&path).await;
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn invalid_bodies_use_the_error_contract() {
    let srv = TestServer::spawn().await;

    let (_, student) = srv.post("/students", json!({ "name": "Mia" })).await;
    let (_, contract) = srv
        .post(
            "/contracts",
            json!({ "name": "Term", "student_id": student["id"], "type": 0, "signature_form": 0, "amount": 10 }),
        )
        .await;
    let id = contract["id"].as_i64().unwrap();

    let (status, body) = srv
        .post(
            &format!("/contracts/{id}/terminate"),
            json!({ "termination_agreement": null }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .post("/classifications", json!({ "name": null, "level": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv.post("/students", json!({ "name": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let res = srv
        .client
        .post(srv.url("/brands"))
        .bearer_auth(&srv.token)
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    let (status, body) = read(res).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/students/12345").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = srv.get("/contracts/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_value");

    let (status, _) = srv.post("/students/12345/coaches", json!({ "ids": [1] })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
