#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use promptboard::config::{Config, RepeatVotePolicy};
use promptboard::routes;
use promptboard::state::AppState;

pub const BOUNDARY: &str = "promptboard-test-boundary";

/// A router over a fresh database and media root. Keep the `TempDir` alive
/// for the duration of the test.
pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
    pub system_user_id: String,
}

pub fn test_app() -> TestApp {
    test_app_with(RepeatVotePolicy::Allow)
}

pub fn test_app_with(policy: RepeatVotePolicy) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.database.path = Some(dir.path().join("test.db"));
    config.storage.path = Some(dir.path().join("media"));
    config.storage.max_upload_bytes = 1024;
    config.votes.repeat_policy = policy;

    let state = AppState::bootstrap(config).expect("Failed to bootstrap test state");
    let system_user_id = state.system_user_id.clone();
    TestApp {
        dir,
        router: routes::app(state),
        system_user_id,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response {
        self.send(
            Request::delete(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn multipart(&self, method: Method, uri: &str, body: Vec<u8>) -> Response {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    /// Create a prompt through the API and return its representation.
    pub async fn create_prompt(&self, text: &str, tags: &str) -> Value {
        let response = self
            .json(
                Method::POST,
                "/api/prompts",
                serde_json::json!({ "prompt": text, "tags": tags }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    /// Create a user through the API and return its id.
    pub async fn create_user(&self, username: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/users",
                serde_json::json!({ "username": username }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_str().unwrap().to_string()
    }

    pub async fn vote(&self, prompt_id: &str, voter: &str, value: i64) -> Response {
        self.json(
            Method::POST,
            &format!("/api/prompts/{}/votes", prompt_id),
            serde_json::json!({ "voter": voter, "value": value }),
        )
        .await
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Builder for `multipart/form-data` bodies.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}
