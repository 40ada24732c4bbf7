//! The coordinator's public HTTP surface: signup, login, upload, and file
//! listing. Lives in the library (rather than only in `src/bin/coordinator.rs`)
//! so integration tests can drive the real router instead of only the 2PC
//! core underneath it.

use crate::auth::extractor::{AuthenticatedUser, SecretKeySource};
use crate::auth::{hash_password, issue_token, verify_password};
use crate::Coordinator;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub http: reqwest::Client,
    pub secret_key: String,
    pub metadata_http_addr: String,
}

impl SecretKeySource for AppState {
    fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/files/upload", post(upload))
        .route("/files", get(list_files))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

/// Extracted as raw JSON rather than a struct with required `String` fields
/// so a missing `username`/`password` yields the 400 spec.md §6 contracts
/// for `/auth/signup`, instead of axum's default 422 for a `Json<T>`
/// deserialization failure.
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
    let username = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let password = body.get("password").and_then(|v| v.as_str()).unwrap_or("");

    if username.is_empty() || password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "username and password are required" })),
        );
    }

    let hashed = hash_password(password);
    let url = format!("{}/users", state.metadata_http_addr);

    let resp = state
        .http
        .post(&url)
        .json(&json!({ "username": username, "password": hashed }))
        .send()
        .await;

    match resp {
        Ok(r) if r.status().is_success() => {
            (StatusCode::CREATED, Json(json!({ "username": username })))
        }
        Ok(r) => {
            let status =
                StatusCode::from_u16(r.status().as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": "signup failed" })))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("metadata service unreachable: {e}") })),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct StoredUser {
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let url = format!("{}/users/{}", state.metadata_http_addr, body.username);

    let stored: StoredUser = match state.http.get(&url).send().await {
        Ok(r) if r.status().is_success() => match r.json().await {
            Ok(u) => u,
            Err(_) => {
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "malformed user record" })),
                )
            }
        },
        Ok(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid credentials" })),
            )
        }
        Err(e) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("metadata service unreachable: {e}") })),
            )
        }
    };

    if !verify_password(&body.password, &stored.password) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid credentials" })),
        );
    }

    match issue_token(&body.username, &state.secret_key) {
        Ok(token) => (StatusCode::OK, Json(json!(TokenResponse { token }))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e }))),
    }
}

async fn upload(
    State(state): State<AppState>,
    AuthenticatedUser(username): AuthenticatedUser,
    mut multipart: Multipart,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut file_field = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_field = Some(field);
            break;
        }
    }

    let field = match file_field {
        Some(f) => f,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "missing file field" })),
            )
        }
    };

    let filename = match field.file_name() {
        Some(name) => name.to_string(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "missing filename" })),
            )
        }
    };

    let data = match field.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("failed to read upload: {e}") })),
            )
        }
    };

    let size = data.len();
    let committed = state
        .coordinator
        .execute_upload(filename.clone(), data, username)
        .await;

    if committed {
        (
            StatusCode::OK,
            Json(json!({ "message": "upload committed", "filename": filename, "size": size })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "upload aborted", "filename": filename })),
        )
    }
}

async fn list_files(
    State(state): State<AppState>,
    AuthenticatedUser(_username): AuthenticatedUser,
) -> (StatusCode, Json<serde_json::Value>) {
    let url = format!("{}/files", state.metadata_http_addr);
    match state.http.get(&url).send().await {
        Ok(r) if r.status().is_success() => match r.json::<serde_json::Value>().await {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(_) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "malformed file listing" })),
            ),
        },
        Ok(r) => (
            StatusCode::from_u16(r.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            Json(json!({ "error": "failed to list files" })),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": format!("metadata service unreachable: {e}") })),
        ),
    }
}
