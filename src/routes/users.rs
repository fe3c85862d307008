use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const MAX_USERNAME_LEN: usize = 150;

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
}

async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username may not be blank".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(AppError::BadRequest(format!(
            "username may have at most {} characters",
            MAX_USERNAME_LEN
        )));
    }

    let user = state.repo.create_user(username).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Delete a user along with their prompts and votes
async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    if id == state.system_user_id {
        return Err(AppError::Conflict(
            "the system user cannot be deleted".into(),
        ));
    }

    let images = state.repo.delete_user(&id).await?;
    for stored in &images {
        state.media.discard(stored).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/{id}", delete(destroy))
}
