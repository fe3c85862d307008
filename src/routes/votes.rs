use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::votes::{Vote, VoteValue};

#[derive(Deserialize)]
pub struct CastVoteRequest {
    voter: String,
    value: i64,
}

/// Cast a vote on a prompt
pub async fn cast(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
    Json(request): Json<CastVoteRequest>,
) -> AppResult<(StatusCode, Json<Vote>)> {
    let value = VoteValue::try_from(request.value).map_err(|_| {
        AppError::BadRequest(format!(
            "value must be 1 or -1 (got {})",
            request.value
        ))
    })?;

    let vote = state
        .repo
        .cast_vote(
            &prompt_id,
            &request.voter,
            value,
            state.config.votes.repeat_policy,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(vote)))
}

/// Every vote currently attached to a prompt
pub async fn list(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
) -> AppResult<Json<Vec<Vote>>> {
    if state.repo.get_prompt(&prompt_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(Json(state.repo.votes_for(&prompt_id).await?))
}
